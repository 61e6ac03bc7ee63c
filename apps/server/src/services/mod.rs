// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Upload storage and session state.

pub mod cache;
pub mod session;

pub use cache::DiskCache;
pub use session::SessionStore;
