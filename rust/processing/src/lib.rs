// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIM45D Processing
//!
//! Page-level tooling on top of [`bim45d_core`]. Every page of the
//! application is a thin handler over one of these modules:
//!
//! - [`objects`] and [`table`]: property and quantity tables, filters, exports
//! - [`ids`]: rule authoring, IDS 1.0 XML, compliance checks
//! - [`export_config`]: exporter option schema and configuration JSON
//! - [`health`] and [`validation`]: model statistics and external validators
//! - [`bcf`] and [`report`]: issue and report documents
//! - [`schedule`] and [`cost`]: 4D work schedules and 5D bills of quantities
//!
//! Functions here take a model or a table and return new values; callers own
//! session state and decide what to keep.

pub mod bcf;
pub mod cost;
pub mod dictionary;
pub mod error;
pub mod export_config;
pub mod health;
pub mod ids;
pub mod objects;
pub mod report;
pub mod schedule;
pub mod table;
pub mod validation;

pub use error::{Error, Result};
pub use table::{Table, ALL};

#[cfg(test)]
pub(crate) mod fixture {
    use bim45d_core::IfcModel;

    pub const STRUCTURAL: &str = include_str!("../tests/fixtures/structural.ifc");

    pub fn model() -> IfcModel {
        IfcModel::parse(STRUCTURAL).unwrap()
    }
}
