// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Errors raised while reading, querying or editing an IFC model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("File contains no DATA section entities")]
    EmptyModel,

    #[error("Entity #{0} not found")]
    EntityNotFound(u32),

    #[error("Entity #{id} is {actual}, expected {expected}")]
    UnexpectedType {
        id: u32,
        expected: String,
        actual: String,
    },

    #[error("Invalid attribute {index} on #{id}: {message}")]
    InvalidAttribute {
        id: u32,
        index: usize,
        message: String,
    },

    #[error("Invalid GlobalId '{0}'")]
    InvalidGlobalId(String),
}

impl Error {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
