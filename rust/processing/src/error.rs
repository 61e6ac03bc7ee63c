// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Errors raised by the page-level tools
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] bim45d_core::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rule index {index} out of range ({len} rules)")]
    RuleIndex { index: usize, len: usize },

    #[error("Unknown option '{value}' for {field}")]
    UnknownOption { field: &'static str, value: String },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validator error: {0}")]
    Validator(String),
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<printpdf::Error> for Error {
    fn from(err: printpdf::Error) -> Self {
        Error::Pdf(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
