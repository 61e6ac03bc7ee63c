// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIM45D Core
//!
//! IFC/STEP toolkit built with [nom](https://docs.rs/nom). Reads an exchange
//! file into an owned, indexed model, answers relationship queries and writes
//! the model back out after edits.
//!
//! ## Overview
//!
//! - **STEP Tokenization**: nom-based record parser and a quote-aware scanner
//!   using [memchr](https://docs.rs/memchr)
//! - **Model**: entities by id, type index with subtype queries, inverse references
//! - **Element utilities**: property/quantity sets, container, type, predefined type
//! - **Writer**: Part 21 serialization with proper string encoding
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bim45d_core::{element, IfcModel, PsetFilter};
//!
//! let model = IfcModel::parse(&content)?;
//! for wall in model.by_type("IfcWall") {
//!     let psets = element::get_psets(&model, wall.id, PsetFilter::PropertiesOnly);
//!     println!("{:?}: {:?}", wall.name(), psets.get("Pset_WallCommon"));
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Serialize/Deserialize for [`PropertyValue`]

pub mod element;
pub mod entity;
pub mod error;
pub mod guid;
pub mod model;
pub mod parser;
pub mod schema;
pub mod writer;

pub use element::{PropertyMap, PropertySets, PropertyValue, PsetFilter};
pub use entity::{AttributeValue, Entity};
pub use error::{Error, Result};
pub use guid::new_global_id;
pub use model::{IfcModel, SchemaVersion};
pub use parser::{parse_entity, EntityScanner, StepHeader, Token};
