// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 entstream contributors

//! Keyed nested-section binary serialization with runtime type dispatch.
//!
//! The crate serializes entities as streams of keyed fields. A field is a
//! leaf value or array drawn from a closed catalog of data kinds, or a nested
//! section (single or array) that contains further fields. Sections carry
//! their byte length, so a reader can validate structure as it goes; optional
//! fields carry an explicit presence byte, so "absent" and "empty" never
//! collapse into each other.
//!
//! Three layers:
//!
//! - [`writer::EntityWriter`] / [`reader::EntityReader`]: streaming,
//!   schema-driven access. The caller supplies keys and types in write order;
//!   the reader checks every marker, key, and kind against the request.
//! - [`registry`]: one dispatch record per (data kind, container kind) combo,
//!   resolved at runtime through a fixed open-addressing table.
//! - [`varying::Varying`]: a polymorphic slot that owns one value of any
//!   registered combo and serializes itself with its type tags.
//!
//! # Example
//!
//! ```
//! use entstream::{EntityReader, EntityWriter, Result};
//!
//! fn main() -> Result<()> {
//!     let mut w = EntityWriter::new();
//!     w.write_value("Count", &42i32)?;
//!     let body = w.begin_section("Body")?;
//!     w.write_value_opt::<String>("Name", Some(&"node".to_string()))?;
//!     w.end_section(body)?;
//!     let bytes = w.finish()?;
//!
//!     let mut r = EntityReader::new(&bytes);
//!     assert_eq!(r.read_value::<i32>("Count")?, 42);
//!     let body = r.begin_section("Body", true)?.expect("required section");
//!     assert_eq!(r.read_value_opt::<String>("Name")?.as_deref(), Some("node"));
//!     r.end_section(body)?;
//!     r.finish()
//! }
//! ```

pub mod error;
pub mod reader;
pub mod registry;
pub mod stream;
pub mod types;
pub mod varying;
pub mod writer;

mod wire;

pub use error::{Error, Result, MAX_KEY_LEN};
pub use reader::{ArrayInfo, EntityReader};
pub use types::{ContainerKind, DataKind, Element, IdxArray, TypeCombo};
pub use varying::{VarData, Varying, VaryingType};
pub use writer::EntityWriter;
