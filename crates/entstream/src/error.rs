// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 entstream contributors

//! Error taxonomy for the serialization engine.
//!
//! Two families share one enum:
//! - schema/programmer errors (`UnknownTypeCombo`, `BadKey`, `SectionMismatch`,
//!   `UnbalancedSections`, `ArrayIndexOutOfOrder`, `TypeMismatch`) — the call
//!   sequence itself is wrong and the whole write/read must be abandoned;
//! - data errors (`Truncated`, `KeyMismatch`, `KindMismatch`, `MarkerMismatch`,
//!   `RequiredValueMissing`, `SectionLengthMismatch`, `BadIndexLength`,
//!   `BadUtf8`, `BadFlag`, `TrailingBytes`) — the stream does not match what
//!   the caller asked for, and no partial object is valid.
//!
//! Every fallible operation returns [`Result`]; callers short-circuit with `?`.

use crate::types::{DataKind, TypeCombo};

/// Maximum key length in bytes for any field or section key.
pub const MAX_KEY_LEN: usize = 40;

/// Errors produced by the writer, reader, registry, and varying slot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A (data kind, container kind) pair outside the registered catalog.
    #[error("unknown type combo: data kind code {data_kind}, container code {container}")]
    UnknownTypeCombo { data_kind: u8, container: u8 },

    /// Field key is empty or exceeds [`MAX_KEY_LEN`] bytes.
    #[error("bad key {0:?}: must be 1..={MAX_KEY_LEN} bytes")]
    BadKey(String),

    /// A section token was closed out of LIFO order, or a leaf/section was
    /// written inside a section array without an open element.
    #[error("section operation does not match the innermost open section")]
    SectionMismatch,

    /// `finish` was called with sections still open.
    #[error("stream finished with {0} unclosed section(s)")]
    UnbalancedSections(usize),

    /// Section array elements must be visited in order `0..len`.
    #[error("section array element {got} out of order, expected {expected}")]
    ArrayIndexOutOfOrder { expected: usize, got: usize },

    /// A dispatch operation was applied to a value of a different combo.
    #[error("value slot type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: TypeCombo, got: TypeCombo },

    /// The stream ended inside a value, key, or header.
    #[error("unexpected end of stream at offset {offset}")]
    Truncated { offset: usize },

    /// The encoded key does not match the key the caller asked for.
    #[error("key mismatch at offset {offset}: expected {expected:?}, found {found:?}")]
    KeyMismatch {
        offset: usize,
        expected: String,
        found: String,
    },

    /// The encoded data kind does not match the requested type.
    #[error("data kind mismatch for key {key:?}: expected {expected:?}, found code {found}")]
    KindMismatch {
        key: String,
        expected: DataKind,
        found: u8,
    },

    /// The field marker byte does not match the requested field class.
    #[error("marker mismatch at offset {offset}: expected {expected:#04x}, found {found:#04x}")]
    MarkerMismatch {
        offset: usize,
        expected: u8,
        found: u8,
    },

    /// A required value or section was encoded as absent.
    #[error("required value {key:?} is absent")]
    RequiredValueMissing { key: String },

    /// A section declared a byte length its content did not consume.
    #[error("section length mismatch: declared {declared} bytes, consumed {consumed}")]
    SectionLengthMismatch { declared: u64, consumed: u64 },

    /// Index layer does not fit the values: the index must be empty or have
    /// one entry per value, and a dense read must not meet an index at all.
    #[error("bad index layer: {index} entries over {values} value(s)")]
    BadIndexLength { values: usize, index: usize },

    /// String payload is not valid UTF-8.
    #[error("invalid utf-8 in string value")]
    BadUtf8,

    /// Presence or bool byte was neither 0 nor 1.
    #[error("invalid presence/bool byte {0:#04x}")]
    BadFlag(u8),

    /// Bytes remained after the outermost value when exhaustion was required.
    #[error("{0} trailing bytes after the outermost value")]
    TrailingBytes(usize),
}

pub type Result<T> = core::result::Result<T, Error>;
