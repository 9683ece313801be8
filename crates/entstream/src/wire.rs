// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 entstream contributors

//! Wire-level constants shared by the writer and reader.
//!
//! Every field starts with `[marker u8][key_len u8][key bytes]`. The marker
//! selects the field class; what follows depends on the class:
//!
//! - [`MARKER_VALUE`]: `[data_kind u8][presence u8]` then, if present, one
//!   encoded element.
//! - [`MARKER_ARRAY`]: `[data_kind u8][presence u8]` then, if present,
//!   `[value_count u64][values...][index_count u64][index i32...]`.
//! - [`MARKER_SECTION`]: `[presence u8]` then, if present, `[byte_len u64]`
//!   and the section body.
//! - [`MARKER_SECTION_ARRAY`]: `[presence u8]` then, if present,
//!   `[total_len u64][elem_count u64][index_count u64][index i32...]` and per
//!   element `[elem_len u64]` plus the element body.
//!
//! Absence lives in the presence byte, never in a zero length, so an empty
//! array or section stays distinguishable from an absent one.

use crate::error::{Error, Result, MAX_KEY_LEN};

pub(crate) const MARKER_VALUE: u8 = 0x01;
pub(crate) const MARKER_ARRAY: u8 = 0x02;
pub(crate) const MARKER_SECTION: u8 = 0x03;
pub(crate) const MARKER_SECTION_ARRAY: u8 = 0x04;

pub(crate) const PRESENT: u8 = 1;
pub(crate) const ABSENT: u8 = 0;

/// Keys are 1..=[`MAX_KEY_LEN`] bytes.
pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(Error::BadKey(key.to_owned()));
    }
    Ok(())
}
