// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 entstream contributors

//! Byte cursors over in-memory buffers.
//!
//! [`WriteCursor`] appends to a growing buffer and supports backpatching of
//! reserved length slots; [`ReadCursor`] performs bounds-checked reads over a
//! borrowed slice. All multi-byte values are little-endian on the wire,
//! independent of the host.

use crate::error::{Error, Result};

/// Generate write methods for primitive types.
///
/// Each generated method converts the value with `to_le_bytes()` and appends
/// it to the buffer, growing as needed.
macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    };
}

/// Generate read methods for primitive types.
///
/// Each generated method:
/// 1. Checks buffer bounds (returns `Error::Truncated` if short)
/// 2. Converts bytes to value via `from_le_bytes()`
/// 3. Advances the offset
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type> {
            if self.offset + $size > self.buf.len() {
                return Err(Error::Truncated {
                    offset: self.offset,
                });
            }
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(&self.buf[self.offset..self.offset + $size]);
            self.offset += $size;
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Growing write cursor (append-only, with length backpatching).
#[derive(Debug, Default)]
pub struct WriteCursor {
    buf: Vec<u8>,
}

impl WriteCursor {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Current write position (== number of bytes written so far).
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    impl_write_le!(write_u8, u8);
    impl_write_le!(write_u16, u16);
    impl_write_le!(write_u32, u32);
    impl_write_le!(write_u64, u64);
    impl_write_le!(write_i32, i32);

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Reserve an 8-byte length slot at the current position, to be filled in
    /// later with [`WriteCursor::patch_u64`]. Returns the slot position.
    pub fn reserve_u64(&mut self) -> usize {
        let pos = self.buf.len();
        self.write_u64(0);
        pos
    }

    /// Overwrite a previously reserved 8-byte slot.
    ///
    /// `pos` must come from [`WriteCursor::reserve_u64`]; an out-of-range
    /// position is a caller bug and panics via slice indexing.
    pub(crate) fn patch_u64(&mut self, pos: usize, value: u64) {
        self.buf[pos..pos + 8].copy_from_slice(&value.to_le_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Bounds-checked read cursor over a borrowed byte slice.
#[derive(Debug)]
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buf.len()
    }

    impl_read_le!(read_u8, u8, 1);
    impl_read_le!(read_u16, u16, 2);
    impl_read_le!(read_u32, u32, 4);
    impl_read_le!(read_u64, u64, 8);
    impl_read_le!(read_i32, i32, 4);

    // `len` can be attacker-controlled (string lengths come straight off the
    // wire), so compare against remaining() instead of offset + len, which
    // can overflow.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::Truncated {
                offset: self.offset,
            });
        }
        let slice = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }
}
