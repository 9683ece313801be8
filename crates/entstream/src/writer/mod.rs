// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 entstream contributors

//! [`EntityWriter`]: serializes keyed fields and nested sections into a byte
//! buffer.
//!
//! Sections and section arrays are bracketed by begin/end calls that hand out
//! tokens; the tokens enforce LIFO nesting at the API level, and the writer
//! backpatches every section's byte length when it closes. Inside a section
//! array, leaf and section writes are only legal while an element is open,
//! and elements must be produced in order `0..len`.

use crate::error::{Error, Result};
use crate::stream::WriteCursor;
use crate::types::{Element, IdxArray};
use crate::wire::{
    check_key, ABSENT, MARKER_ARRAY, MARKER_SECTION, MARKER_SECTION_ARRAY, MARKER_VALUE, PRESENT,
};

/// Proof of an open section; returned by [`EntityWriter::begin_section`] and
/// consumed by [`EntityWriter::end_section`].
#[derive(Debug, Clone, Copy)]
pub struct SectionToken {
    depth: usize,
}

/// Proof of an open section array.
#[derive(Debug, Clone, Copy)]
pub struct ArrayToken {
    depth: usize,
}

#[derive(Debug)]
enum Frame {
    Section {
        len_pos: usize,
    },
    Array {
        total_pos: usize,
        len: usize,
        next: usize,
        // length slot of the element currently open, if any
        open_elem: Option<usize>,
    },
}

/// Streaming writer for one entity.
///
/// Construct, emit fields and sections, then call [`EntityWriter::finish`] to
/// take the bytes. Any error leaves the buffer in an unusable intermediate
/// state; the writer should be dropped.
#[derive(Debug, Default)]
pub struct EntityWriter {
    out: WriteCursor,
    frames: Vec<Frame>,
}

impl EntityWriter {
    pub fn new() -> Self {
        Self {
            out: WriteCursor::new(),
            frames: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: WriteCursor::with_capacity(capacity),
            frames: Vec::new(),
        }
    }

    /// Bytes emitted so far (including unpatched length slots).
    pub fn position(&self) -> usize {
        self.out.position()
    }

    // A field may start at top level, inside a section, or inside an open
    // section-array element. Directly inside a section array (no element
    // open) only element brackets are legal.
    fn check_writable(&self) -> Result<()> {
        match self.frames.last() {
            Some(Frame::Array {
                open_elem: None, ..
            }) => Err(Error::SectionMismatch),
            _ => Ok(()),
        }
    }

    fn write_header(&mut self, marker: u8, key: &str) -> Result<()> {
        check_key(key)?;
        self.out.write_u8(marker);
        self.out.write_u8(key.len() as u8);
        self.out.write_bytes(key.as_bytes());
        Ok(())
    }

    // ---- leaf values ----------------------------------------------------

    pub fn write_value<T: Element>(&mut self, key: &str, value: &T) -> Result<()> {
        self.check_writable()?;
        self.write_header(MARKER_VALUE, key)?;
        self.out.write_u8(T::KIND.code());
        self.out.write_u8(PRESENT);
        value.write_to(&mut self.out);
        Ok(())
    }

    pub fn write_value_opt<T: Element>(&mut self, key: &str, value: Option<&T>) -> Result<()> {
        match value {
            Some(value) => self.write_value(key, value),
            None => {
                self.check_writable()?;
                self.write_header(MARKER_VALUE, key)?;
                self.out.write_u8(T::KIND.code());
                self.out.write_u8(ABSENT);
                Ok(())
            }
        }
    }

    // ---- leaf arrays ----------------------------------------------------

    pub fn write_array<T: Element>(&mut self, key: &str, values: &[T]) -> Result<()> {
        self.write_leaf_array::<T>(key, Some((values, &[])))
    }

    pub fn write_array_opt<T: Element>(&mut self, key: &str, values: Option<&[T]>) -> Result<()> {
        self.write_leaf_array::<T>(key, values.map(|v| (v, &[][..])))
    }

    pub fn write_idx_array<T: Element>(&mut self, key: &str, array: &IdxArray<T>) -> Result<()> {
        self.write_leaf_array::<T>(key, Some((array.values(), array.index())))
    }

    pub fn write_idx_array_opt<T: Element>(
        &mut self,
        key: &str,
        array: Option<&IdxArray<T>>,
    ) -> Result<()> {
        self.write_leaf_array::<T>(key, array.map(|a| (a.values(), a.index())))
    }

    fn write_leaf_array<T: Element>(
        &mut self,
        key: &str,
        content: Option<(&[T], &[i32])>,
    ) -> Result<()> {
        self.check_writable()?;
        self.write_header(MARKER_ARRAY, key)?;
        self.out.write_u8(T::KIND.code());
        let Some((values, index)) = content else {
            self.out.write_u8(ABSENT);
            return Ok(());
        };
        self.out.write_u8(PRESENT);
        self.out.write_u64(values.len() as u64);
        for value in values {
            value.write_to(&mut self.out);
        }
        self.out.write_u64(index.len() as u64);
        for entry in index {
            self.out.write_i32(*entry);
        }
        Ok(())
    }

    // ---- sections -------------------------------------------------------

    pub fn begin_section(&mut self, key: &str) -> Result<SectionToken> {
        self.check_writable()?;
        self.write_header(MARKER_SECTION, key)?;
        self.out.write_u8(PRESENT);
        let len_pos = self.out.reserve_u64();
        self.frames.push(Frame::Section { len_pos });
        Ok(SectionToken {
            depth: self.frames.len() - 1,
        })
    }

    pub fn end_section(&mut self, token: SectionToken) -> Result<()> {
        if token.depth + 1 != self.frames.len() {
            return Err(Error::SectionMismatch);
        }
        let Some(Frame::Section { len_pos }) = self.frames.last() else {
            return Err(Error::SectionMismatch);
        };
        let len_pos = *len_pos;
        let body = (self.out.position() - len_pos - 8) as u64;
        self.out.patch_u64(len_pos, body);
        self.frames.pop();
        Ok(())
    }

    /// Emit an absent optional section.
    pub fn write_null_section(&mut self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.write_header(MARKER_SECTION, key)?;
        self.out.write_u8(ABSENT);
        Ok(())
    }

    // ---- section arrays -------------------------------------------------

    /// Open a section array of `len` elements. The optional index layer is
    /// written up front; elements follow via
    /// [`EntityWriter::begin_array_element`] in order `0..len`.
    pub fn begin_section_array(
        &mut self,
        key: &str,
        len: usize,
        index: Option<&[i32]>,
    ) -> Result<ArrayToken> {
        self.check_writable()?;
        let index = index.unwrap_or(&[]);
        if !index.is_empty() && index.len() != len {
            return Err(Error::BadIndexLength {
                values: len,
                index: index.len(),
            });
        }
        self.write_header(MARKER_SECTION_ARRAY, key)?;
        self.out.write_u8(PRESENT);
        let total_pos = self.out.reserve_u64();
        self.out.write_u64(len as u64);
        self.out.write_u64(index.len() as u64);
        for entry in index {
            self.out.write_i32(*entry);
        }
        self.frames.push(Frame::Array {
            total_pos,
            len,
            next: 0,
            open_elem: None,
        });
        Ok(ArrayToken {
            depth: self.frames.len() - 1,
        })
    }

    pub fn begin_array_element(&mut self, token: ArrayToken, idx: usize) -> Result<()> {
        if token.depth + 1 != self.frames.len() {
            return Err(Error::SectionMismatch);
        }
        let elem_pos = self.out.position();
        let Some(Frame::Array {
            len,
            next,
            open_elem,
            ..
        }) = self.frames.last_mut()
        else {
            return Err(Error::SectionMismatch);
        };
        if open_elem.is_some() {
            return Err(Error::SectionMismatch);
        }
        if idx != *next || idx >= *len {
            return Err(Error::ArrayIndexOutOfOrder {
                expected: *next,
                got: idx,
            });
        }
        *next += 1;
        *open_elem = Some(elem_pos);
        self.out.write_u64(0);
        Ok(())
    }

    pub fn end_array_element(&mut self, token: ArrayToken, idx: usize) -> Result<()> {
        if token.depth + 1 != self.frames.len() {
            return Err(Error::SectionMismatch);
        }
        let position = self.out.position();
        let Some(Frame::Array {
            next, open_elem, ..
        }) = self.frames.last_mut()
        else {
            return Err(Error::SectionMismatch);
        };
        let Some(len_pos) = open_elem.take() else {
            return Err(Error::SectionMismatch);
        };
        if idx + 1 != *next {
            return Err(Error::ArrayIndexOutOfOrder {
                expected: *next - 1,
                got: idx,
            });
        }
        let body = (position - len_pos - 8) as u64;
        self.out.patch_u64(len_pos, body);
        Ok(())
    }

    pub fn end_section_array(&mut self, token: ArrayToken) -> Result<()> {
        if token.depth + 1 != self.frames.len() {
            return Err(Error::SectionMismatch);
        }
        let Some(Frame::Array {
            total_pos,
            len,
            next,
            open_elem,
        }) = self.frames.last()
        else {
            return Err(Error::SectionMismatch);
        };
        if open_elem.is_some() {
            return Err(Error::SectionMismatch);
        }
        if *next != *len {
            return Err(Error::ArrayIndexOutOfOrder {
                expected: *next,
                got: *len,
            });
        }
        let total_pos = *total_pos;
        let body = (self.out.position() - total_pos - 8) as u64;
        self.out.patch_u64(total_pos, body);
        self.frames.pop();
        Ok(())
    }

    /// Emit an absent optional section array.
    pub fn write_null_section_array(&mut self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.write_header(MARKER_SECTION_ARRAY, key)?;
        self.out.write_u8(ABSENT);
        Ok(())
    }

    // ---- completion -----------------------------------------------------

    /// Close out the writer and take the encoded bytes. Fails if any section
    /// or section array is still open.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.frames.is_empty() {
            return Err(Error::UnbalancedSections(self.frames.len()));
        }
        Ok(self.out.into_bytes())
    }
}
