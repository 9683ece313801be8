// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 entstream contributors

//! [`EntityReader`]: validating reader for streams produced by
//! [`EntityWriter`](crate::writer::EntityWriter).
//!
//! Reads are driven by the caller in the same key order the writer used; the
//! reader checks every marker, key, data kind, and presence byte against what
//! the caller asked for, and verifies each section's declared byte length when
//! it closes. Element counts are sanity-checked against the remaining bytes
//! before any allocation, so a corrupted count cannot trigger a huge reserve.
//!
//! Optional reads are tri-state: `Err` for a malformed or mismatched stream,
//! `Ok(None)` for a well-formed absent value, `Ok(Some(..))` for a value.

use crate::error::{Error, Result};
use crate::stream::ReadCursor;
use crate::types::{Element, IdxArray};
use crate::wire::{
    check_key, ABSENT, MARKER_ARRAY, MARKER_SECTION, MARKER_SECTION_ARRAY, MARKER_VALUE, PRESENT,
};

/// Proof of an open section on the read side.
#[derive(Debug, Clone, Copy)]
pub struct SectionToken {
    depth: usize,
}

/// Proof of an open section array on the read side.
#[derive(Debug, Clone, Copy)]
pub struct ArrayToken {
    depth: usize,
}

/// Shape of a section array, returned when it opens: the element count and
/// the optional index layer (empty = dense).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInfo {
    pub len: usize,
    pub index: Vec<i32>,
}

#[derive(Debug)]
enum Frame {
    Section {
        declared: u64,
        end: usize,
    },
    Array {
        declared: u64,
        end: usize,
        len: usize,
        next: usize,
        // (declared, end offset) of the element currently open
        open_elem: Option<(u64, usize)>,
    },
}

/// Streaming reader for one entity.
#[derive(Debug)]
pub struct EntityReader<'a> {
    src: ReadCursor<'a>,
    frames: Vec<Frame>,
}

impl<'a> EntityReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            src: ReadCursor::new(buf),
            frames: Vec::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.src.position()
    }

    fn check_readable(&self) -> Result<()> {
        match self.frames.last() {
            Some(Frame::Array {
                open_elem: None, ..
            }) => Err(Error::SectionMismatch),
            _ => Ok(()),
        }
    }

    fn read_header(&mut self, marker: u8, key: &str) -> Result<()> {
        check_key(key)?;
        let offset = self.src.position();
        let found = self.src.read_u8()?;
        if found != marker {
            log::warn!("[reader] marker {found:#04x} at offset {offset}, wanted {marker:#04x}");
            return Err(Error::MarkerMismatch {
                offset,
                expected: marker,
                found,
            });
        }
        let key_len = self.src.read_u8()? as usize;
        let found_key = self.src.read_bytes(key_len)?;
        if found_key != key.as_bytes() {
            let found = String::from_utf8_lossy(found_key).into_owned();
            log::warn!("[reader] key {found:?} at offset {offset}, wanted {key:?}");
            return Err(Error::KeyMismatch {
                offset,
                expected: key.to_owned(),
                found,
            });
        }
        Ok(())
    }

    fn read_presence(&mut self) -> Result<bool> {
        match self.src.read_u8()? {
            ABSENT => Ok(false),
            PRESENT => Ok(true),
            other => Err(Error::BadFlag(other)),
        }
    }

    fn read_kind<T: Element>(&mut self, key: &str) -> Result<()> {
        let found = self.src.read_u8()?;
        if found != T::KIND.code() {
            return Err(Error::KindMismatch {
                key: key.to_owned(),
                expected: T::KIND,
                found,
            });
        }
        Ok(())
    }

    // Reject a count that cannot possibly fit in the remaining bytes before
    // allocating for it.
    fn check_count(&self, count: usize, min_size: usize) -> Result<usize> {
        let need = count.checked_mul(min_size.max(1));
        match need {
            Some(need) if need <= self.src.remaining() => Ok(count),
            _ => Err(Error::Truncated {
                offset: self.src.position(),
            }),
        }
    }

    // ---- leaf values ----------------------------------------------------

    pub fn read_value<T: Element>(&mut self, key: &str) -> Result<T> {
        self.read_value_opt(key)?
            .ok_or_else(|| Error::RequiredValueMissing {
                key: key.to_owned(),
            })
    }

    pub fn read_value_opt<T: Element>(&mut self, key: &str) -> Result<Option<T>> {
        self.check_readable()?;
        self.read_header(MARKER_VALUE, key)?;
        self.read_kind::<T>(key)?;
        if !self.read_presence()? {
            return Ok(None);
        }
        Ok(Some(T::read_from(&mut self.src)?))
    }

    // ---- leaf arrays ----------------------------------------------------

    pub fn read_array<T: Element>(&mut self, key: &str) -> Result<Vec<T>> {
        self.read_array_opt(key)?
            .ok_or_else(|| Error::RequiredValueMissing {
                key: key.to_owned(),
            })
    }

    pub fn read_array_opt<T: Element>(&mut self, key: &str) -> Result<Option<Vec<T>>> {
        let Some((values, index)) = self.read_leaf_array::<T>(key)? else {
            return Ok(None);
        };
        if !index.is_empty() {
            return Err(Error::BadIndexLength {
                values: values.len(),
                index: index.len(),
            });
        }
        Ok(Some(values))
    }

    pub fn read_idx_array<T: Element>(&mut self, key: &str) -> Result<IdxArray<T>> {
        self.read_idx_array_opt(key)?
            .ok_or_else(|| Error::RequiredValueMissing {
                key: key.to_owned(),
            })
    }

    pub fn read_idx_array_opt<T: Element>(&mut self, key: &str) -> Result<Option<IdxArray<T>>> {
        let Some((values, index)) = self.read_leaf_array::<T>(key)? else {
            return Ok(None);
        };
        Ok(Some(IdxArray::from_parts(values, index)?))
    }

    fn read_leaf_array<T: Element>(&mut self, key: &str) -> Result<Option<(Vec<T>, Vec<i32>)>> {
        self.check_readable()?;
        self.read_header(MARKER_ARRAY, key)?;
        self.read_kind::<T>(key)?;
        if !self.read_presence()? {
            return Ok(None);
        }
        let count = self.src.read_u64()? as usize;
        // variable-size elements still carry at least their u64 length
        let min_size = if T::WIRE_SIZE == 0 { 8 } else { T::WIRE_SIZE };
        self.check_count(count, min_size)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(T::read_from(&mut self.src)?);
        }
        let index_count = self.src.read_u64()? as usize;
        self.check_count(index_count, 4)?;
        let mut index = Vec::with_capacity(index_count);
        for _ in 0..index_count {
            index.push(self.src.read_i32()?);
        }
        Ok(Some((values, index)))
    }

    // ---- sections -------------------------------------------------------

    /// Open a section. With `required` set, an absent section is an error;
    /// otherwise absence comes back as `Ok(None)`.
    pub fn begin_section(&mut self, key: &str, required: bool) -> Result<Option<SectionToken>> {
        self.check_readable()?;
        self.read_header(MARKER_SECTION, key)?;
        if !self.read_presence()? {
            if required {
                return Err(Error::RequiredValueMissing {
                    key: key.to_owned(),
                });
            }
            return Ok(None);
        }
        let declared = self.src.read_u64()?;
        if declared as usize > self.src.remaining() {
            return Err(Error::Truncated {
                offset: self.src.position(),
            });
        }
        let end = self.src.position() + declared as usize;
        self.frames.push(Frame::Section { declared, end });
        Ok(Some(SectionToken {
            depth: self.frames.len() - 1,
        }))
    }

    /// Close a section, verifying the content consumed exactly the declared
    /// byte length.
    pub fn end_section(&mut self, token: SectionToken) -> Result<()> {
        if token.depth + 1 != self.frames.len() {
            return Err(Error::SectionMismatch);
        }
        let Some(Frame::Section { declared, end }) = self.frames.last() else {
            return Err(Error::SectionMismatch);
        };
        let (declared, end) = (*declared, *end);
        let consumed = (self.src.position() + declared as usize - end) as u64;
        if consumed != declared {
            log::warn!("[reader] section declared {declared} bytes, consumed {consumed}");
            return Err(Error::SectionLengthMismatch { declared, consumed });
        }
        self.frames.pop();
        Ok(())
    }

    // ---- section arrays -------------------------------------------------

    /// Open a section array, returning its shape. With `required` unset, an
    /// absent array comes back as `Ok(None)`.
    pub fn begin_section_array(
        &mut self,
        key: &str,
        required: bool,
    ) -> Result<Option<(ArrayToken, ArrayInfo)>> {
        self.check_readable()?;
        self.read_header(MARKER_SECTION_ARRAY, key)?;
        if !self.read_presence()? {
            if required {
                return Err(Error::RequiredValueMissing {
                    key: key.to_owned(),
                });
            }
            return Ok(None);
        }
        let declared = self.src.read_u64()?;
        if declared as usize > self.src.remaining() {
            return Err(Error::Truncated {
                offset: self.src.position(),
            });
        }
        let end = self.src.position() + declared as usize;
        let len = self.src.read_u64()? as usize;
        // every element carries at least its u64 length slot
        self.check_count(len, 8)?;
        let index_count = self.src.read_u64()? as usize;
        self.check_count(index_count, 4)?;
        if index_count != 0 && index_count != len {
            return Err(Error::BadIndexLength {
                values: len,
                index: index_count,
            });
        }
        let mut index = Vec::with_capacity(index_count);
        for _ in 0..index_count {
            index.push(self.src.read_i32()?);
        }
        self.frames.push(Frame::Array {
            declared,
            end,
            len,
            next: 0,
            open_elem: None,
        });
        let token = ArrayToken {
            depth: self.frames.len() - 1,
        };
        Ok(Some((token, ArrayInfo { len, index })))
    }

    pub fn begin_array_element(&mut self, token: ArrayToken, idx: usize) -> Result<()> {
        if token.depth + 1 != self.frames.len() {
            return Err(Error::SectionMismatch);
        }
        match self.frames.last() {
            Some(Frame::Array {
                len,
                next,
                open_elem: None,
                ..
            }) => {
                if idx != *next || idx >= *len {
                    return Err(Error::ArrayIndexOutOfOrder {
                        expected: *next,
                        got: idx,
                    });
                }
            }
            _ => return Err(Error::SectionMismatch),
        }
        let declared = self.src.read_u64()?;
        if declared as usize > self.src.remaining() {
            return Err(Error::Truncated {
                offset: self.src.position(),
            });
        }
        let end = self.src.position() + declared as usize;
        let Some(Frame::Array {
            next, open_elem, ..
        }) = self.frames.last_mut()
        else {
            return Err(Error::SectionMismatch);
        };
        *next += 1;
        *open_elem = Some((declared, end));
        Ok(())
    }

    pub fn end_array_element(&mut self, token: ArrayToken, idx: usize) -> Result<()> {
        if token.depth + 1 != self.frames.len() {
            return Err(Error::SectionMismatch);
        }
        let position = self.src.position();
        let Some(Frame::Array {
            next, open_elem, ..
        }) = self.frames.last_mut()
        else {
            return Err(Error::SectionMismatch);
        };
        let Some((declared, end)) = open_elem.take() else {
            return Err(Error::SectionMismatch);
        };
        if idx + 1 != *next {
            return Err(Error::ArrayIndexOutOfOrder {
                expected: *next - 1,
                got: idx,
            });
        }
        let consumed = (position + declared as usize - end) as u64;
        if consumed != declared {
            log::warn!("[reader] array element declared {declared} bytes, consumed {consumed}");
            return Err(Error::SectionLengthMismatch { declared, consumed });
        }
        Ok(())
    }

    pub fn end_section_array(&mut self, token: ArrayToken) -> Result<()> {
        if token.depth + 1 != self.frames.len() {
            return Err(Error::SectionMismatch);
        }
        let Some(Frame::Array {
            declared,
            end,
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
        let (declared, end) = (*declared, *end);
        let consumed = (self.src.position() + declared as usize - end) as u64;
        if consumed != declared {
            log::warn!("[reader] section array declared {declared} bytes, consumed {consumed}");
            return Err(Error::SectionLengthMismatch { declared, consumed });
        }
        self.frames.pop();
        Ok(())
    }

    // ---- completion -----------------------------------------------------

    /// Verify the stream was consumed exactly: no open sections, no trailing
    /// bytes.
    pub fn finish(self) -> Result<()> {
        if !self.frames.is_empty() {
            return Err(Error::UnbalancedSections(self.frames.len()));
        }
        if !self.src.is_eof() {
            return Err(Error::TrailingBytes(self.src.remaining()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataKind, FVec3};
    use crate::writer::EntityWriter;

    fn encode(build: impl FnOnce(&mut EntityWriter)) -> Vec<u8> {
        let mut w = EntityWriter::new();
        build(&mut w);
        w.finish().expect("finish")
    }

    #[test]
    fn test_value_roundtrip_and_exhaustion() {
        let bytes = encode(|w| {
            w.write_value("Count", &42i32).expect("write");
            w.write_value("Pos", &FVec3::from([1.0, 2.0, 3.0]))
                .expect("write");
        });
        let mut r = EntityReader::new(&bytes);
        assert_eq!(r.read_value::<i32>("Count").expect("count"), 42);
        assert_eq!(
            r.read_value::<FVec3>("Pos").expect("pos"),
            FVec3::from([1.0, 2.0, 3.0])
        );
        r.finish().expect("exhausted");
    }

    #[test]
    fn test_key_mismatch_is_detected() {
        let bytes = encode(|w| {
            w.write_value("Count", &42i32).expect("write");
        });
        let mut r = EntityReader::new(&bytes);
        let err = r.read_value::<i32>("Wrong").unwrap_err();
        assert!(matches!(err, Error::KeyMismatch { offset: 0, .. }));
    }

    #[test]
    fn test_kind_mismatch_is_detected() {
        let bytes = encode(|w| {
            w.write_value("Count", &42i32).expect("write");
        });
        let mut r = EntityReader::new(&bytes);
        let err = r.read_value::<f64>("Count").unwrap_err();
        assert_eq!(
            err,
            Error::KindMismatch {
                key: "Count".into(),
                expected: DataKind::F64,
                found: DataKind::I32.code(),
            }
        );
    }

    #[test]
    fn test_absent_optional_reads_back_as_none() {
        let bytes = encode(|w| {
            w.write_value_opt::<String>("Name", None).expect("write");
            w.write_array_opt::<u32>("Tags", None).expect("write");
        });
        let mut r = EntityReader::new(&bytes);
        assert_eq!(r.read_value_opt::<String>("Name").expect("name"), None);
        assert_eq!(r.read_array_opt::<u32>("Tags").expect("tags"), None);
        r.finish().expect("exhausted");
    }

    #[test]
    fn test_required_read_of_absent_value_fails() {
        let bytes = encode(|w| {
            w.write_value_opt::<u8>("Flag", None).expect("write");
        });
        let mut r = EntityReader::new(&bytes);
        assert_eq!(
            r.read_value::<u8>("Flag"),
            Err(Error::RequiredValueMissing {
                key: "Flag".into()
            })
        );
    }

    #[test]
    fn test_empty_array_is_present_not_absent() {
        let bytes = encode(|w| {
            w.write_array_opt::<i64>("Tags", Some(&[])).expect("write");
        });
        let mut r = EntityReader::new(&bytes);
        assert_eq!(
            r.read_array_opt::<i64>("Tags").expect("tags"),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_indexed_array_roundtrip() {
        let arr = IdxArray::from_parts(vec![1.0f32, 2.0], vec![3, 7]).expect("valid");
        let bytes = encode(|w| {
            w.write_idx_array("Sparse", &arr).expect("write");
        });
        let mut r = EntityReader::new(&bytes);
        assert_eq!(r.read_idx_array::<f32>("Sparse").expect("sparse"), arr);
        r.finish().expect("exhausted");
    }

    #[test]
    fn test_dense_read_rejects_index_layer() {
        let arr = IdxArray::from_parts(vec![5u16, 6], vec![0, 1]).expect("valid");
        let bytes = encode(|w| {
            w.write_idx_array("Sparse", &arr).expect("write");
        });
        let mut r = EntityReader::new(&bytes);
        assert_eq!(
            r.read_array::<u16>("Sparse"),
            Err(Error::BadIndexLength {
                values: 2,
                index: 2
            })
        );
    }

    #[test]
    fn test_nested_sections_validate_lengths() {
        let bytes = encode(|w| {
            let outer = w.begin_section("Outer").expect("outer");
            w.write_value("A", &7u32).expect("write");
            let inner = w.begin_section("Inner").expect("inner");
            w.write_value("B", &8u32).expect("write");
            w.end_section(inner).expect("end inner");
            w.end_section(outer).expect("end outer");
        });
        let mut r = EntityReader::new(&bytes);
        let outer = r.begin_section("Outer", true).expect("outer").expect("present");
        assert_eq!(r.read_value::<u32>("A").expect("a"), 7);
        let inner = r.begin_section("Inner", true).expect("inner").expect("present");
        assert_eq!(r.read_value::<u32>("B").expect("b"), 8);
        r.end_section(inner).expect("end inner");
        r.end_section(outer).expect("end outer");
        r.finish().expect("exhausted");
    }

    #[test]
    fn test_underconsumed_section_fails_on_close() {
        let bytes = encode(|w| {
            let s = w.begin_section("S").expect("begin");
            w.write_value("A", &7u32).expect("write");
            w.end_section(s).expect("end");
        });
        let mut r = EntityReader::new(&bytes);
        let s = r.begin_section("S", true).expect("begin").expect("present");
        // skip reading "A"
        let err = r.end_section(s).unwrap_err();
        assert!(matches!(err, Error::SectionLengthMismatch { consumed: 0, .. }));
    }

    #[test]
    fn test_section_array_elements_read_in_order() {
        let bytes = encode(|w| {
            let arr = w
                .begin_section_array("Items", 2, Some(&[4, 9]))
                .expect("begin");
            for idx in 0..2usize {
                w.begin_array_element(arr, idx).expect("begin elem");
                w.write_value("V", &(idx as u64)).expect("write");
                w.end_array_element(arr, idx).expect("end elem");
            }
            w.end_section_array(arr).expect("end");
        });
        let mut r = EntityReader::new(&bytes);
        let (arr, info) = r
            .begin_section_array("Items", true)
            .expect("begin")
            .expect("present");
        assert_eq!(
            info,
            ArrayInfo {
                len: 2,
                index: vec![4, 9]
            }
        );
        for idx in 0..info.len {
            r.begin_array_element(arr, idx).expect("begin elem");
            assert_eq!(r.read_value::<u64>("V").expect("v"), idx as u64);
            r.end_array_element(arr, idx).expect("end elem");
        }
        r.end_section_array(arr).expect("end");
        r.finish().expect("exhausted");
    }

    #[test]
    fn test_leaf_read_between_array_elements_is_rejected() {
        let bytes = encode(|w| {
            let arr = w.begin_section_array("Items", 1, None).expect("begin");
            w.begin_array_element(arr, 0).expect("begin elem");
            w.write_value("V", &1u8).expect("write");
            w.end_array_element(arr, 0).expect("end elem");
            w.end_section_array(arr).expect("end");
        });
        let mut r = EntityReader::new(&bytes);
        let (_arr, _info) = r
            .begin_section_array("Items", true)
            .expect("begin")
            .expect("present");
        assert_eq!(r.read_value::<u8>("V"), Err(Error::SectionMismatch));
    }

    #[test]
    fn test_truncated_stream_is_detected() {
        let bytes = encode(|w| {
            w.write_array("Data", &[1u64, 2, 3]).expect("write");
        });
        let mut r = EntityReader::new(&bytes[..bytes.len() - 10]);
        assert!(matches!(
            r.read_array::<u64>("Data"),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_corrupt_count_fails_before_allocation() {
        let bytes = encode(|w| {
            w.write_array("Data", &[1u8]).expect("write");
        });
        let mut corrupt = bytes.clone();
        // count field sits after marker + key_len + 4 key + kind + presence
        corrupt[8..16].copy_from_slice(&u64::MAX.to_le_bytes());
        let mut r = EntityReader::new(&corrupt);
        assert!(matches!(
            r.read_array::<u8>("Data"),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_corrupt_string_length_fails_cleanly() {
        let bytes = encode(|w| {
            w.write_value("S", &"hi".to_string()).expect("write");
        });
        let mut corrupt = bytes.clone();
        // string length slot sits after marker + key_len + 1 key + kind + presence
        corrupt[5..13].copy_from_slice(&u64::MAX.to_le_bytes());
        let mut r = EntityReader::new(&corrupt);
        assert!(matches!(
            r.read_value::<String>("S"),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut bytes = encode(|w| {
            w.write_value("A", &1u8).expect("write");
        });
        bytes.push(0);
        let mut r = EntityReader::new(&bytes);
        assert_eq!(r.read_value::<u8>("A").expect("a"), 1);
        assert_eq!(r.finish(), Err(Error::TrailingBytes(1)));
    }
}
