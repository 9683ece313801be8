// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 entstream contributors

//! [`Varying`]: a polymorphic value slot typed at runtime.
//!
//! The slot either is empty or owns one [`VarData`] payload, an enum with one
//! variant per combo in the catalog cross-product. Untyped operations (clear,
//! deep copy, equality, serialization) go through the per-combo records in
//! [`crate::registry`]; typed access goes through [`VaryingType`], which maps
//! each Rust storage type to its combo at compile time.

use crate::error::{Error, Result};
use crate::reader::EntityReader;
use crate::registry::{self, DispatchRecord};
use crate::types::{with_catalog, ContainerKind, DataKind, IdxArray, TypeCombo};
use crate::writer::EntityWriter;

fn type_mismatch(expected: TypeCombo, got: &VarData) -> Error {
    Error::TypeMismatch {
        expected,
        got: got.combo(),
    }
}

/// A Rust storage type that occupies exactly one combo of the catalog.
pub trait VaryingType: Sized {
    const COMBO: TypeCombo;

    fn into_var(self) -> VarData;
    fn from_var(data: &VarData) -> Option<&Self>;
    fn from_var_mut(data: &mut VarData) -> Option<&mut Self>;
}

macro_rules! define_varying {
    ($(($variant:ident, $ty:ty, $code:expr, $size:expr)),+ $(,)?) => {
        paste::paste! {
            /// Owned payload of a [`Varying`] slot: one variant per combo.
            #[derive(Debug, Clone, PartialEq)]
            pub enum VarData {
                $(
                    [<$variant Value>]($ty),
                    [<$variant ValueOpt>](Option<$ty>),
                    [<$variant Array>](Vec<$ty>),
                    [<$variant ArrayOpt>](Option<Vec<$ty>>),
                    [<$variant IndexedArray>](IdxArray<$ty>),
                    [<$variant IndexedArrayOpt>](Option<IdxArray<$ty>>),
                )+
            }

            impl VarData {
                /// The combo this payload carries.
                pub fn combo(&self) -> TypeCombo {
                    match self {
                        $(
                            VarData::[<$variant Value>](_) =>
                                TypeCombo::new(DataKind::$variant, ContainerKind::Value),
                            VarData::[<$variant ValueOpt>](_) =>
                                TypeCombo::new(DataKind::$variant, ContainerKind::ValueOpt),
                            VarData::[<$variant Array>](_) =>
                                TypeCombo::new(DataKind::$variant, ContainerKind::Array),
                            VarData::[<$variant ArrayOpt>](_) =>
                                TypeCombo::new(DataKind::$variant, ContainerKind::ArrayOpt),
                            VarData::[<$variant IndexedArray>](_) =>
                                TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArray),
                            VarData::[<$variant IndexedArrayOpt>](_) =>
                                TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArrayOpt),
                        )+
                    }
                }
            }

            $(
                impl VaryingType for $ty {
                    const COMBO: TypeCombo =
                        TypeCombo::new(DataKind::$variant, ContainerKind::Value);

                    fn into_var(self) -> VarData {
                        VarData::[<$variant Value>](self)
                    }
                    fn from_var(data: &VarData) -> Option<&Self> {
                        match data {
                            VarData::[<$variant Value>](x) => Some(x),
                            _ => None,
                        }
                    }
                    fn from_var_mut(data: &mut VarData) -> Option<&mut Self> {
                        match data {
                            VarData::[<$variant Value>](x) => Some(x),
                            _ => None,
                        }
                    }
                }

                impl VaryingType for Option<$ty> {
                    const COMBO: TypeCombo =
                        TypeCombo::new(DataKind::$variant, ContainerKind::ValueOpt);

                    fn into_var(self) -> VarData {
                        VarData::[<$variant ValueOpt>](self)
                    }
                    fn from_var(data: &VarData) -> Option<&Self> {
                        match data {
                            VarData::[<$variant ValueOpt>](x) => Some(x),
                            _ => None,
                        }
                    }
                    fn from_var_mut(data: &mut VarData) -> Option<&mut Self> {
                        match data {
                            VarData::[<$variant ValueOpt>](x) => Some(x),
                            _ => None,
                        }
                    }
                }

                impl VaryingType for Vec<$ty> {
                    const COMBO: TypeCombo =
                        TypeCombo::new(DataKind::$variant, ContainerKind::Array);

                    fn into_var(self) -> VarData {
                        VarData::[<$variant Array>](self)
                    }
                    fn from_var(data: &VarData) -> Option<&Self> {
                        match data {
                            VarData::[<$variant Array>](x) => Some(x),
                            _ => None,
                        }
                    }
                    fn from_var_mut(data: &mut VarData) -> Option<&mut Self> {
                        match data {
                            VarData::[<$variant Array>](x) => Some(x),
                            _ => None,
                        }
                    }
                }

                impl VaryingType for Option<Vec<$ty>> {
                    const COMBO: TypeCombo =
                        TypeCombo::new(DataKind::$variant, ContainerKind::ArrayOpt);

                    fn into_var(self) -> VarData {
                        VarData::[<$variant ArrayOpt>](self)
                    }
                    fn from_var(data: &VarData) -> Option<&Self> {
                        match data {
                            VarData::[<$variant ArrayOpt>](x) => Some(x),
                            _ => None,
                        }
                    }
                    fn from_var_mut(data: &mut VarData) -> Option<&mut Self> {
                        match data {
                            VarData::[<$variant ArrayOpt>](x) => Some(x),
                            _ => None,
                        }
                    }
                }

                impl VaryingType for IdxArray<$ty> {
                    const COMBO: TypeCombo =
                        TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArray);

                    fn into_var(self) -> VarData {
                        VarData::[<$variant IndexedArray>](self)
                    }
                    fn from_var(data: &VarData) -> Option<&Self> {
                        match data {
                            VarData::[<$variant IndexedArray>](x) => Some(x),
                            _ => None,
                        }
                    }
                    fn from_var_mut(data: &mut VarData) -> Option<&mut Self> {
                        match data {
                            VarData::[<$variant IndexedArray>](x) => Some(x),
                            _ => None,
                        }
                    }
                }

                impl VaryingType for Option<IdxArray<$ty>> {
                    const COMBO: TypeCombo =
                        TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArrayOpt);

                    fn into_var(self) -> VarData {
                        VarData::[<$variant IndexedArrayOpt>](self)
                    }
                    fn from_var(data: &VarData) -> Option<&Self> {
                        match data {
                            VarData::[<$variant IndexedArrayOpt>](x) => Some(x),
                            _ => None,
                        }
                    }
                    fn from_var_mut(data: &mut VarData) -> Option<&mut Self> {
                        match data {
                            VarData::[<$variant IndexedArrayOpt>](x) => Some(x),
                            _ => None,
                        }
                    }
                }
            )+

            pub(crate) static RECORDS: &[DispatchRecord] = &[
                $(
                    DispatchRecord {
                        combo: TypeCombo::new(DataKind::$variant, ContainerKind::Value),
                        new: || VarData::[<$variant Value>](<$ty>::default()),
                        clear: |data| match data {
                            VarData::[<$variant Value>](x) => {
                                *x = <$ty>::default();
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::Value),
                                other,
                            )),
                        },
                        copy: |dst, src| match (dst, src) {
                            (VarData::[<$variant Value>](d), VarData::[<$variant Value>](s)) => {
                                d.clone_from(s);
                                Ok(())
                            }
                            (dst, src) => Err(copy_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::Value),
                                dst,
                                src,
                            )),
                        },
                        equals: |a, b| matches!(
                            (a, b),
                            (VarData::[<$variant Value>](x), VarData::[<$variant Value>](y))
                                if x == y
                        ),
                        write: |data, w, key| match data {
                            VarData::[<$variant Value>](x) => w.write_value(key, x),
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::Value),
                                other,
                            )),
                        },
                        read: |data, r, key| match data {
                            VarData::[<$variant Value>](x) => {
                                *x = r.read_value(key)?;
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::Value),
                                other,
                            )),
                        },
                    },
                    DispatchRecord {
                        combo: TypeCombo::new(DataKind::$variant, ContainerKind::ValueOpt),
                        new: || VarData::[<$variant ValueOpt>](None),
                        clear: |data| match data {
                            VarData::[<$variant ValueOpt>](x) => {
                                *x = None;
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::ValueOpt),
                                other,
                            )),
                        },
                        copy: |dst, src| match (dst, src) {
                            (
                                VarData::[<$variant ValueOpt>](d),
                                VarData::[<$variant ValueOpt>](s),
                            ) => {
                                d.clone_from(s);
                                Ok(())
                            }
                            (dst, src) => Err(copy_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::ValueOpt),
                                dst,
                                src,
                            )),
                        },
                        equals: |a, b| matches!(
                            (a, b),
                            (
                                VarData::[<$variant ValueOpt>](x),
                                VarData::[<$variant ValueOpt>](y)
                            ) if x == y
                        ),
                        write: |data, w, key| match data {
                            VarData::[<$variant ValueOpt>](x) => {
                                w.write_value_opt(key, x.as_ref())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::ValueOpt),
                                other,
                            )),
                        },
                        read: |data, r, key| match data {
                            VarData::[<$variant ValueOpt>](x) => {
                                *x = r.read_value_opt(key)?;
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::ValueOpt),
                                other,
                            )),
                        },
                    },
                    DispatchRecord {
                        combo: TypeCombo::new(DataKind::$variant, ContainerKind::Array),
                        new: || VarData::[<$variant Array>](Vec::new()),
                        clear: |data| match data {
                            VarData::[<$variant Array>](x) => {
                                x.clear();
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::Array),
                                other,
                            )),
                        },
                        copy: |dst, src| match (dst, src) {
                            (VarData::[<$variant Array>](d), VarData::[<$variant Array>](s)) => {
                                d.clone_from(s);
                                Ok(())
                            }
                            (dst, src) => Err(copy_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::Array),
                                dst,
                                src,
                            )),
                        },
                        equals: |a, b| matches!(
                            (a, b),
                            (VarData::[<$variant Array>](x), VarData::[<$variant Array>](y))
                                if x == y
                        ),
                        write: |data, w, key| match data {
                            VarData::[<$variant Array>](x) => w.write_array(key, x),
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::Array),
                                other,
                            )),
                        },
                        read: |data, r, key| match data {
                            VarData::[<$variant Array>](x) => {
                                *x = r.read_array(key)?;
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::Array),
                                other,
                            )),
                        },
                    },
                    DispatchRecord {
                        combo: TypeCombo::new(DataKind::$variant, ContainerKind::ArrayOpt),
                        new: || VarData::[<$variant ArrayOpt>](None),
                        clear: |data| match data {
                            VarData::[<$variant ArrayOpt>](x) => {
                                *x = None;
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::ArrayOpt),
                                other,
                            )),
                        },
                        copy: |dst, src| match (dst, src) {
                            (
                                VarData::[<$variant ArrayOpt>](d),
                                VarData::[<$variant ArrayOpt>](s),
                            ) => {
                                d.clone_from(s);
                                Ok(())
                            }
                            (dst, src) => Err(copy_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::ArrayOpt),
                                dst,
                                src,
                            )),
                        },
                        equals: |a, b| matches!(
                            (a, b),
                            (
                                VarData::[<$variant ArrayOpt>](x),
                                VarData::[<$variant ArrayOpt>](y)
                            ) if x == y
                        ),
                        write: |data, w, key| match data {
                            VarData::[<$variant ArrayOpt>](x) => {
                                w.write_array_opt(key, x.as_deref())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::ArrayOpt),
                                other,
                            )),
                        },
                        read: |data, r, key| match data {
                            VarData::[<$variant ArrayOpt>](x) => {
                                *x = r.read_array_opt(key)?;
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::ArrayOpt),
                                other,
                            )),
                        },
                    },
                    DispatchRecord {
                        combo: TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArray),
                        new: || VarData::[<$variant IndexedArray>](IdxArray::new()),
                        clear: |data| match data {
                            VarData::[<$variant IndexedArray>](x) => {
                                x.clear();
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArray),
                                other,
                            )),
                        },
                        copy: |dst, src| match (dst, src) {
                            (
                                VarData::[<$variant IndexedArray>](d),
                                VarData::[<$variant IndexedArray>](s),
                            ) => {
                                d.clone_from(s);
                                Ok(())
                            }
                            (dst, src) => Err(copy_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArray),
                                dst,
                                src,
                            )),
                        },
                        equals: |a, b| matches!(
                            (a, b),
                            (
                                VarData::[<$variant IndexedArray>](x),
                                VarData::[<$variant IndexedArray>](y)
                            ) if x == y
                        ),
                        write: |data, w, key| match data {
                            VarData::[<$variant IndexedArray>](x) => w.write_idx_array(key, x),
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArray),
                                other,
                            )),
                        },
                        read: |data, r, key| match data {
                            VarData::[<$variant IndexedArray>](x) => {
                                *x = r.read_idx_array(key)?;
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArray),
                                other,
                            )),
                        },
                    },
                    DispatchRecord {
                        combo: TypeCombo::new(
                            DataKind::$variant,
                            ContainerKind::IndexedArrayOpt,
                        ),
                        new: || VarData::[<$variant IndexedArrayOpt>](None),
                        clear: |data| match data {
                            VarData::[<$variant IndexedArrayOpt>](x) => {
                                *x = None;
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArrayOpt),
                                other,
                            )),
                        },
                        copy: |dst, src| match (dst, src) {
                            (
                                VarData::[<$variant IndexedArrayOpt>](d),
                                VarData::[<$variant IndexedArrayOpt>](s),
                            ) => {
                                d.clone_from(s);
                                Ok(())
                            }
                            (dst, src) => Err(copy_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArrayOpt),
                                dst,
                                src,
                            )),
                        },
                        equals: |a, b| matches!(
                            (a, b),
                            (
                                VarData::[<$variant IndexedArrayOpt>](x),
                                VarData::[<$variant IndexedArrayOpt>](y)
                            ) if x == y
                        ),
                        write: |data, w, key| match data {
                            VarData::[<$variant IndexedArrayOpt>](x) => {
                                w.write_idx_array_opt(key, x.as_ref())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArrayOpt),
                                other,
                            )),
                        },
                        read: |data, r, key| match data {
                            VarData::[<$variant IndexedArrayOpt>](x) => {
                                *x = r.read_idx_array_opt(key)?;
                                Ok(())
                            }
                            other => Err(type_mismatch(
                                TypeCombo::new(DataKind::$variant, ContainerKind::IndexedArrayOpt),
                                other,
                            )),
                        },
                    },
                )+
            ];
        }
    };
}
with_catalog!(define_varying);

fn copy_mismatch(expected: TypeCombo, dst: &VarData, src: &VarData) -> Error {
    let got = if dst.combo() == expected {
        src.combo()
    } else {
        dst.combo()
    };
    Error::TypeMismatch { expected, got }
}

/// A runtime-typed value slot.
///
/// Starts empty; [`Varying::set_type`] allocates a default payload for a
/// combo, [`Varying::set`] stores a typed value directly. The slot's combo is
/// whatever its payload carries, so it can never go stale.
#[derive(Debug, Clone, Default)]
pub struct Varying {
    data: Option<Box<VarData>>,
}

impl Varying {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// The combo currently held, `None` for an empty slot.
    pub fn combo(&self) -> Option<TypeCombo> {
        self.data.as_deref().map(VarData::combo)
    }

    pub fn data(&self) -> Option<&VarData> {
        self.data.as_deref()
    }

    /// Give the slot a default payload of `combo`. Re-setting the current
    /// combo clears the payload instead of reallocating.
    pub fn set_type(&mut self, combo: TypeCombo) -> Result<()> {
        if self.combo() == Some(combo) {
            return self.clear();
        }
        let record = registry::lookup(combo)?;
        self.data = Some(Box::new((record.new)()));
        Ok(())
    }

    /// Reset the payload to its default, keeping the combo. No-op on an
    /// empty slot.
    pub fn clear(&mut self) -> Result<()> {
        match &mut self.data {
            Some(data) => {
                let record = registry::lookup(data.combo())?;
                (record.clear)(data)
            }
            None => Ok(()),
        }
    }

    /// Drop payload and type, returning the slot to empty.
    pub fn reset(&mut self) {
        self.data = None;
    }

    /// Give the slot a default payload of `T`'s combo.
    pub fn set_type_as<T: VaryingType>(&mut self) -> Result<()> {
        self.set_type(T::COMBO)
    }

    /// Whether the slot currently holds `T`'s combo.
    pub fn is_a<T: VaryingType>(&self) -> bool {
        self.combo() == Some(T::COMBO)
    }

    /// Store a typed value; the slot takes the value's combo.
    pub fn set<T: VaryingType>(&mut self, value: T) {
        self.data = Some(Box::new(value.into_var()));
    }

    /// Typed view of the payload; `None` if empty or a different combo.
    pub fn get<T: VaryingType>(&self) -> Option<&T> {
        self.data.as_deref().and_then(T::from_var)
    }

    pub fn get_mut<T: VaryingType>(&mut self) -> Option<&mut T> {
        self.data.as_deref_mut().and_then(T::from_var_mut)
    }

    /// Make this slot an independent copy of `other`, retyping if needed.
    pub fn deep_copy(&mut self, other: &Varying) -> Result<()> {
        let Some(src) = other.data.as_deref() else {
            self.data = None;
            return Ok(());
        };
        let record = registry::lookup(src.combo())?;
        match &mut self.data {
            Some(dst) if dst.combo() == src.combo() => (record.copy)(dst, src),
            _ => {
                let mut dst = (record.new)();
                (record.copy)(&mut dst, src)?;
                self.data = Some(Box::new(dst));
                Ok(())
            }
        }
    }

    /// Serialize the slot under `key`: an empty slot becomes an absent
    /// section, a typed slot a section carrying the combo codes and payload.
    pub fn write(&self, w: &mut EntityWriter, key: &str) -> Result<()> {
        let Some(data) = self.data.as_deref() else {
            return w.write_null_section(key);
        };
        let combo = data.combo();
        let record = registry::lookup(combo)?;
        let section = w.begin_section(key)?;
        w.write_value("dt", &combo.data.code())?;
        w.write_value("ct", &combo.container.code())?;
        (record.write)(data, w, "v")?;
        w.end_section(section)
    }

    /// Deserialize a slot written by [`Varying::write`]. Combo codes outside
    /// the catalog fail with `UnknownTypeCombo` before any payload is read.
    pub fn read(r: &mut EntityReader<'_>, key: &str) -> Result<Varying> {
        let Some(section) = r.begin_section(key, false)? else {
            return Ok(Varying::new());
        };
        let dt = r.read_value::<u8>("dt")?;
        let ct = r.read_value::<u8>("ct")?;
        let record = registry::lookup_codes(dt, ct)?;
        let mut data = (record.new)();
        (record.read)(&mut data, r, "v")?;
        r.end_section(section)?;
        Ok(Varying {
            data: Some(Box::new(data)),
        })
    }
}

impl PartialEq for Varying {
    fn eq(&self, other: &Self) -> bool {
        match (self.data.as_deref(), other.data.as_deref()) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                if core::ptr::eq(a, b) {
                    return true;
                }
                match registry::lookup(a.combo()) {
                    Ok(record) => (record.equals)(a, b),
                    Err(_) => false,
                }
            }
            _ => false,
        }
    }
}
