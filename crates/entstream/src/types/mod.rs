// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 entstream contributors

//! The closed type catalog: data kinds, container kinds, and the wire-level
//! [`Element`] trait.
//!
//! A [`TypeCombo`] pairs one [`DataKind`] with one [`ContainerKind`]; the
//! registry holds exactly one dispatch record per combo in the cross-product.
//! Data kinds cover scalars, float/integer vectors, square matrices,
//! quaternions, identifiers, 256-bit digests, and strings. Container kinds
//! cover {direct value, dense array, indexed array} x {required, optional}.

mod idx_array;

pub use idx_array::IdxArray;

use crate::error::{Error, Result};
use crate::stream::{ReadCursor, WriteCursor};

/// Invoke a callback macro once with the full data-kind catalog.
///
/// Row format: `(Variant, RustType, wire_code, wire_size)`. `wire_size` is the
/// encoded byte size of one element (0 = variable length).
macro_rules! with_catalog {
    ($callback:ident) => {
        $callback! {
            (Bool, bool, 1, 1),
            (I8, i8, 2, 1),
            (I16, i16, 3, 2),
            (I32, i32, 4, 4),
            (I64, i64, 5, 8),
            (U8, u8, 6, 1),
            (U16, u16, 7, 2),
            (U32, u32, 8, 4),
            (U64, u64, 9, 8),
            (F32, f32, 10, 4),
            (F64, f64, 11, 8),
            (Vec2F, crate::types::FVec2, 12, 8),
            (Vec3F, crate::types::FVec3, 13, 12),
            (Vec4F, crate::types::FVec4, 14, 16),
            (Vec2D, crate::types::DVec2, 15, 16),
            (Vec3D, crate::types::DVec3, 16, 24),
            (Vec4D, crate::types::DVec4, 17, 32),
            (IVec2, crate::types::IVec2, 18, 8),
            (IVec3, crate::types::IVec3, 19, 12),
            (IVec4, crate::types::IVec4, 20, 16),
            (UVec2, crate::types::UVec2, 21, 8),
            (UVec3, crate::types::UVec3, 22, 12),
            (UVec4, crate::types::UVec4, 23, 16),
            (Mat2F, crate::types::FMat2, 24, 16),
            (Mat3F, crate::types::FMat3, 25, 36),
            (Mat4F, crate::types::FMat4, 26, 64),
            (Mat2D, crate::types::DMat2, 27, 32),
            (Mat3D, crate::types::DMat3, 28, 72),
            (Mat4D, crate::types::DMat4, 29, 128),
            (QuatF, crate::types::FQuat, 30, 16),
            (QuatD, crate::types::DQuat, 31, 32),
            (Uuid, crate::types::Uuid, 32, 16),
            (Hash, crate::types::Hash, 33, 32),
            (Str, String, 34, 0),
        }
    };
}
pub(crate) use with_catalog;

macro_rules! define_data_kind {
    ($(($variant:ident, $ty:ty, $code:expr, $size:expr)),+ $(,)?) => {
        /// One entry of the closed data-kind catalog.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum DataKind {
            $($variant = $code),+
        }

        impl DataKind {
            /// All catalog members, in wire-code order.
            pub const ALL: &'static [DataKind] = &[$(DataKind::$variant),+];

            /// Stable wire code of this kind.
            pub fn code(self) -> u8 {
                self as u8
            }

            /// Inverse of [`DataKind::code`]; `None` for codes outside the catalog.
            pub fn from_code(code: u8) -> Option<Self> {
                match code {
                    $($code => Some(DataKind::$variant),)+
                    _ => None,
                }
            }

            /// Encoded byte size of one element of this kind (0 = variable).
            pub fn wire_size(self) -> usize {
                match self {
                    $(DataKind::$variant => $size),+
                }
            }
        }
    };
}
with_catalog!(define_data_kind);

/// Container shape of a serialized field.
///
/// The optional forms are the only ones with an "absent" state; absence is
/// carried by the presence byte on the wire, never by a zero length, so a
/// present-but-empty array stays distinguishable from an absent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContainerKind {
    Value = 1,
    ValueOpt = 2,
    Array = 3,
    ArrayOpt = 4,
    IndexedArray = 5,
    IndexedArrayOpt = 6,
}

impl ContainerKind {
    pub const ALL: &'static [ContainerKind] = &[
        ContainerKind::Value,
        ContainerKind::ValueOpt,
        ContainerKind::Array,
        ContainerKind::ArrayOpt,
        ContainerKind::IndexedArray,
        ContainerKind::IndexedArrayOpt,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ContainerKind::Value),
            2 => Some(ContainerKind::ValueOpt),
            3 => Some(ContainerKind::Array),
            4 => Some(ContainerKind::ArrayOpt),
            5 => Some(ContainerKind::IndexedArray),
            6 => Some(ContainerKind::IndexedArrayOpt),
            _ => None,
        }
    }
}

/// Identity of a registered type: one data kind in one container shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeCombo {
    pub data: DataKind,
    pub container: ContainerKind,
}

impl TypeCombo {
    pub const fn new(data: DataKind, container: ContainerKind) -> Self {
        Self { data, container }
    }

    /// Build a combo from raw wire codes, rejecting codes outside the catalog.
    pub fn from_codes(data: u8, container: u8) -> Result<Self> {
        match (DataKind::from_code(data), ContainerKind::from_code(container)) {
            (Some(d), Some(c)) => Ok(Self::new(d, c)),
            _ => Err(Error::UnknownTypeCombo {
                data_kind: data,
                container,
            }),
        }
    }
}

impl core::fmt::Display for TypeCombo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}/{:?}", self.data, self.container)
    }
}

// ---------------------------------------------------------------------------
// Value representations
// ---------------------------------------------------------------------------

/// Re-export: the identifier data kind uses the `uuid` crate's type.
pub use uuid::Uuid;

/// Generate a fixed-lane value newtype (vector/matrix/quaternion families).
macro_rules! lanes_newtype {
    ($(#[$doc:meta])* $name:ident, $lanes:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Default)]
        pub struct $name<T>(pub [T; $lanes]);

        impl<T> From<[T; $lanes]> for $name<T> {
            fn from(lanes: [T; $lanes]) -> Self {
                Self(lanes)
            }
        }
    };
}

lanes_newtype!(
    /// 2-component vector.
    Vec2, 2
);
lanes_newtype!(
    /// 3-component vector.
    Vec3, 3
);
lanes_newtype!(
    /// 4-component vector.
    Vec4, 4
);
lanes_newtype!(
    /// 2x2 matrix, column-major.
    Mat2, 4
);
lanes_newtype!(
    /// 3x3 matrix, column-major.
    Mat3, 9
);
lanes_newtype!(
    /// 4x4 matrix, column-major.
    Mat4, 16
);
lanes_newtype!(
    /// Quaternion (x, y, z, w).
    Quat, 4
);

pub type FVec2 = Vec2<f32>;
pub type FVec3 = Vec3<f32>;
pub type FVec4 = Vec4<f32>;
pub type DVec2 = Vec2<f64>;
pub type DVec3 = Vec3<f64>;
pub type DVec4 = Vec4<f64>;
pub type IVec2 = Vec2<i32>;
pub type IVec3 = Vec3<i32>;
pub type IVec4 = Vec4<i32>;
pub type UVec2 = Vec2<u32>;
pub type UVec3 = Vec3<u32>;
pub type UVec4 = Vec4<u32>;
pub type FMat2 = Mat2<f32>;
pub type FMat3 = Mat3<f32>;
pub type FMat4 = Mat4<f32>;
pub type DMat2 = Mat2<f64>;
pub type DMat3 = Mat3<f64>;
pub type DMat4 = Mat4<f64>;
pub type FQuat = Quat<f32>;
pub type DQuat = Quat<f64>;

/// 256-bit digest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Hash(pub [u8; 32]);

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Display for Hash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire-level element encoding
// ---------------------------------------------------------------------------

/// A value type the engine can put on the wire.
///
/// Fixed-size kinds encode exactly [`Element::WIRE_SIZE`] little-endian raw
/// bytes per element; `String` encodes a `u64` length followed by UTF-8 bytes.
pub trait Element: Clone + PartialEq + Default + 'static {
    /// The data kind this type registers as.
    const KIND: DataKind;
    /// Encoded byte size of one element; 0 = variable length.
    const WIRE_SIZE: usize;

    fn write_to(&self, out: &mut WriteCursor);
    fn read_from(src: &mut ReadCursor<'_>) -> Result<Self>;
}

macro_rules! impl_scalar_element {
    ($ty:ty, $kind:ident, $size:expr) => {
        impl Element for $ty {
            const KIND: DataKind = DataKind::$kind;
            const WIRE_SIZE: usize = $size;

            fn write_to(&self, out: &mut WriteCursor) {
                out.write_bytes(&self.to_le_bytes());
            }

            fn read_from(src: &mut ReadCursor<'_>) -> Result<Self> {
                let mut bytes = [0u8; $size];
                bytes.copy_from_slice(src.read_bytes($size)?);
                Ok(<$ty>::from_le_bytes(bytes))
            }
        }
    };
}

impl_scalar_element!(i8, I8, 1);
impl_scalar_element!(i16, I16, 2);
impl_scalar_element!(i32, I32, 4);
impl_scalar_element!(i64, I64, 8);
impl_scalar_element!(u8, U8, 1);
impl_scalar_element!(u16, U16, 2);
impl_scalar_element!(u32, U32, 4);
impl_scalar_element!(u64, U64, 8);
impl_scalar_element!(f32, F32, 4);
impl_scalar_element!(f64, F64, 8);

impl Element for bool {
    const KIND: DataKind = DataKind::Bool;
    const WIRE_SIZE: usize = 1;

    fn write_to(&self, out: &mut WriteCursor) {
        out.write_u8(u8::from(*self));
    }

    fn read_from(src: &mut ReadCursor<'_>) -> Result<Self> {
        match src.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::BadFlag(other)),
        }
    }
}

macro_rules! impl_lanes_element {
    ($ty:ty, $lane:ty, $lanes:expr, $kind:ident) => {
        impl Element for $ty {
            const KIND: DataKind = DataKind::$kind;
            const WIRE_SIZE: usize = $lanes * core::mem::size_of::<$lane>();

            fn write_to(&self, out: &mut WriteCursor) {
                for lane in &self.0 {
                    out.write_bytes(&lane.to_le_bytes());
                }
            }

            fn read_from(src: &mut ReadCursor<'_>) -> Result<Self> {
                const LANE: usize = core::mem::size_of::<$lane>();
                let mut lanes = [<$lane>::default(); $lanes];
                for lane in &mut lanes {
                    let mut bytes = [0u8; LANE];
                    bytes.copy_from_slice(src.read_bytes(LANE)?);
                    *lane = <$lane>::from_le_bytes(bytes);
                }
                Ok(Self(lanes))
            }
        }
    };
}

impl_lanes_element!(FVec2, f32, 2, Vec2F);
impl_lanes_element!(FVec3, f32, 3, Vec3F);
impl_lanes_element!(FVec4, f32, 4, Vec4F);
impl_lanes_element!(DVec2, f64, 2, Vec2D);
impl_lanes_element!(DVec3, f64, 3, Vec3D);
impl_lanes_element!(DVec4, f64, 4, Vec4D);
impl_lanes_element!(IVec2, i32, 2, IVec2);
impl_lanes_element!(IVec3, i32, 3, IVec3);
impl_lanes_element!(IVec4, i32, 4, IVec4);
impl_lanes_element!(UVec2, u32, 2, UVec2);
impl_lanes_element!(UVec3, u32, 3, UVec3);
impl_lanes_element!(UVec4, u32, 4, UVec4);
impl_lanes_element!(FMat2, f32, 4, Mat2F);
impl_lanes_element!(FMat3, f32, 9, Mat3F);
impl_lanes_element!(FMat4, f32, 16, Mat4F);
impl_lanes_element!(DMat2, f64, 4, Mat2D);
impl_lanes_element!(DMat3, f64, 9, Mat3D);
impl_lanes_element!(DMat4, f64, 16, Mat4D);
impl_lanes_element!(FQuat, f32, 4, QuatF);
impl_lanes_element!(DQuat, f64, 4, QuatD);

impl Element for Uuid {
    const KIND: DataKind = DataKind::Uuid;
    const WIRE_SIZE: usize = 16;

    fn write_to(&self, out: &mut WriteCursor) {
        out.write_bytes(self.as_bytes());
    }

    fn read_from(src: &mut ReadCursor<'_>) -> Result<Self> {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(src.read_bytes(16)?);
        Ok(Uuid::from_bytes(bytes))
    }
}

impl Element for Hash {
    const KIND: DataKind = DataKind::Hash;
    const WIRE_SIZE: usize = 32;

    fn write_to(&self, out: &mut WriteCursor) {
        out.write_bytes(&self.0);
    }

    fn read_from(src: &mut ReadCursor<'_>) -> Result<Self> {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(src.read_bytes(32)?);
        Ok(Hash(bytes))
    }
}

impl Element for String {
    const KIND: DataKind = DataKind::Str;
    const WIRE_SIZE: usize = 0;

    fn write_to(&self, out: &mut WriteCursor) {
        out.write_u64(self.len() as u64);
        out.write_bytes(self.as_bytes());
    }

    fn read_from(src: &mut ReadCursor<'_>) -> Result<Self> {
        let len = src.read_u64()? as usize;
        let bytes = src.read_bytes(len)?;
        core::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| Error::BadUtf8)
    }
}
