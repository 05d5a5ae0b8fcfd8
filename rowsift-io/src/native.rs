use std::fmt::{Debug, Display, Formatter};

use bytemuck::Pod;
use half::f16;

/// The primitive element types a [`RowStore`](crate::RowStore) can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
}

impl PType {
    /// The number of bytes one element occupies on disk.
    pub const fn byte_width(&self) -> usize {
        match self {
            PType::U8 | PType::I8 => 1,
            PType::U16 | PType::I16 | PType::F16 => 2,
            PType::U32 | PType::I32 | PType::F32 => 4,
            PType::U64 | PType::I64 | PType::F64 => 8,
        }
    }
}

impl Display for PType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PType::U8 => write!(f, "u8"),
            PType::U16 => write!(f, "u16"),
            PType::U32 => write!(f, "u32"),
            PType::U64 => write!(f, "u64"),
            PType::I8 => write!(f, "i8"),
            PType::I16 => write!(f, "i16"),
            PType::I32 => write!(f, "i32"),
            PType::I64 => write!(f, "i64"),
            PType::F16 => write!(f, "f16"),
            PType::F32 => write!(f, "f32"),
            PType::F64 => write!(f, "f64"),
        }
    }
}

/// A plain numeric value that can be read out of a row store.
///
/// Values are [`Pod`], so a slice of them can be filled directly from raw bytes.
pub trait NativeValue: Pod + Default + Debug + PartialEq + Send + Sync {
    /// The [`PType`] that describes this value.
    const PTYPE: PType;

    /// Decode a value from exactly [`PType::byte_width`] little-endian bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;
}

/// Convert values filled from little-endian bytes to native byte order, in place.
#[inline]
pub fn le_to_native<T: NativeValue>(values: &mut [T]) {
    if cfg!(target_endian = "big") {
        for value in values {
            *value = T::from_le_slice(bytemuck::bytes_of(value));
        }
    }
}

macro_rules! native_value {
    ($T:ty, $ptype:tt) => {
        impl NativeValue for $T {
            const PTYPE: PType = PType::$ptype;

            #[inline]
            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut raw = [0u8; size_of::<$T>()];
                raw.copy_from_slice(bytes);
                <$T>::from_le_bytes(raw)
            }
        }
    };
}

native_value!(u8, U8);
native_value!(u16, U16);
native_value!(u32, U32);
native_value!(u64, U64);
native_value!(i8, I8);
native_value!(i16, I16);
native_value!(i32, I32);
native_value!(i64, I64);
native_value!(f16, F16);
native_value!(f32, F32);
native_value!(f64, F64);
