//! Element precision of stored vectors and the explicit conversions between them.
//!
//! [`Float`] is sealed and implemented for `f32` and `f64` only. Responses are
//! generic over it, so a backend picks its storage type once and never keeps a
//! second copy of the vector around.
use serde::de::{DeserializeOwned, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::EmbeddingError;

/// Floating-point bit width of a vector (or `Null` for the no-op backend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    Null,
    Float32,
    Float64,
}

impl Precision {
    /// Bit width, `None` for [`Precision::Null`].
    pub fn bits(self) -> Option<u32> {
        match self {
            Precision::Null => None,
            Precision::Float32 => Some(32),
            Precision::Float64 => Some(64),
        }
    }

    /// Maps a bit width from configuration (32 or 64).
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(Precision::Float32),
            64 => Some(Precision::Float64),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Precision::Null => "null",
            Precision::Float32 => "float32",
            Precision::Float64 => "float64",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "null" | "0" => Ok(Precision::Null),
            "float32" | "f32" | "32" => Ok(Precision::Float32),
            "float64" | "f64" | "64" => Ok(Precision::Float64),
            other => Err(EmbeddingError::InvalidParameter {
                param: "precision".into(),
                reason: format!("unrecognized precision '{other}'"),
            }),
        }
    }
}

/// Storage precision of a response plus an optional presentation hint.
///
/// `storage` always matches the element type actually held. `presentation`
/// names the precision the values were produced at when that differs, e.g.
/// float32 model output widened into float64 storage renders as
/// `float64#as-float32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrecisionTag {
    storage: Precision,
    presentation: Option<Precision>,
}

impl PrecisionTag {
    pub fn new(storage: Precision, presentation: Option<Precision>) -> Self {
        let presentation = presentation.filter(|p| *p != storage);
        Self {
            storage,
            presentation,
        }
    }

    pub fn native(storage: Precision) -> Self {
        Self::new(storage, None)
    }

    pub fn null() -> Self {
        Self::native(Precision::Null)
    }

    pub fn storage(&self) -> Precision {
        self.storage
    }

    pub fn presentation(&self) -> Option<Precision> {
        self.presentation
    }

    pub fn is_null(&self) -> bool {
        self.storage == Precision::Null
    }
}

impl fmt::Display for PrecisionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.presentation {
            Some(hint) => write!(f, "{}#as-{}", self.storage, hint),
            None => write!(f, "{}", self.storage),
        }
    }
}

impl FromStr for PrecisionTag {
    type Err = EmbeddingError;

    /// Accepts the canonical form as well as the older `64#32` and
    /// `float32#as-float64` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('#') {
            Some((storage, hint)) => {
                let hint = hint.strip_prefix("as-").unwrap_or(hint);
                Ok(PrecisionTag::new(storage.parse()?, Some(hint.parse()?)))
            }
            None => Ok(PrecisionTag::native(s.parse()?)),
        }
    }
}

impl Serialize for PrecisionTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PrecisionTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Vector element type: `f32` or `f64`.
pub trait Float:
    sealed::Sealed
    + Copy
    + Default
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const PRECISION: Precision;

    fn from_f32(value: f32) -> Self;
    /// Narrowing for `f32` (rounds to nearest, overflow becomes infinity).
    fn from_f64(value: f64) -> Self;
    fn to_f32(self) -> f32;
    fn to_f64(self) -> f64;
}

impl Float for f32 {
    const PRECISION: Precision = Precision::Float32;

    fn from_f32(value: f32) -> Self {
        value
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f32(self) -> f32 {
        self
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Float for f64 {
    const PRECISION: Precision = Precision::Float64;

    fn from_f32(value: f32) -> Self {
        f64::from(value)
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn to_f64(self) -> f64 {
        self
    }
}

/// Narrow a float64 vector elementwise.
pub fn as_float32(values: &[f64]) -> Vec<f32> {
    values.iter().map(|v| *v as f32).collect()
}

/// Widen a float32 vector elementwise. Exact.
pub fn as_float64(values: &[f32]) -> Vec<f64> {
    values.iter().map(|v| f64::from(*v)).collect()
}

/// Convert between any two [`Float`] types. Routing through `f64` keeps the
/// widening path exact and the narrowing path identical to [`as_float32`].
pub fn convert_slice<S: Float, D: Float>(values: &[S]) -> Vec<D> {
    values.iter().map(|v| D::from_f64(v.to_f64())).collect()
}
