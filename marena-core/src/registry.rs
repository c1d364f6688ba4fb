//! Primitive value kinds stored in arena blocks.
//!
//! Each kind has a fixed byte width and converts between its textual
//! literal form and little-endian bytes. The set is closed: a type tag that
//! does not name a `ValueKind` is rejected at `create` time.

use crate::error::{ArenaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A primitive type that a block can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// 32-bit signed integer (`int`).
    Int,
    /// 16-bit signed integer (`short`).
    Short,
    /// 64-bit signed integer (`long`).
    Long,
    /// 64-bit signed integer (`long long`).
    LongLong,
    /// Single-precision float (`float`).
    Float,
    /// Double-precision float (`double`).
    Double,
    /// Single byte character (`char`).
    Char,
    /// Boolean stored as one byte (`bool`).
    Bool,
}

impl ValueKind {
    /// Every supported kind, in tag order.
    pub const fn all() -> &'static [ValueKind] {
        &[
            Self::Int,
            Self::Short,
            Self::Long,
            Self::LongLong,
            Self::Float,
            Self::Double,
            Self::Char,
            Self::Bool,
        ]
    }

    /// Look up a kind by its type tag.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "int" => Ok(Self::Int),
            "short" => Ok(Self::Short),
            "long" => Ok(Self::Long),
            "long long" => Ok(Self::LongLong),
            "float" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            "char" => Ok(Self::Char),
            "bool" => Ok(Self::Bool),
            _ => Err(ArenaError::InvalidType {
                type_tag: tag.to_string(),
            }),
        }
    }

    /// The type tag naming this kind.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Short => "short",
            Self::Long => "long",
            Self::LongLong => "long long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
            Self::Bool => "bool",
        }
    }

    /// Fixed byte width of a stored value.
    pub const fn width(&self) -> usize {
        match self {
            Self::Int | Self::Float => 4,
            Self::Short => 2,
            Self::Long | Self::LongLong | Self::Double => 8,
            Self::Char | Self::Bool => 1,
        }
    }

    /// Encode a textual literal into bytes for a block of `capacity` bytes.
    ///
    /// Fails with `Conversion` if the literal is malformed for this kind or
    /// if the encoded value does not fit in `capacity`.
    pub fn encode(&self, text: &str, capacity: usize) -> Result<Vec<u8>> {
        if capacity < self.width() {
            return Err(ArenaError::conversion(
                self.tag(),
                text,
                format!(
                    "encoded width {} exceeds block size {}",
                    self.width(),
                    capacity
                ),
            ));
        }

        let literal = text.trim();
        let bytes = match self {
            Self::Int => parse_literal::<i32>(*self, literal)?.to_le_bytes().to_vec(),
            Self::Short => parse_literal::<i16>(*self, literal)?.to_le_bytes().to_vec(),
            Self::Long | Self::LongLong => {
                parse_literal::<i64>(*self, literal)?.to_le_bytes().to_vec()
            }
            Self::Float => parse_float::<f32>(*self, literal)?.to_le_bytes().to_vec(),
            Self::Double => parse_float::<f64>(*self, literal)?.to_le_bytes().to_vec(),
            Self::Bool => match literal {
                "true" => vec![1],
                "false" => vec![0],
                _ => {
                    return Err(ArenaError::conversion(
                        self.tag(),
                        text,
                        "expected 'true' or 'false'",
                    ));
                }
            },
            // No trimming: a space is a valid character.
            Self::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => vec![u8::try_from(c).map_err(|_| {
                        ArenaError::conversion(self.tag(), text, "character does not fit in one byte")
                    })?],
                    _ => {
                        return Err(ArenaError::conversion(
                            self.tag(),
                            text,
                            "expected exactly one character",
                        ));
                    }
                }
            }
        };

        Ok(bytes)
    }

    /// Decode stored bytes into the kind's canonical textual form.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let bytes = bytes.get(..self.width()).ok_or_else(|| {
            ArenaError::conversion(
                self.tag(),
                format!("{bytes:02x?}"),
                format!("need {} bytes, got {}", self.width(), bytes.len()),
            )
        })?;

        let text = match self {
            Self::Int => i32::from_le_bytes(fixed(bytes)).to_string(),
            Self::Short => i16::from_le_bytes(fixed(bytes)).to_string(),
            Self::Long | Self::LongLong => i64::from_le_bytes(fixed(bytes)).to_string(),
            Self::Float => f32::from_le_bytes(fixed(bytes)).to_string(),
            Self::Double => f64::from_le_bytes(fixed(bytes)).to_string(),
            Self::Char => char::from(bytes[0]).to_string(),
            Self::Bool => match bytes[0] {
                0 => "false".to_string(),
                1 => "true".to_string(),
                other => {
                    return Err(ArenaError::conversion(
                        self.tag(),
                        format!("{other:#04x}"),
                        "stored byte is not a boolean",
                    ));
                }
            },
        };

        Ok(text)
    }
}

impl FromStr for ValueKind {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Width of a type tag, the registry's `sizeof`.
pub fn size_of_tag(tag: &str) -> Result<usize> {
    ValueKind::from_tag(tag).map(|kind| kind.width())
}

fn parse_literal<T>(kind: ValueKind, literal: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    literal
        .parse::<T>()
        .map_err(|e| ArenaError::conversion(kind.tag(), literal, e.to_string()))
}

fn parse_float<T>(kind: ValueKind, literal: &str) -> Result<T>
where
    T: FromStr + Into<f64> + Copy,
    T::Err: fmt::Display,
{
    // Rust accepts "inf"/"NaN" spellings; only plain decimal literals are values here.
    if literal
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return Err(ArenaError::conversion(
            kind.tag(),
            literal,
            "not a decimal literal",
        ));
    }
    let value: T = parse_literal(kind, literal)?;
    if !value.into().is_finite() {
        return Err(ArenaError::conversion(kind.tag(), literal, "out of range"));
    }
    Ok(value)
}

fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}
