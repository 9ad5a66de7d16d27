//! Bit-plane codec
//!
//! A plane is the 8-bit window of a stored permission that belongs to one
//! hierarchy level. Each position is `0`, `1` or `-` (no policy exists, as
//! opposed to an explicit deny). Strings are written ACL first, EXIST last.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::constants::PLANE_WIDTH;
use crate::error::{CalcError, Result};
use crate::model::check_shift;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bit {
    Zero,
    One,
    Unknown,
}

impl Bit {
    pub fn as_char(self) -> char {
        match self {
            Bit::Zero => '0',
            Bit::One => '1',
            Bit::Unknown => '-',
        }
    }

    pub fn from_char(c: char) -> Result<Self> {
        match c {
            '0' => Ok(Bit::Zero),
            '1' => Ok(Bit::One),
            '-' => Ok(Bit::Unknown),
            _ => Err(CalcError::InvalidBitWidth(format!("invalid plane character {:?}", c))),
        }
    }

    #[inline]
    pub fn is_set(self) -> bool {
        self == Bit::One
    }
}

impl From<bool> for Bit {
    fn from(v: bool) -> Self {
        if v { Bit::One } else { Bit::Zero }
    }
}

/// Eight bits in string order: index 0 is ACL, index 7 is EXIST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Plane([Bit; 8]);

impl Plane {
    /// No policy between the entity and the target
    pub const UNKNOWN: Plane = Plane([Bit::Unknown; 8]);
    /// Caller cannot see ACLs: EXIST denied, everything above unknown
    pub const NO_ACCESS: Plane = Plane([
        Bit::Zero, Bit::Unknown, Bit::Unknown, Bit::Unknown,
        Bit::Unknown, Bit::Unknown, Bit::Unknown, Bit::Unknown,
    ]);
    pub const FULL: Plane = Plane([Bit::One; 8]);
    pub const ZERO: Plane = Plane([Bit::Zero; 8]);

    pub fn new(bits: [Bit; 8]) -> Self {
        Plane(bits)
    }

    pub fn from_mask(mask: u8) -> Self {
        let mut bits = [Bit::Zero; 8];
        for (i, b) in bits.iter_mut().enumerate() {
            *b = Bit::from(mask & (0x80 >> i) != 0);
        }
        Plane(bits)
    }

    /// Integer value of the plane, with unknown positions read as 0
    pub fn to_mask(&self) -> u8 {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_set())
            .fold(0u8, |m, (i, _)| m | (0x80 >> i))
    }

    pub fn bits(&self) -> &[Bit; 8] {
        &self.0
    }

    /// Bit by permission index (0 = EXIST ... 7 = ACL)
    pub fn bit(&self, bit_index: usize) -> Result<Bit> {
        Ok(self.0[string_index(bit_index)?])
    }

    /// Copy with one bit replaced, by permission index (0 = EXIST ... 7 = ACL)
    pub fn with_bit(&self, bit_index: usize, value: bool) -> Result<Plane> {
        let mut bits = self.0;
        bits[string_index(bit_index)?] = Bit::from(value);
        Ok(Plane(bits))
    }

    pub fn is_unknown(&self) -> bool {
        *self == Plane::UNKNOWN
    }
}

#[inline]
fn string_index(bit_index: usize) -> Result<usize> {
    if bit_index >= PLANE_WIDTH as usize {
        return Err(CalcError::InvalidBitWidth(format!("bit index {} out of 0..8", bit_index)));
    }
    Ok(PLANE_WIDTH as usize - 1 - bit_index)
}

impl Default for Plane {
    fn default() -> Self {
        Plane::UNKNOWN
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{}", b.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for Plane {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != PLANE_WIDTH as usize {
            return Err(CalcError::InvalidBitWidth(format!(
                "plane {:?} has {} characters, expected {}",
                s,
                chars.len(),
                PLANE_WIDTH
            )));
        }
        let mut bits = [Bit::Unknown; 8];
        for (b, c) in bits.iter_mut().zip(chars) {
            *b = Bit::from_char(c)?;
        }
        Ok(Plane(bits))
    }
}

impl TryFrom<String> for Plane {
    type Error = CalcError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Plane> for String {
    fn from(p: Plane) -> Self {
        p.to_string()
    }
}

/// Select the plane at `bit_shift` from a full stored permission
pub fn extract_plane(full: &BigUint, bit_shift: u32) -> Result<Plane> {
    check_shift(bit_shift)?;
    let shifted = full >> bit_shift as usize;
    let low = shifted.to_bytes_le().first().copied().unwrap_or(0);
    Ok(Plane::from_mask(low))
}

/// Replace the plane at `bit_shift`, leaving every other bit untouched
pub fn inject_plane(full: &BigUint, bit_shift: u32, plane: &Plane) -> Result<BigUint> {
    check_shift(bit_shift)?;
    let window = BigUint::from(0xFFu8) << bit_shift as usize;
    let cleared = full ^ (full & &window);
    Ok(cleared | (BigUint::from(plane.to_mask()) << bit_shift as usize))
}

/// Position-wise OR. Unknown is the zero element; a position stays unknown
/// only when every input is unknown there.
pub fn or_planes(planes: &[Plane]) -> Plane {
    let mut out = Plane::UNKNOWN;
    for p in planes {
        for (o, b) in out.0.iter_mut().zip(p.0.iter()) {
            *o = match (*o, *b) {
                (Bit::One, _) | (_, Bit::One) => Bit::One,
                (Bit::Zero, _) | (_, Bit::Zero) => Bit::Zero,
                (Bit::Unknown, Bit::Unknown) => Bit::Unknown,
            };
        }
    }
    out
}

pub fn extract_plane_str(full: &BigUint, bit_shift: u32) -> Result<String> {
    Ok(extract_plane(full, bit_shift)?.to_string())
}

pub fn inject_plane_str(full: &BigUint, bit_shift: u32, plane: &str) -> Result<BigUint> {
    inject_plane(full, bit_shift, &plane.parse()?)
}

pub fn or_plane_strs(planes: &[&str]) -> Result<String> {
    let parsed = planes.iter().map(|s| s.parse()).collect::<Result<Vec<Plane>>>()?;
    Ok(or_planes(&parsed).to_string())
}
