//! Level-by-level editor for a single stored permission
//!
//! Shows one policy's full permission as a zero-padded binary string, split
//! into one plane per hierarchy level (root-most plane first).

use num_bigint::BigUint;
use num_traits::Zero;

use crate::constants::PLANE_WIDTH;
use crate::error::{CalcError, Result};
use crate::model::TargetKind;
use crate::plane::Plane;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelEditor {
    kind: TargetKind,
    original: BigUint,
    value: BigUint,
    level_count: usize,
}

impl LevelEditor {
    pub fn new(kind: TargetKind, permission: BigUint) -> Self {
        let level_count = level_count_for(kind, &permission);
        LevelEditor { kind, original: permission.clone(), value: permission, level_count }
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn decimal(&self) -> &BigUint {
        &self.value
    }

    pub fn level_count(&self) -> usize {
        self.level_count
    }

    /// Binary digits padded to `level_count * 8`
    pub fn binary(&self) -> String {
        let width = self.level_count * PLANE_WIDTH as usize;
        let digits = if self.value.is_zero() { String::new() } else { self.value.to_str_radix(2) };
        format!("{:0>width$}", digits, width = width)
    }

    /// One plane per level, root-most first
    pub fn levels(&self) -> Vec<Plane> {
        let bytes = self.value.to_bytes_be();
        let mut out = vec![Plane::ZERO; self.level_count.saturating_sub(bytes.len())];
        let skip = bytes.len().saturating_sub(self.level_count);
        out.extend(bytes[skip..].iter().map(|b| Plane::from_mask(*b)));
        out
    }

    /// Flip one digit of [`binary`](Self::binary), counted from the left
    pub fn toggle(&mut self, string_index: usize) -> Result<()> {
        let width = self.level_count * PLANE_WIDTH as usize;
        if string_index >= width {
            return Err(CalcError::InvalidBitWidth(format!(
                "index {} outside {} binary digits",
                string_index, width
            )));
        }
        let bit = (width - 1 - string_index) as u64;
        let flipped = !self.value.bit(bit);
        self.value.set_bit(bit, flipped);
        Ok(())
    }

    /// Replace the whole value, growing the level count if it no longer fits
    pub fn set_decimal(&mut self, value: BigUint) {
        self.level_count = self.level_count.max(level_count_for(self.kind, &value));
        self.value = value;
    }

    pub fn reset(&mut self) {
        self.value = self.original.clone();
        self.level_count = level_count_for(self.kind, &self.value);
    }

    pub fn is_edited(&self) -> bool {
        self.value != self.original
    }
}

fn level_count_for(kind: TargetKind, value: &BigUint) -> usize {
    let needed = (value.bits() as usize).div_ceil(PLANE_WIDTH as usize);
    needed.max(kind.level_count().unwrap_or(1) as usize).max(1)
}
