//! Hex and name-set conversions shared by every bitflags type in the crate
//! (face types, node flags, node types, key flags).

use std::collections::BTreeSet;

use bitflags::Flags;

use crate::error::{Result, SithError};

pub trait FlagsExt: Flags<Bits = u32> + Copy {
    /// Formats the raw bits as `0x` followed by lowercase hex digits.
    fn to_hex(&self) -> String {
        format!("{:#x}", self.bits())
    }

    /// Parses a hex string with or without the `0x` prefix. An empty string is
    /// zero, and bits without a named flag are retained.
    fn from_hex(value: &str) -> Result<Self> {
        let digits = value.trim();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        if digits.is_empty() {
            return Ok(Self::from_bits_retain(0));
        }
        let bits = u32::from_str_radix(digits, 16).map_err(|e| {
            SithError::invalid_format("flags", format!("'{}' is not a hex value: {}", value, e))
        })?;
        Ok(Self::from_bits_retain(bits))
    }

    fn to_name_set(&self) -> BTreeSet<String> {
        self.iter_names().map(|(name, _)| name.to_string()).collect()
    }

    /// Unknown names are ignored.
    fn from_name_set<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let bits = names
            .into_iter()
            .filter_map(|name| Self::from_name(name.as_ref()))
            .fold(0u32, |acc, flag| acc | flag.bits());
        Self::from_bits_retain(bits)
    }
}

impl<T: Flags<Bits = u32> + Copy> FlagsExt for T {}
