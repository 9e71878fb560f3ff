use std::str::FromStr;

use thiserror::Error;

/// Failure to parse an `<address>,<size>` window descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The text does not have the `<address>,<size>` shape, or a field is
    /// not a valid decimal or `0x`-hex unsigned 64-bit integer.
    #[error("malformed window descriptor {input:?}: expected <address>,<size> with decimal or 0x-hex fields")]
    Malformed { input: String },
}

/// Base physical address and byte length of the shared window.
///
/// A descriptor is plain data. It can be parsed, copied, and carried around
/// freely; it only becomes authoritative once accepted by
/// [`RegionRegistry::install`](crate::RegionRegistry::install), which is
/// where the non-zero and page-alignment rules live. The parser only cares
/// about syntax, so the two concerns stay independently testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct RegionDescriptor {
    /// Physical address of the first byte of the window.
    pub base: u64,
    /// Window length in bytes.
    pub size: u64,
}

impl FromStr for RegionDescriptor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::Malformed { input: s.to_owned() };
        let (base, size) = s.split_once(',').ok_or_else(malformed)?;
        let base = parse_field(base).ok_or_else(malformed)?;
        let size = parse_field(size).ok_or_else(malformed)?;
        Ok(Self { base, size })
    }
}

// Strict unsigned grammar: no sign, no interior whitespace, no trailing
// garbage. `u64::from_str_radix` alone would accept a leading `+`.
fn parse_field(field: &str) -> Option<u64> {
    if let Some(hex) = field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(hex, 16).ok()
    } else {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        field.parse().ok()
    }
}
