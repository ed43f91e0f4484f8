//! Case handling for dentry names.
//!
//! NTFS compares names through an upcase table; we approximate it with
//! Unicode simple uppercasing over the BMP, applied code unit by code
//! unit. Whether lookups ignore case by default is a process-wide datum
//! fixed at library initialisation.

use std::sync::OnceLock;

/// Per-call case sensitivity selector.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    /// Compare names code unit by code unit.
    Sensitive,
    /// Compare names through the upcase mapping.
    Insensitive,
    /// Use the process-wide default (set at init, otherwise the platform
    /// convention: insensitive on Windows, sensitive elsewhere).
    #[default]
    PlatformDefault,
}

static DEFAULT_IGNORE_CASE: OnceLock<bool> = OnceLock::new();

/// Fix the process-wide default case policy. Effective only for the first
/// caller; later calls (and lookups racing the first) see the published
/// value. Returns the value in effect.
pub fn init_default_ignore_case(ignore_case: bool) -> bool {
    *DEFAULT_IGNORE_CASE.get_or_init(|| ignore_case)
}

/// The process-wide default: `true` when name lookups ignore case.
pub fn default_ignore_case() -> bool {
    *DEFAULT_IGNORE_CASE.get_or_init(|| cfg!(windows))
}

impl CaseSensitivity {
    /// Resolve to a concrete "ignore case" flag.
    pub fn ignores_case(self) -> bool {
        match self {
            CaseSensitivity::Sensitive => false,
            CaseSensitivity::Insensitive => true,
            CaseSensitivity::PlatformDefault => default_ignore_case(),
        }
    }
}

/// Upcase one UTF-16 code unit. Mappings out of the BMP or expanding to
/// multiple characters are identity, as are unpaired surrogates.
pub fn upcase_unit(unit: u16) -> u16 {
    let Some(c) = char::from_u32(u32::from(unit)) else {
        return unit;
    };
    let mut upper = c.to_uppercase();
    let first = upper.next().unwrap_or(c);
    if upper.next().is_none() && (first as u32) < 0x10000 {
        first as u16
    } else {
        unit
    }
}

/// Upcased copy of a UTF-16 name, used as the case-insensitive index key.
pub fn upcase_name(name: &[u16]) -> Vec<u16> {
    name.iter().map(|&u| upcase_unit(u)).collect()
}

/// Case-insensitive name equality.
pub fn names_equal_ci(a: &[u16], b: &[u16]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(&x, &y)| upcase_unit(x) == upcase_unit(y))
}
