//! Child-collection selection bitmask

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Which child collections of a place are exported.
///
/// A cleared bit means that kind never reaches the relational side. For
/// connections and target URIs it also means no pending links are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChildFlags(u32);

impl ChildFlags {
    pub const NONE: ChildFlags = ChildFlags(0);
    pub const FEATURES: ChildFlags = ChildFlags(0x001);
    pub const CREATORS: ChildFlags = ChildFlags(0x002);
    pub const CONTRIBUTORS: ChildFlags = ChildFlags(0x004);
    pub const LOCATIONS: ChildFlags = ChildFlags(0x008);
    pub const CONNECTIONS: ChildFlags = ChildFlags(0x010);
    pub const ATTESTATIONS: ChildFlags = ChildFlags(0x020);
    pub const REFERENCES: ChildFlags = ChildFlags(0x040);
    pub const NAMES: ChildFlags = ChildFlags(0x080);
    pub const METADATA: ChildFlags = ChildFlags(0x100);
    pub const TARGET_URIS: ChildFlags = ChildFlags(0x200);
    pub const ALL: ChildFlags = ChildFlags(0x3FF);

    /// Letter codes, in bit order.
    const LETTERS: [(char, ChildFlags); 10] = [
        ('F', Self::FEATURES),
        ('C', Self::CREATORS),
        ('O', Self::CONTRIBUTORS),
        ('L', Self::LOCATIONS),
        ('E', Self::CONNECTIONS),
        ('A', Self::ATTESTATIONS),
        ('R', Self::REFERENCES),
        ('N', Self::NAMES),
        ('M', Self::METADATA),
        ('T', Self::TARGET_URIS),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        ChildFlags(bits & Self::ALL.0)
    }

    pub const fn contains(self, other: ChildFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: ChildFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ChildFlags) {
        self.0 &= !other.0;
    }

    /// Parse letter codes such as `"LNE"`. `0` clears everything selected
    /// so far; unknown letters are ignored. Case-insensitive.
    pub fn from_letters(letters: &str) -> Self {
        let mut flags = Self::NONE;
        for c in letters.chars() {
            if c == '0' {
                flags = Self::NONE;
                continue;
            }
            let c = c.to_ascii_uppercase();
            if let Some((_, flag)) = Self::LETTERS.iter().find(|(l, _)| *l == c) {
                flags.insert(*flag);
            }
        }
        flags
    }

    pub fn to_letters(self) -> String {
        Self::LETTERS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(l, _)| *l)
            .collect()
    }
}

impl Default for ChildFlags {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for ChildFlags {
    type Output = ChildFlags;

    fn bitor(self, rhs: ChildFlags) -> ChildFlags {
        ChildFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChildFlags {
    fn bitor_assign(&mut self, rhs: ChildFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ChildFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("0")
        } else {
            f.write_str(&self.to_letters())
        }
    }
}
