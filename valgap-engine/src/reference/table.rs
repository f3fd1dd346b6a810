//! Cascading cross-sectional reference lookup.
//!
//! Reference rows are keyed by classification level and code. A lookup walks
//! the levels from most to least specific and stops at the first hit.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Classification;

/// Classification tier that satisfied a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLevel {
    SubSector,
    Sector,
    SuperSector,
    Industry,
    /// No tier matched; the fixed default was used
    Default,
}

impl MatchLevel {
    /// Lookup order, most specific first.
    pub const CASCADE: [MatchLevel; 4] = [
        Self::SubSector,
        Self::Sector,
        Self::SuperSector,
        Self::Industry,
    ];

    /// The classification code for this level, if present and non-blank.
    pub fn code_of<'a>(&self, classification: &'a Classification) -> Option<&'a str> {
        let code = match self {
            Self::SubSector => classification.sub_sector.as_deref(),
            Self::Sector => classification.sector.as_deref(),
            Self::SuperSector => classification.super_sector.as_deref(),
            Self::Industry => classification.industry.as_deref(),
            Self::Default => None,
        }?;
        let code = code.trim();
        if code.is_empty() {
            None
        } else {
            Some(code)
        }
    }
}

impl std::fmt::Display for MatchLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubSector => write!(f, "sub-sector"),
            Self::Sector => write!(f, "sector"),
            Self::SuperSector => write!(f, "super-sector"),
            Self::Industry => write!(f, "industry"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// One row of a reference table as stored in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceEntry<T> {
    pub level: MatchLevel,
    pub code: String,
    #[serde(flatten)]
    pub value: T,
}

/// Reference table resolved through the classification cascade.
#[derive(Debug, Clone)]
pub struct ReferenceTable<T> {
    rows: HashMap<(MatchLevel, String), T>,
}

impl<T> Default for ReferenceTable<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

impl<T> ReferenceTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row. Codes match case-insensitively.
    pub fn insert(&mut self, level: MatchLevel, code: &str, value: T) {
        self.rows.insert((level, normalize_code(code)), value);
    }

    /// Builder-style insert.
    pub fn with(mut self, level: MatchLevel, code: &str, value: T) -> Self {
        self.insert(level, code, value);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact match at one level.
    pub fn get(&self, level: MatchLevel, code: &str) -> Option<&T> {
        self.rows.get(&(level, normalize_code(code)))
    }

    /// Walk the cascade and return the first hit with the level that matched.
    pub fn resolve(&self, classification: &Classification) -> Option<(MatchLevel, &T)> {
        MatchLevel::CASCADE.iter().find_map(|level| {
            level
                .code_of(classification)
                .and_then(|code| self.get(*level, code))
                .map(|value| (*level, value))
        })
    }
}

impl<T> FromIterator<ReferenceEntry<T>> for ReferenceTable<T> {
    fn from_iter<I: IntoIterator<Item = ReferenceEntry<T>>>(iter: I) -> Self {
        let mut table = Self::new();
        for entry in iter {
            table.insert(entry.level, &entry.code, entry.value);
        }
        table
    }
}
