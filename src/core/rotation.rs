//! Fixed rotation of short-code sets used for rigged rounds

use std::collections::HashSet;
use thiserror::Error;

use crate::models::Language;

/// Built-in rotation, one row per round slot
const DEFAULT_ROTATION: [[&str; 15]; 4] = [
    [
        "H1", "H2", "H3", "H4", "H5", "B1", "B2", "B3", "B4", "B5", "E1", "E2", "E3", "E4", "E5",
    ],
    [
        "H2", "H3", "H4", "H5", "H6", "B2", "B3", "B4", "B5", "B6", "E2", "E3", "E4", "E5", "E6",
    ],
    [
        "H3", "H4", "H5", "H6", "H1", "B1", "B3", "B4", "B5", "B6", "E1", "E3", "E4", "E5", "E6",
    ],
    [
        "H1", "H2", "H4", "H6", "H5", "B1", "B2", "B4", "B5", "B6", "E1", "E2", "E4", "E5", "E6",
    ],
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RotationError {
    #[error("rotation table has no slots")]
    Empty,

    #[error("rotation slot {0} is empty")]
    EmptySlot(usize),

    #[error("rotation slot {slot} lists {code} more than once")]
    DuplicateCode { slot: usize, code: String },

    #[error("rotation slot {slot} has malformed short code '{code}'")]
    InvalidCode { slot: usize, code: String },
}

/// Validated, immutable list of round slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationTable {
    slots: Vec<Vec<String>>,
}

impl RotationTable {
    /// Validate and build a table. Codes are trimmed and upper-cased.
    pub fn new(slots: Vec<Vec<String>>) -> Result<Self, RotationError> {
        if slots.is_empty() {
            return Err(RotationError::Empty);
        }

        let mut validated = Vec::with_capacity(slots.len());
        for (index, slot) in slots.into_iter().enumerate() {
            if slot.is_empty() {
                return Err(RotationError::EmptySlot(index));
            }

            let mut seen = HashSet::with_capacity(slot.len());
            let mut codes = Vec::with_capacity(slot.len());
            for raw in slot {
                let code = raw.trim().to_uppercase();
                if !is_short_code(&code) {
                    return Err(RotationError::InvalidCode { slot: index, code });
                }
                if !seen.insert(code.clone()) {
                    return Err(RotationError::DuplicateCode { slot: index, code });
                }
                codes.push(code);
            }
            validated.push(codes);
        }

        Ok(Self { slots: validated })
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Slot index for a stored cursor. Out-of-range and negative cursors wrap.
    pub fn slot_index(&self, cursor: i64) -> usize {
        cursor.rem_euclid(self.slots.len() as i64) as usize
    }

    /// Codes active in the slot the cursor points at
    pub fn slot(&self, cursor: i64) -> &[String] {
        &self.slots[self.slot_index(cursor)]
    }

    /// Cursor value after advancing past `cursor`
    pub fn next_cursor(&self, cursor: i64) -> i64 {
        ((self.slot_index(cursor) + 1) % self.slots.len()) as i64
    }

    pub fn slots(&self) -> &[Vec<String>] {
        &self.slots
    }
}

impl Default for RotationTable {
    fn default() -> Self {
        Self {
            slots: DEFAULT_ROTATION
                .iter()
                .map(|slot| slot.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }
}

/// Language initial followed by a positive ordinal, e.g. "H1", "B10"
fn is_short_code(code: &str) -> bool {
    let mut chars = code.chars();
    let Some(initial) = chars.next() else {
        return false;
    };
    let ordinal = chars.as_str();

    Language::from_initial(initial).is_some()
        && !ordinal.is_empty()
        && !ordinal.starts_with('0')
        && ordinal.chars().all(|c| c.is_ascii_digit())
}
