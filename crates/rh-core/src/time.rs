//! Hierarchical time attributes derived from a year
//!
//! The time dimension is keyed by year; decade and century are pure functions
//! of it. Years outside the configured window keep their own value but carry
//! no derived attributes.

use serde::{Deserialize, Serialize};

/// Inclusive range of years the warehouse treats as valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    pub min: i32,
    pub max: i32,
}

impl YearWindow {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, year: i64) -> bool {
        year >= i64::from(self.min) && year <= i64::from(self.max)
    }

    /// Every year of the window, ascending
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.min..=self.max
    }
}

impl Default for YearWindow {
    fn default() -> Self {
        Self {
            min: 1874,
            max: 2040,
        }
    }
}

/// A year and the attributes derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAttributes {
    pub year: i64,
    pub decade: Option<i64>,
    pub century: Option<i64>,
}

impl TimeAttributes {
    /// Derive decade and century; both are absent outside `window`.
    pub fn derive(year: i64, window: YearWindow) -> Self {
        if window.contains(year) {
            Self {
                year,
                decade: Some(decade_of(year)),
                century: Some(century_of(year)),
            }
        } else {
            Self {
                year,
                decade: None,
                century: None,
            }
        }
    }
}

/// First year of the decade: 1994 → 1990
pub fn decade_of(year: i64) -> i64 {
    year - year.rem_euclid(10)
}

/// Century number as `year / 100 + 1`: 1994 → 20, 2000 → 21
pub fn century_of(year: i64) -> i64 {
    year.div_euclid(100) + 1
}

#[cfg(test)]
#[path = "time_test.rs"]
mod tests;
