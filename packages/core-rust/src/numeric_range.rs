//! Index-range syntax for addressing a sub-range of an array value.
//!
//! The textual form is one or more comma-separated dimensions, each either a
//! single index (`"3"`) or an inclusive range (`"2:5"`, low strictly below high).
//! An empty string means "the whole value".

use crate::data_value::Variant;
use crate::status::StatusCode;

/// One dimension of a parsed index range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Index(u32),
    Range(u32, u32),
}

impl Dimension {
    fn bounds(self) -> (usize, usize) {
        match self {
            Dimension::Index(i) => (i as usize, i as usize),
            Dimension::Range(lo, hi) => (lo as usize, hi as usize),
        }
    }
}

/// A parsed index range.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NumericRange {
    pub dimensions: Vec<Dimension>,
}

impl NumericRange {
    /// Parses the textual form. Empty text yields an empty (whole value) range.
    ///
    /// # Errors
    ///
    /// Returns `BadIndexRangeInvalid` for malformed text, including ranges whose
    /// low bound is not strictly below the high bound.
    pub fn parse(text: &str) -> Result<Self, StatusCode> {
        if text.is_empty() {
            return Ok(Self::default());
        }
        let dimensions = text
            .split(',')
            .map(parse_dimension)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { dimensions })
    }

    #[must_use]
    pub fn is_whole(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Applies the range to a value.
    ///
    /// Only the first dimension is honored; multi-dimensional ranges on
    /// one-dimensional arrays are rejected.
    ///
    /// # Errors
    ///
    /// - `BadIndexRangeInvalid` when the value is not an array, or more than one
    ///   dimension is given.
    /// - `BadIndexRangeNoData` when the range starts past the end of the array.
    pub fn apply(&self, value: &Variant) -> Result<Variant, StatusCode> {
        let Some(&first) = self.dimensions.first() else {
            return Ok(value.clone());
        };
        if self.dimensions.len() > 1 {
            return Err(StatusCode::BadIndexRangeInvalid);
        }
        match value {
            Variant::Array(items) => {
                let (lo, hi) = first.bounds();
                if lo >= items.len() {
                    return Err(StatusCode::BadIndexRangeNoData);
                }
                let hi = hi.min(items.len() - 1);
                Ok(Variant::Array(items[lo..=hi].to_vec()))
            }
            Variant::String(s) => {
                let (lo, hi) = first.bounds();
                let chars: Vec<char> = s.chars().collect();
                if lo >= chars.len() {
                    return Err(StatusCode::BadIndexRangeNoData);
                }
                let hi = hi.min(chars.len() - 1);
                Ok(Variant::String(chars[lo..=hi].iter().collect()))
            }
            _ => Err(StatusCode::BadIndexRangeInvalid),
        }
    }
}

fn parse_dimension(text: &str) -> Result<Dimension, StatusCode> {
    let index = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| StatusCode::BadIndexRangeInvalid)
    };
    match text.split_once(':') {
        None => Ok(Dimension::Index(index(text)?)),
        Some((lo, hi)) => {
            let (lo, hi) = (index(lo)?, index(hi)?);
            if lo >= hi {
                return Err(StatusCode::BadIndexRangeInvalid);
            }
            Ok(Dimension::Range(lo, hi))
        }
    }
}
