//! Telephone number normalization
//!
//! Splits arbitrary NANP-style input (`2163734606`, `12163734606`,
//! `+12163734606`, or a bare NPANXX such as `216401`) into the canonical
//! last-ten-digit form, its NPANXX and NPANXXX block keys, and the dialing
//! prefix that has to be put back on routing numbers returned to the caller.
//!
//! Normalization is total: format validation happens before input reaches
//! this crate, so malformed input simply yields shorter keys that miss in
//! the reference tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of significant digits in a canonical telephone number
pub const TEN_DIGIT_LEN: usize = 10;

/// Length of the NPANXX (area code + exchange)
pub const NPANXX_LEN: usize = 6;

/// Length of the NPANXXX thousand-block key
pub const NPANXXX_LEN: usize = 7;

/// Length of the NPA (area code)
pub const NPA_LEN: usize = 3;

/// Dialing prefix found ahead of the significant ten digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TnPrefix {
    /// No prefix (ten digits or shorter)
    #[default]
    None,
    /// Long-distance `1`
    One,
    /// E.164 `+1`
    PlusOne,
}

impl TnPrefix {
    /// Classify the characters that precede the last ten digits.
    ///
    /// Anything other than `1` or `+1` is dropped rather than echoed back.
    pub fn from_head(head: &str) -> Self {
        match head {
            "1" => TnPrefix::One,
            "+1" => TnPrefix::PlusOne,
            _ => TnPrefix::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TnPrefix::None => "",
            TnPrefix::One => "1",
            TnPrefix::PlusOne => "+1",
        }
    }

    /// Put the prefix back onto a routing number.
    ///
    /// Empty routing numbers stay empty so a miss is never reported as `"1"`.
    pub fn restore(&self, number: &str) -> String {
        if number.is_empty() {
            return String::new();
        }
        format!("{}{}", self.as_str(), number)
    }
}

impl fmt::Display for TnPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical forms of one telephone number input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedNumber {
    /// The input exactly as received
    pub original: String,

    /// Last ten characters of the input (the whole input when shorter)
    pub ten_digit: String,

    /// Dialing prefix that preceded the ten digits
    pub prefix: TnPrefix,
}

impl NormalizedNumber {
    /// Normalize a telephone number, NPANXX or E.164 string
    pub fn parse(input: &str) -> Self {
        let split = split_point(input, TEN_DIGIT_LEN);
        let (head, tail) = input.split_at(split);

        Self {
            original: input.to_string(),
            ten_digit: tail.to_string(),
            prefix: TnPrefix::from_head(head),
        }
    }

    /// First six digits of the canonical form
    pub fn npanxx(&self) -> &str {
        leading(&self.ten_digit, NPANXX_LEN)
    }

    /// First seven digits of the canonical form (thousand-block key)
    pub fn npanxxx(&self) -> &str {
        leading(&self.ten_digit, NPANXXX_LEN)
    }

    /// Area code used to pick the portability shard
    pub fn npa(&self) -> &str {
        leading(&self.ten_digit, NPA_LEN)
    }
}

/// Extract the last ten digits of a phone number
pub fn ten_digit(tn: &str) -> &str {
    &tn[split_point(tn, TEN_DIGIT_LEN)..]
}

/// Extract the NPANXX (first 6 of the last 10 digits) from a phone number
pub fn npanxx(tn: &str) -> &str {
    leading(ten_digit(tn), NPANXX_LEN)
}

/// Byte offset where the trailing `keep` characters begin.
fn split_point(input: &str, keep: usize) -> usize {
    input
        .char_indices()
        .rev()
        .nth(keep.saturating_sub(1))
        .map_or(0, |(idx, _)| idx)
}

/// Leading `n` characters of `s`, or all of it when shorter.
fn leading(s: &str, n: usize) -> &str {
    s.char_indices().nth(n).map_or(s, |(idx, _)| &s[..idx])
}
