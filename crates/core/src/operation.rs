//! Operation registry: the closed set of text transforms.
//!
//! Every operation is a pure, total function over `&str`. Dispatch is an
//! exhaustive `match` over [`Operation`], so adding a transform forces every
//! call site to handle it at compile time.
//!
//! Re-executing an operation on redelivery is only safe because all of them
//! are pure. Any new variant must keep that property.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A text transform a worker can apply to task data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Reverse,
    CountWords,
    CountLetters,
    Uppercase,
    Lowercase,
}

impl Operation {
    /// Every supported operation, in declaration order.
    pub const ALL: [Operation; 5] = [
        Operation::Reverse,
        Operation::CountWords,
        Operation::CountLetters,
        Operation::Uppercase,
        Operation::Lowercase,
    ];

    /// Wire name used in task descriptors and submission requests.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Reverse => "reverse",
            Operation::CountWords => "count_words",
            Operation::CountLetters => "count_letters",
            Operation::Uppercase => "uppercase",
            Operation::Lowercase => "lowercase",
        }
    }

    /// Case-insensitive lookup. Returns `None` for unknown names.
    pub fn parse_lenient(name: &str) -> Option<Operation> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(name))
    }

    /// Apply the transform to `data`.
    pub fn apply(self, data: &str) -> String {
        match self {
            Operation::Reverse => data.chars().rev().collect(),
            Operation::CountWords => words(data).count().to_string(),
            Operation::CountLetters => words(data)
                .map(|token| token.chars().count())
                .sum::<usize>()
                .to_string(),
            Operation::Uppercase => data.to_uppercase(),
            Operation::Lowercase => data.to_lowercase(),
        }
    }
}

/// Word separators: Unicode whitespace plus the ASCII information
/// separators `\x1c`..=`\x1f`, which task producers treat as blanks too.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

fn words(data: &str) -> impl Iterator<Item = &str> {
    data.split(is_separator).filter(|token| !token.is_empty())
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = CoreError;

    /// Strict parse of the exact wire name (used at submission time).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown operation '{s}'")))
    }
}

/// Run the operation named `name` on `data`.
///
/// Names match case-insensitively. Unknown names yield an empty string so a
/// single malformed message can never take down the worker loop.
pub fn do_op(name: &str, data: &str) -> String {
    match Operation::parse_lenient(name) {
        Some(op) => op.apply(data),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
