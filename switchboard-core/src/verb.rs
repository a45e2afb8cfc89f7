//! The message method discriminator.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// The method of a message, orthogonal to the transport carrying it.
///
/// Both router sides key their dispatch tables on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Verb {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Replace.
    Put,
    /// Partial update.
    Patch,
    /// Remove.
    Delete,
    /// Out-of-band control traffic.
    Meta,
}

impl Verb {
    /// Every verb, in table order.
    pub const ALL: [Verb; 6] = [
        Verb::Get,
        Verb::Post,
        Verb::Put,
        Verb::Patch,
        Verb::Delete,
        Verb::Meta,
    ];

    /// The upper-case wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Meta => "META",
        }
    }

    /// Position of this verb in [`Verb::ALL`].
    ///
    /// Route tables use it to index a fixed-size array instead of hashing.
    pub const fn index(self) -> usize {
        match self {
            Verb::Get => 0,
            Verb::Post => 1,
            Verb::Put => 2,
            Verb::Patch => 3,
            Verb::Delete => 4,
            Verb::Meta => 5,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when text does not name a [`Verb`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown verb: {0}")]
pub struct VerbParseError(pub String);

impl FromStr for Verb {
    type Err = VerbParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| VerbParseError(s.to_owned()))
    }
}

impl TryFrom<String> for Verb {
    type Error = VerbParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
