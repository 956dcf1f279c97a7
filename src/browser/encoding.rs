//! Closed registry of term decoding schemes.
//!
//! The backend stores raw term bytes; the encoding tells it how to turn them
//! into a displayable string. Selecting an encoding in the browser is only a
//! request: the backend may reject it for a field (see `browser::update`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TermscopeError};

/// Decoding scheme applied by the backend to a field's raw term bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// UTF-8 text. Every browser mounts with this encoding.
    #[default]
    Utf8,
    /// Base64 of the raw bytes.
    Base64,
    /// Raw bytes rendered as hex.
    Binary,
    /// Sortable 32-bit integer.
    Int,
    /// Sortable 64-bit integer.
    Long,
    /// Sortable 32-bit float.
    Float,
    /// Sortable 64-bit float.
    Double,
}

/// Registry order, as offered to the user.
pub const ALL_ENCODINGS: [Encoding; 7] = [
    Encoding::Utf8,
    Encoding::Base64,
    Encoding::Binary,
    Encoding::Int,
    Encoding::Long,
    Encoding::Float,
    Encoding::Double,
];

impl Encoding {
    /// Wire tag used in the `encoding` query parameter.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Base64 => "base64",
            Self::Binary => "binary",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Human-readable label for selectors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8 text",
            Self::Base64 => "Base64 bytes",
            Self::Binary => "Raw bytes (hex)",
            Self::Int => "32-bit integer",
            Self::Long => "64-bit integer",
            Self::Float => "32-bit float",
            Self::Double => "64-bit float",
        }
    }

    /// All encodings in registry order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &ALL_ENCODINGS
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Encoding {
    type Err = TermscopeError;

    fn from_str(raw: &str) -> Result<Self> {
        let wanted = raw.trim();
        ALL_ENCODINGS
            .iter()
            .copied()
            .find(|e| e.tag().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TermscopeError::InvalidConfig {
                details: format!(
                    "unknown encoding {raw:?} (expected one of: {})",
                    ALL_ENCODINGS.map(Encoding::tag).join(", ")
                ),
            })
    }
}
