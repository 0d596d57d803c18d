//! The closed set of supported languages.

use core::fmt;
use core::str::FromStr;

use crate::errors::{PoliglottaError, Result};

/// A supported language.
///
/// The set is closed: every trained model, classifier, and boundary detector
/// works over exactly these languages, in the order given by [`Lang::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lang {
    English,
    French,
    Italian,
    German,
    Spanish,
    Portuguese,
}

impl Lang {
    /// All supported languages in canonical order.
    pub const ALL: [Self; 6] = [
        Self::English,
        Self::French,
        Self::Italian,
        Self::German,
        Self::Spanish,
        Self::Portuguese,
    ];

    /// Two-letter code used in resource file names.
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::French => "fr",
            Self::Italian => "it",
            Self::German => "de",
            Self::Spanish => "es",
            Self::Portuguese => "pt",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = PoliglottaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "en" => Ok(Self::English),
            "fr" => Ok(Self::French),
            "it" => Ok(Self::Italian),
            "de" => Ok(Self::German),
            "es" => Ok(Self::Spanish),
            "pt" => Ok(Self::Portuguese),
            _ => Err(PoliglottaError::invalid_argument(
                "s",
                format!("unsupported language code: {s}"),
            )),
        }
    }
}
