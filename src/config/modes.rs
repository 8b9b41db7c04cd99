//! Site family definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported site families. Both expose the same API shape and differ only
/// in base URL and hosted services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    /// Patreon, Fanbox, Fantia and friends.
    #[default]
    Kemono,
    /// OnlyFans, Fansly and CandFans.
    Coomer,
}

impl Site {
    /// Services hosted by this site family.
    pub fn services(&self) -> &'static [&'static str] {
        match self {
            Site::Kemono => &[
                "patreon",
                "fanbox",
                "fantia",
                "afdian",
                "boosty",
                "discord",
                "dlsite",
                "gumroad",
                "subscribestar",
            ],
            Site::Coomer => &["onlyfans", "fansly", "candfans"],
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Kemono => write!(f, "kemono"),
            Site::Coomer => write!(f, "coomer"),
        }
    }
}

impl FromStr for Site {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        let host = lowered
            .trim_start_matches("https://")
            .trim_start_matches("http://");

        if host.starts_with("kemono") {
            Ok(Site::Kemono)
        } else if host.starts_with("coomer") {
            Ok(Site::Coomer)
        } else {
            Err(format!("Unknown site: {} (use 'kemono' or 'coomer')", s))
        }
    }
}
