//! Protected surfaces and the decoy identities that cover them

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sensitive surface hidden behind a decoy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtectedSurface {
    /// Asset vault dashboard
    Vault,
    /// Private messaging
    Messaging,
}

impl ProtectedSurface {
    /// Stable name, also used as the storage scope
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vault => "vault",
            Self::Messaging => "messaging",
        }
    }

    /// Identity used when the config does not name one
    pub const fn default_identity(&self) -> DecoyIdentity {
        match self {
            Self::Vault => DecoyIdentity::NewsReader,
            Self::Messaging => DecoyIdentity::Notes,
        }
    }
}

impl fmt::Display for ProtectedSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtectedSurface {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "vault" => Ok(Self::Vault),
            "messaging" => Ok(Self::Messaging),
            other => Err(crate::Error::UnknownName(other.to_string())),
        }
    }
}

/// What a single activation of the secret trigger does on the cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverAction {
    /// Show today's date in the masthead
    ShowDate,
    /// Open the most recent note
    OpenLatestNote,
}

/// Slot-based word lists a decoy draws its content from.
///
/// A generated line takes one entry per slot and joins consecutive entries
/// with `joiners[i]`. Joiners carry no letters or digits.
#[derive(Debug, Clone, Copy)]
pub struct Vocabulary {
    /// Candidate entries per slot
    pub slots: &'static [&'static [&'static str]],
    /// Separators between slots, `slots.len() - 1` entries
    pub joiners: &'static [&'static str],
    /// Labels for numbered lines ("Edition 07") when every entry is unusable
    pub fallbacks: &'static [&'static str],
}

const NEWS_VOCABULARY: Vocabulary = Vocabulary {
    slots: &[
        &[
            "Regional", "Coastal", "Northern", "Municipal", "Overseas", "Rural", "Metro",
            "Provincial", "Southern", "Harbor district",
        ],
        &[
            "council", "markets", "rail operators", "planners", "growers", "libraries",
            "schools", "ferry services", "museums", "lawmakers",
        ],
        &[
            "weigh", "approve", "delay", "expand", "review", "unveil", "postpone", "debate",
            "revise", "extend",
        ],
        &[
            "transit budget", "harbor upgrade", "school calendar", "weather warnings",
            "library hours", "bridge repairs", "festival lineup", "recycling plan",
            "tourism figures", "parking rules", "energy tariffs", "water rates",
        ],
    ],
    joiners: &[" ", " ", " "],
    fallbacks: &["Edition", "Page", "Section", "Bulletin", "Digest"],
};

const NOTES_VOCABULARY: Vocabulary = Vocabulary {
    slots: &[
        &[
            "Groceries", "Errands", "Weekend", "Garden", "Packing", "Recipes", "Chores",
            "Books to borrow",
        ],
        &[
            "oats", "lemons", "basil", "batteries", "stamps", "rice", "tomatoes", "soap",
            "candles", "yogurt",
        ],
        &[
            "flour", "parsley", "envelopes", "olive oil", "light bulbs", "pears", "coffee",
            "sponges", "honey", "tape",
        ],
        &[
            "seeds", "napkins", "vinegar", "string", "mint", "peppers", "crackers",
            "detergent", "cinnamon", "twine",
        ],
    ],
    joiners: &[": ", ", ", " & "],
    fallbacks: &["Note", "Draft", "List", "Memo", "Scratch"],
};

/// Innocuous application a protected surface impersonates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoyIdentity {
    /// A news reader showing headlines
    NewsReader,
    /// A plain notes app
    Notes,
}

impl DecoyIdentity {
    /// Stable name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NewsReader => "news_reader",
            Self::Notes => "notes",
        }
    }

    /// Page title shown in tabs and task switchers
    pub const fn cover_title(&self) -> &'static str {
        match self {
            Self::NewsReader => "Daily Brief",
            Self::Notes => "Notes",
        }
    }

    /// Behaviour of a single activation on the trigger element
    pub const fn cover_action(&self) -> CoverAction {
        match self {
            Self::NewsReader => CoverAction::ShowDate,
            Self::Notes => CoverAction::OpenLatestNote,
        }
    }

    /// Element whose double activation requests the passcode
    pub const fn trigger_element(&self) -> &'static str {
        match self {
            Self::NewsReader => "masthead-date",
            Self::Notes => "notes-header",
        }
    }

    /// Words the decoy content is built from
    pub const fn vocabulary(&self) -> &'static Vocabulary {
        match self {
            Self::NewsReader => &NEWS_VOCABULARY,
            Self::Notes => &NOTES_VOCABULARY,
        }
    }

    /// Masthead line for the news reader's date cover action
    pub fn date_line(&self, date: NaiveDate) -> String {
        date.format("%A, %B %-d, %Y").to_string()
    }
}

impl fmt::Display for DecoyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
