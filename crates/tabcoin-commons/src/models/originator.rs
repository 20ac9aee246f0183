use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::{EventId, OperationId, UserId};

/// The cause attributed to a balance operation.
///
/// Stored as the flat pair `originator_type` / `originator_id` on the row.
/// The reference is polymorphic by design (no cross-table foreign key): an
/// event, a user acting directly, or a prior operation being compensated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "originator_type", content = "originator_id", rename_all = "lowercase")]
pub enum Originator {
    /// A platform event (vote, publish, reward issuance).
    Event(EventId),
    /// A user acting directly (moderation adjustments).
    User(UserId),
    /// A compensating entry reversing the referenced operation.
    Undo(OperationId),
}

impl Originator {
    pub fn type_tag(&self) -> OriginatorType {
        match self {
            Originator::Event(_) => OriginatorType::Event,
            Originator::User(_) => OriginatorType::User,
            Originator::Undo(_) => OriginatorType::Undo,
        }
    }

    /// The raw id component, used for the by-originator index key.
    pub fn id(&self) -> i64 {
        match self {
            Originator::Event(id) => id.as_i64(),
            Originator::User(id) => id.as_i64(),
            Originator::Undo(id) => id.as_i64(),
        }
    }
}

impl fmt::Display for Originator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_tag().as_str(), self.id())
    }
}

/// Tag component of an [`Originator`], without its id payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginatorType {
    Event,
    User,
    Undo,
}

impl OriginatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginatorType::Event => "event",
            OriginatorType::User => "user",
            OriginatorType::Undo => "undo",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "event" => Some(OriginatorType::Event),
            "user" => Some(OriginatorType::User),
            "undo" => Some(OriginatorType::Undo),
            _ => None,
        }
    }
}

impl FromStr for OriginatorType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OriginatorType::from_str_opt(s).ok_or_else(|| format!("Invalid OriginatorType: {}", s))
    }
}

impl fmt::Display for OriginatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
