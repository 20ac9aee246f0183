//! Content entity: the ranked unit the ledger scores.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{ContentId, UserId};

/// Publication status of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Published,
    Deleted,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Deleted => "deleted",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ContentStatus::Draft),
            "published" => Some(ContentStatus::Published),
            "deleted" => Some(ContentStatus::Deleted),
            _ => None,
        }
    }
}

impl FromStr for ContentStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentStatus::from_str_opt(s).ok_or_else(|| format!("Invalid ContentStatus: {}", s))
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Root post vs. comment. Prestige scores the two kinds separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Root,
    Child,
}

/// A content item (root post or comment).
///
/// ## Fields
/// - `id`: snowflake id
/// - `owner_id`: authoring user
/// - `parent_id`: `None` for root posts, the parent for comments
/// - `slug`: URL fragment, unique per owner at the platform layer
/// - `status`: draft / published / deleted
/// - `score`: cached ranking score derived from the content's tabcoin
///   ledger; recomputed on every balance change, zero until the first
///   recompute. The ledger, not this field, is the source of truth.
/// - `published_at`: set when the item became published
/// - `created_at` / `updated_at`: row timestamps (UTC)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: ContentId,
    pub owner_id: UserId,
    pub parent_id: Option<ContentId>,
    pub slug: String,
    pub status: ContentStatus,
    pub score: Decimal,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    #[inline]
    pub fn kind(&self) -> ContentKind {
        if self.parent_id.is_none() {
            ContentKind::Root
        } else {
            ContentKind::Child
        }
    }

    #[inline]
    pub fn is_published(&self) -> bool {
        self.status == ContentStatus::Published
    }
}
