//! Event entity: the audited cause of a mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::ids::{EventId, UserId};

/// Platform event tags this subsystem creates or attributes ledger rows to.
///
/// The reward engine emits `reward:user:tabcoins`; the other tags cover the
/// publish/vote causes that originate balance operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "create:content:text_root")]
    CreateContentTextRoot,
    #[serde(rename = "create:content:text_child")]
    CreateContentTextChild,
    #[serde(rename = "update:content:tabcoins")]
    UpdateContentTabcoins,
    #[serde(rename = "reward:user:tabcoins")]
    RewardUserTabcoins,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CreateContentTextRoot => "create:content:text_root",
            EventType::CreateContentTextChild => "create:content:text_child",
            EventType::UpdateContentTabcoins => "update:content:tabcoins",
            EventType::RewardUserTabcoins => "reward:user:tabcoins",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "create:content:text_root" => Some(EventType::CreateContentTextRoot),
            "create:content:text_child" => Some(EventType::CreateContentTextChild),
            "update:content:tabcoins" => Some(EventType::UpdateContentTabcoins),
            "reward:user:tabcoins" => Some(EventType::RewardUserTabcoins),
            _ => None,
        }
    }
}

impl FromStr for EventType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::from_str_opt(s).ok_or_else(|| format!("Invalid EventType: {}", s))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audited platform event.
///
/// ## Fields
/// - `id`: snowflake id
/// - `event_type`: closed tag
/// - `originator_user_id`: acting user, when one exists
/// - `originator_ip`: client address, when captured at the request edge
/// - `metadata`: free-form JSON payload (e.g. `{"amount": 2,
///   "reward_type": "daily"}` for reward events)
/// - `created_at`: insertion time (UTC)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub originator_user_id: Option<UserId>,
    pub originator_ip: Option<IpAddr>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
