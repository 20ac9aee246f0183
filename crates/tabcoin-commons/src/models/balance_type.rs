use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which ledger a balance operation belongs to.
///
/// These were free-form string tags in the original schema; the closed enum
/// makes an unknown tag unrepresentable. The three `content:tabcoin:*`
/// variants form the *content tabcoin group*: a content item's coin balance
/// is the sum over all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceType {
    #[serde(rename = "user:tabcoin")]
    UserTabcoin,
    #[serde(rename = "user:tabcash")]
    UserTabcash,
    #[serde(rename = "content:tabcoin:initial")]
    ContentTabcoinInitial,
    #[serde(rename = "content:tabcoin:credit")]
    ContentTabcoinCredit,
    #[serde(rename = "content:tabcoin:debit")]
    ContentTabcoinDebit,
}

impl BalanceType {
    /// The content tabcoin group, in scan order.
    pub const CONTENT_TABCOIN_GROUP: [BalanceType; 3] = [
        BalanceType::ContentTabcoinInitial,
        BalanceType::ContentTabcoinCredit,
        BalanceType::ContentTabcoinDebit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceType::UserTabcoin => "user:tabcoin",
            BalanceType::UserTabcash => "user:tabcash",
            BalanceType::ContentTabcoinInitial => "content:tabcoin:initial",
            BalanceType::ContentTabcoinCredit => "content:tabcoin:credit",
            BalanceType::ContentTabcoinDebit => "content:tabcoin:debit",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "user:tabcoin" => Some(BalanceType::UserTabcoin),
            "user:tabcash" => Some(BalanceType::UserTabcash),
            "content:tabcoin:initial" => Some(BalanceType::ContentTabcoinInitial),
            "content:tabcoin:credit" => Some(BalanceType::ContentTabcoinCredit),
            "content:tabcoin:debit" => Some(BalanceType::ContentTabcoinDebit),
            _ => None,
        }
    }

    /// True for tags whose recipient is a content item.
    ///
    /// Appends with these tags trigger a score recompute for the recipient.
    pub fn is_content_tabcoin(&self) -> bool {
        matches!(
            self,
            BalanceType::ContentTabcoinInitial
                | BalanceType::ContentTabcoinCredit
                | BalanceType::ContentTabcoinDebit
        )
    }

    /// True for tags whose recipient is a user.
    pub fn is_user(&self) -> bool {
        matches!(self, BalanceType::UserTabcoin | BalanceType::UserTabcash)
    }
}

impl FromStr for BalanceType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BalanceType::from_str_opt(s).ok_or_else(|| format!("Invalid BalanceType: {}", s))
    }
}

impl fmt::Display for BalanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
