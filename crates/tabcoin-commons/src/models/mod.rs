//! Entity models and the closed enums behind the ledger's string tags.

mod balance_operation;
mod balance_type;
mod content;
mod event;
mod originator;
mod user;

pub use balance_operation::BalanceOperation;
pub use balance_type::BalanceType;
pub use content::{Content, ContentKind, ContentStatus};
pub use event::{Event, EventType};
pub use originator::{Originator, OriginatorType};
pub use user::User;
