//! Business logic over the stores.
//!
//! Services own the rules the stores deliberately do not know about:
//! which appends trigger a score recompute, how prestige windows are
//! evaluated, and how the daily reward claim is serialized. Each service
//! holds `Arc`s to the stores it reads and takes transactions from the
//! caller, so one request can span several services atomically.

pub mod balance_service;
pub mod prestige_service;
pub mod reward_service;
pub mod score_service;

pub use balance_service::{BalanceParams, BalanceService};
pub use prestige_service::{ContentTabcoins, PrestigeService, PrestigeWindow};
pub use reward_service::RewardService;
pub use score_service::ScoreService;
