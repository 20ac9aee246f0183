//! Engine wiring.
//!
//! `EngineContext` owns one datastore plus every store and service built
//! on it, constructed once at startup and shared behind `Arc`s. Callers
//! reach the pieces through accessors rather than wiring stores and
//! services by hand.

use std::sync::Arc;

use tabcoin_commons::config::EngineConfig;
use tabcoin_commons::ids::IdGenerator;
use tabcoin_store::{Datastore, IsolationLevel, StorageTransaction};

use crate::error::{Result, TabcoinError};
use crate::services::{BalanceService, PrestigeService, RewardService, ScoreService};
use crate::stores::{self, ContentStore, EventStore, LedgerStore, UserStore};

pub struct EngineContext {
    datastore: Arc<dyn Datastore>,
    config: EngineConfig,
    ids: Arc<IdGenerator>,

    // ===== Stores =====
    ledger: Arc<LedgerStore>,
    users: Arc<UserStore>,
    contents: Arc<ContentStore>,
    events: Arc<EventStore>,

    // ===== Services =====
    balance: Arc<BalanceService>,
    scores: Arc<ScoreService>,
    prestige: Arc<PrestigeService>,
    rewards: Arc<RewardService>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    /// Validate `config`, ensure all partitions exist in `datastore`, and
    /// wire up the stores and services.
    pub fn new(datastore: Arc<dyn Datastore>, config: EngineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| TabcoinError::validation(e.to_string()))?;
        stores::init_partitions(datastore.as_ref())?;

        let ids = Arc::new(IdGenerator::new(config.worker_id));
        let ledger = Arc::new(LedgerStore::new(datastore.clone(), ids.clone()));
        let users = Arc::new(UserStore::new(ids.clone()));
        let contents = Arc::new(ContentStore::new(ids.clone()));
        let events = Arc::new(EventStore::new(ids.clone()));

        let scores = Arc::new(ScoreService::new(ledger.clone(), contents.clone()));
        let balance = Arc::new(BalanceService::new(
            datastore.clone(),
            ledger.clone(),
            scores.clone(),
        ));
        let prestige = Arc::new(PrestigeService::new(
            datastore.clone(),
            balance.clone(),
            contents.clone(),
            config.prestige.clone(),
        ));
        let rewards = Arc::new(RewardService::new(
            datastore.clone(),
            users.clone(),
            contents.clone(),
            events.clone(),
            balance.clone(),
            prestige.clone(),
        ));

        Ok(Self {
            datastore,
            config,
            ids,
            ledger,
            users,
            contents,
            events,
            balance,
            scores,
            prestige,
            rewards,
        })
    }

    /// Begin a transaction on the underlying datastore.
    pub fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn StorageTransaction + '_>> {
        Ok(self.datastore.begin(isolation)?)
    }

    pub fn datastore(&self) -> Arc<dyn Datastore> {
        self.datastore.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ids(&self) -> Arc<IdGenerator> {
        self.ids.clone()
    }

    pub fn ledger(&self) -> Arc<LedgerStore> {
        self.ledger.clone()
    }

    pub fn users(&self) -> Arc<UserStore> {
        self.users.clone()
    }

    pub fn contents(&self) -> Arc<ContentStore> {
        self.contents.clone()
    }

    pub fn events(&self) -> Arc<EventStore> {
        self.events.clone()
    }

    pub fn balance(&self) -> Arc<BalanceService> {
        self.balance.clone()
    }

    pub fn scores(&self) -> Arc<ScoreService> {
        self.scores.clone()
    }

    pub fn prestige(&self) -> Arc<PrestigeService> {
        self.prestige.clone()
    }

    pub fn rewards(&self) -> Arc<RewardService> {
        self.rewards.clone()
    }
}
