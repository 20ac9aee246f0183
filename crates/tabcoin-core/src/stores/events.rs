//! Event store: one partition of audited platform events, keyed by id.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;

use tabcoin_commons::ids::{EventId, IdGenerator, UserId};
use tabcoin_commons::keys::StorageKey;
use tabcoin_commons::models::{Event, EventType};
use tabcoin_store::{from_bytes, to_bytes, Partition, StorageRead, StorageTransaction};

use crate::error::{Result, TabcoinError};
use crate::stores::partitions;

/// Caller-supplied fields of a new event.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NewEvent {
    pub event_type: EventType,
    pub originator_user_id: Option<UserId>,
    pub originator_ip: Option<IpAddr>,
    pub metadata: serde_json::Value,
}

pub struct EventStore {
    ids: Arc<IdGenerator>,
    primary: Partition,
}

impl EventStore {
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self {
            ids,
            primary: Partition::new(partitions::EVENTS),
        }
    }

    pub fn create(&self, txn: &mut dyn StorageTransaction, new_event: NewEvent) -> Result<Event> {
        let id = self.ids.next_event_id().map_err(TabcoinError::InvalidId)?;
        let event = Event {
            id,
            event_type: new_event.event_type,
            originator_user_id: new_event.originator_user_id,
            originator_ip: new_event.originator_ip,
            metadata: new_event.metadata,
            created_at: Utc::now(),
        };

        txn.put(&self.primary, &event.id.storage_key(), &to_bytes(&event)?)?;
        Ok(event)
    }

    pub fn find_by_id(&self, reader: &dyn StorageRead, id: EventId) -> Result<Option<Event>> {
        match reader.get(&self.primary, &id.storage_key())? {
            Some(value) => Ok(Some(from_bytes(&value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabcoin_store::{Datastore, IsolationLevel, MemoryDatastore};

    fn setup_store() -> (Arc<MemoryDatastore>, EventStore) {
        let datastore = Arc::new(MemoryDatastore::new());
        crate::stores::init_partitions(datastore.as_ref()).unwrap();
        (datastore, EventStore::new(Arc::new(IdGenerator::new(0))))
    }

    #[test]
    fn test_create_and_find() {
        let (datastore, store) = setup_store();

        let mut txn = datastore.begin(IsolationLevel::ReadCommitted).unwrap();
        let event = store
            .create(
                &mut *txn,
                NewEvent {
                    event_type: EventType::RewardUserTabcoins,
                    originator_user_id: Some(UserId::new(7)),
                    originator_ip: Some("10.0.0.7".parse().unwrap()),
                    metadata: json!({ "amount": 2, "reward_type": "daily" }),
                },
            )
            .unwrap();
        txn.commit().unwrap();

        let found = store
            .find_by_id(datastore.as_read(), event.id)
            .unwrap()
            .unwrap();
        assert_eq!(found, event);
        assert_eq!(found.metadata["amount"], 2);
        assert_eq!(found.event_type, EventType::RewardUserTabcoins);
    }

    #[test]
    fn test_find_missing_event() {
        let (datastore, store) = setup_store();
        assert!(store
            .find_by_id(datastore.as_read(), EventId::new(404))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_uncommitted_event_is_invisible() {
        let (datastore, store) = setup_store();

        let event = {
            let mut txn = datastore.begin(IsolationLevel::ReadCommitted).unwrap();
            let event = store
                .create(
                    &mut *txn,
                    NewEvent {
                        event_type: EventType::UpdateContentTabcoins,
                        originator_user_id: None,
                        originator_ip: None,
                        metadata: json!({}),
                    },
                )
                .unwrap();
            // Read-your-writes inside the transaction.
            assert!(store.find_by_id(txn.as_read(), event.id).unwrap().is_some());
            event
            // dropped without commit
        };

        assert!(store
            .find_by_id(datastore.as_read(), event.id)
            .unwrap()
            .is_none());
    }
}
