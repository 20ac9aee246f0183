// Snowflake ID generator
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{ContentId, EventId, OperationId, UserId};

/// Snowflake generator for time-ordered unique identifiers.
///
/// Format (64 bits):
/// - 41 bits: milliseconds since the platform epoch
/// - 10 bits: worker ID
/// - 12 bits: per-millisecond sequence
///
/// One generator hands out ids for every entity kind (users, contents,
/// events, balance operations), so ids are unique across kinds. That
/// property is what lets a ledger row carry a polymorphic originator
/// reference without a type discriminator in the key.
pub struct IdGenerator {
    /// Worker ID (0-1023)
    worker_id: u16,

    /// Platform epoch (milliseconds since Unix epoch)
    epoch: u64,

    /// State protected by mutex
    state: Mutex<GeneratorState>,
}

struct GeneratorState {
    /// Last timestamp used
    last_timestamp: u64,

    /// Sequence number (0-4095)
    sequence: u16,
}

impl IdGenerator {
    /// Platform epoch: 2024-01-01 00:00:00 UTC
    pub const EPOCH: u64 = 1704067200000;

    /// Maximum worker ID
    pub const MAX_WORKER_ID: u16 = 1023;

    /// Maximum sequence number
    const MAX_SEQUENCE: u16 = 4095;

    /// Create a generator for the given worker.
    ///
    /// # Panics
    ///
    /// Panics if `worker_id` exceeds [`Self::MAX_WORKER_ID`]. Validated
    /// configuration (see `EngineConfig::validate`) never passes one.
    pub fn new(worker_id: u16) -> Self {
        assert!(
            worker_id <= Self::MAX_WORKER_ID,
            "worker_id must be <= {}",
            Self::MAX_WORKER_ID
        );

        Self {
            worker_id,
            epoch: Self::EPOCH,
            state: Mutex::new(GeneratorState {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    /// Generate the next raw snowflake id.
    pub fn next_id(&self) -> Result<i64, String> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| "id generator state poisoned".to_string())?;

        let mut timestamp = self.current_timestamp()?;

        // Handle clock going backwards
        if timestamp < state.last_timestamp {
            return Err(format!(
                "clock moved backwards; refusing to generate id for {} ms",
                state.last_timestamp - timestamp
            ));
        }

        if timestamp == state.last_timestamp {
            // Same millisecond - increment sequence
            state.sequence = (state.sequence + 1) & Self::MAX_SEQUENCE;

            if state.sequence == 0 {
                // Sequence overflow - wait for next millisecond
                timestamp = self.wait_next_millis(state.last_timestamp)?;
            }
        } else {
            // New millisecond - reset sequence
            state.sequence = 0;
        }

        state.last_timestamp = timestamp;

        let id = ((timestamp - self.epoch) << 22)
            | ((self.worker_id as u64) << 12)
            | (state.sequence as u64);

        Ok(id as i64)
    }

    /// Next id, typed as a user id.
    pub fn next_user_id(&self) -> Result<UserId, String> {
        Ok(UserId::new(self.next_id()?))
    }

    /// Next id, typed as a content id.
    pub fn next_content_id(&self) -> Result<ContentId, String> {
        Ok(ContentId::new(self.next_id()?))
    }

    /// Next id, typed as an event id.
    pub fn next_event_id(&self) -> Result<EventId, String> {
        Ok(EventId::new(self.next_id()?))
    }

    /// Next id, typed as a balance-operation id.
    pub fn next_operation_id(&self) -> Result<OperationId, String> {
        Ok(OperationId::new(self.next_id()?))
    }

    /// Extract the millisecond timestamp embedded in an id.
    pub fn extract_timestamp(&self, id: i64) -> u64 {
        ((id as u64) >> 22) + self.epoch
    }

    /// Extract the worker component of an id.
    pub fn extract_worker_id(&self, id: i64) -> u16 {
        (((id as u64) >> 12) & 0x3FF) as u16
    }

    fn current_timestamp(&self) -> Result<u64, String> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .map_err(|e| format!("failed to read system clock: {}", e))
    }

    /// Wait until next millisecond
    fn wait_next_millis(&self, last_timestamp: u64) -> Result<u64, String> {
        let mut timestamp = self.current_timestamp()?;
        while timestamp <= last_timestamp {
            timestamp = self.current_timestamp()?;
        }
        Ok(timestamp)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}
