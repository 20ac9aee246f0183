//! Row codec: entities are stored as JSON.
//!
//! JSON keeps stored rows inspectable and schema-tolerant; the hot paths
//! here are scans of small rows, where codec choice is not the bottleneck.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage_trait::{Result, StorageError};

/// Serialize an entity for storage.
pub fn to_bytes<T: Serialize>(entity: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(entity).map_err(|e| StorageError::SerializationError(e.to_string()))
}

/// Deserialize an entity from stored bytes.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::SerializationError(e.to_string()))
}
