//! Order-preserving storage-key encoding.
//!
//! Partition scans rely on byte-by-byte key ordering, so composite keys must
//! be encoded in a form whose byte order matches the logical order of their
//! components. Naive encodings (length prefixes, `format!` with separators)
//! break that. This module wraps the `storekey` crate, which escape-encodes
//! strings and big-endian-flips integers so that
//! `("content:tabcoin:credit", 7, 1)` sorts before
//! `("content:tabcoin:credit", 7, 2)` and both sort before
//! `("content:tabcoin:credit", 8, 1)`.
//!
//! The ledger's primary key is the tuple
//! `(balance_type_tag, recipient_id, sequence)`: one prefix scan over
//! `(tag, recipient)` walks a whole per-recipient ledger in append order.

use storekey::{Decode, Encode};

/// Encode a value to bytes using storekey's order-preserving format.
///
/// Supported types include primitives, `&str`/`String`, and tuples of those
/// (used for composite keys).
///
/// ```rust
/// use tabcoin_commons::keys::encode_key;
///
/// let a = encode_key(&("user:tabcoin", 7_i64, 1_u64));
/// let b = encode_key(&("user:tabcoin", 7_i64, 2_u64));
/// assert!(a < b);
/// ```
pub fn encode_key<T: Encode>(value: &T) -> Vec<u8> {
    storekey::encode_vec(value).expect("storekey encoding is infallible for key types")
}

/// Encode a tuple prefix for range scans.
///
/// Identical to [`encode_key`]; the separate name marks intent at call
/// sites. For keys shaped `(tag, recipient, sequence)`, scanning everything
/// for one recipient means encoding just `(tag, recipient)`.
pub fn encode_prefix<T: Encode>(value: &T) -> Vec<u8> {
    encode_key(value)
}

/// Decode a value from storekey-encoded bytes.
///
/// # Errors
///
/// Returns an error if the bytes cannot be decoded to the expected type.
pub fn decode_key<T: Decode>(bytes: &[u8]) -> Result<T, String> {
    storekey::decode(&mut std::io::Cursor::new(bytes))
        .map_err(|e| format!("storekey decode error: {:?}", e))
}

/// Keys that can serialize themselves for partition storage.
///
/// Implemented by the typed ids; composite keys are usually built inline
/// with [`encode_key`] and a tuple instead.
pub trait StorageKey: Clone + Send + Sync + 'static {
    /// Serialize this key to order-preserving bytes.
    fn storage_key(&self) -> Vec<u8>;

    /// Deserialize this key from bytes.
    fn from_storage_key(bytes: &[u8]) -> Result<Self, String>
    where
        Self: Sized;
}

impl StorageKey for String {
    fn storage_key(&self) -> Vec<u8> {
        encode_key(&self.as_str())
    }

    fn from_storage_key(bytes: &[u8]) -> Result<Self, String> {
        decode_key(bytes)
    }
}

impl StorageKey for i64 {
    fn storage_key(&self) -> Vec<u8> {
        encode_key(self)
    }

    fn from_storage_key(bytes: &[u8]) -> Result<Self, String> {
        decode_key(bytes)
    }
}

impl StorageKey for u64 {
    fn storage_key(&self) -> Vec<u8> {
        encode_key(self)
    }

    fn from_storage_key(bytes: &[u8]) -> Result<Self, String> {
        decode_key(bytes)
    }
}
