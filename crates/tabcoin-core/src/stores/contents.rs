//! Content store.
//!
//! Partitions: `contents` (rows by id) and `contents_by_owner`
//! (`(owner_id, published_at_ms, id)` to primary key, maintained for
//! published rows only). The by-owner index is what makes the prestige
//! window query a single prefix scan per user.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use tabcoin_commons::ids::{ContentId, IdGenerator, UserId};
use tabcoin_commons::keys::{encode_key, encode_prefix, StorageKey};
use tabcoin_commons::models::{Content, ContentKind, ContentStatus};
use tabcoin_store::{from_bytes, to_bytes, Partition, StorageError, StorageRead, StorageTransaction};

use crate::error::{Result, TabcoinError};
use crate::stores::partitions;

/// Caller-supplied fields of a new content item.
///
/// `published_at` may be given explicitly (imports, fixtures); when absent
/// and the status is `published`, creation stamps the current instant.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NewContent {
    pub owner_id: UserId,
    pub parent_id: Option<ContentId>,
    pub slug: String,
    pub status: ContentStatus,
    pub published_at: Option<DateTime<Utc>>,
}

/// Ordering applied by [`ContentStore::find_with_strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStrategy {
    /// Most recently published first.
    New,
    /// Oldest published first.
    Old,
    /// Highest score first, publication time as tie-break.
    Relevant,
}

/// Conjunctive row filter for listings. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentFilter {
    pub owner_id: Option<UserId>,
    pub status: Option<ContentStatus>,
    pub kind: Option<ContentKind>,
}

impl ContentFilter {
    /// Published content of one owner, any kind.
    pub fn published_by(owner_id: UserId) -> Self {
        Self {
            owner_id: Some(owner_id),
            status: Some(ContentStatus::Published),
            kind: None,
        }
    }

    fn matches(&self, content: &Content) -> bool {
        if let Some(owner_id) = self.owner_id {
            if content.owner_id != owner_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if content.status != status {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if content.kind() != kind {
                return false;
            }
        }
        true
    }
}

pub struct ContentStore {
    ids: Arc<IdGenerator>,
    primary: Partition,
    by_owner: Partition,
}

impl ContentStore {
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self {
            ids,
            primary: Partition::new(partitions::CONTENTS),
            by_owner: Partition::new(partitions::CONTENTS_BY_OWNER),
        }
    }

    fn owner_index_key(content: &Content, published_at: DateTime<Utc>) -> Vec<u8> {
        encode_key(&(
            content.owner_id.as_i64(),
            published_at.timestamp_millis(),
            content.id.as_i64(),
        ))
    }

    /// Create a content row. The score starts at zero and stays there
    /// until the first balance change triggers a recompute.
    pub fn create(&self, txn: &mut dyn StorageTransaction, new_content: NewContent) -> Result<Content> {
        if new_content.slug.trim().is_empty() {
            return Err(TabcoinError::validation("slug cannot be empty"));
        }

        let id = self.ids.next_content_id().map_err(TabcoinError::InvalidId)?;
        let now = Utc::now();
        let published_at = match (new_content.status, new_content.published_at) {
            (ContentStatus::Published, None) => Some(now),
            (_, given) => given,
        };

        let content = Content {
            id,
            owner_id: new_content.owner_id,
            parent_id: new_content.parent_id,
            slug: new_content.slug,
            status: new_content.status,
            score: Decimal::ZERO,
            published_at,
            created_at: now,
            updated_at: now,
        };

        txn.put(&self.primary, &content.id.storage_key(), &to_bytes(&content)?)?;
        if content.is_published() {
            if let Some(published_at) = content.published_at {
                txn.put(
                    &self.by_owner,
                    &Self::owner_index_key(&content, published_at),
                    &content.id.storage_key(),
                )?;
            }
        }
        Ok(content)
    }

    pub fn find_by_id(&self, reader: &dyn StorageRead, id: ContentId) -> Result<Option<Content>> {
        match reader.get(&self.primary, &id.storage_key())? {
            Some(value) => Ok(Some(from_bytes(&value)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the cached score of a content row.
    pub fn update_score(
        &self,
        txn: &mut dyn StorageTransaction,
        id: ContentId,
        score: Decimal,
    ) -> Result<Content> {
        let mut content = self
            .find_by_id(txn.as_read(), id)?
            .ok_or_else(|| TabcoinError::not_found(format!("content {} not found", id)))?;

        content.score = score;
        content.updated_at = Utc::now();
        txn.put(&self.primary, &content.id.storage_key(), &to_bytes(&content)?)?;
        Ok(content)
    }

    /// Filtered listing under one of the feed orderings, truncated to
    /// `per_page` rows.
    pub fn find_with_strategy(
        &self,
        reader: &dyn StorageRead,
        strategy: ListStrategy,
        filter: ContentFilter,
        per_page: usize,
    ) -> Result<Vec<Content>> {
        let mut items = Vec::new();
        for (_key, value) in reader.scan_prefix(&self.primary, &[])? {
            let content: Content = from_bytes(&value)?;
            if filter.matches(&content) {
                items.push(content);
            }
        }

        match strategy {
            ListStrategy::New => items.sort_by(|a, b| {
                b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id))
            }),
            ListStrategy::Old => items.sort_by(|a, b| {
                a.published_at.cmp(&b.published_at).then(a.id.cmp(&b.id))
            }),
            ListStrategy::Relevant => items.sort_by(|a, b| {
                b.score
                    .cmp(&a.score)
                    .then(b.published_at.cmp(&a.published_at))
                    .then(b.id.cmp(&a.id))
            }),
        }

        items.truncate(per_page);
        Ok(items)
    }

    /// The prestige window query: published content of one owner and kind
    /// with `published_at <= published_before`, most recent first, skipping
    /// the first `offset` rows and returning at most `limit`.
    pub fn list_published_for_owner(
        &self,
        reader: &dyn StorageRead,
        owner_id: UserId,
        kind: ContentKind,
        published_before: DateTime<Utc>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Content>> {
        let prefix = encode_prefix(&owner_id.as_i64());
        let mut items = Vec::new();
        for (_key, primary_key) in reader.scan_prefix(&self.by_owner, &prefix)? {
            let Some(value) = reader.get(&self.primary, &primary_key)? else {
                return Err(StorageError::Other(format!(
                    "dangling owner index entry for user {}",
                    owner_id
                ))
                .into());
            };
            let content: Content = from_bytes(&value)?;
            if content.kind() != kind || !content.is_published() {
                continue;
            }
            let Some(published_at) = content.published_at else {
                continue;
            };
            if published_at <= published_before {
                items.push(content);
            }
        }

        // The index scan came back oldest first; the window wants the
        // other direction.
        items.reverse();
        Ok(items.into_iter().skip(offset).take(limit).collect())
    }
}
