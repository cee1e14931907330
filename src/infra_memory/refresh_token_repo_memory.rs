use crate::application_port::TokenError;
use crate::domain_model::PairId;
use crate::domain_port::{RefreshTokenRecord, RefreshTokenRepo};
use dashmap::DashMap;

/// Map-backed store for the "memory" backend and for tests. DashMap
/// holds the shard lock for the duration of `get_mut`, which gives
/// `mark_used_if_unused` the same exactly-one-winner guarantee as the
/// SQL conditional update.
#[derive(Default)]
pub struct InMemoryRefreshTokenRepo {
    records: DashMap<PairId, RefreshTokenRecord>,
}

impl InMemoryRefreshTokenRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for InMemoryRefreshTokenRepo {
    async fn save(&self, record: &RefreshTokenRecord) -> Result<(), TokenError> {
        if self.records.contains_key(&record.id) {
            return Err(TokenError::Conflict);
        }
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: PairId) -> Result<RefreshTokenRecord, TokenError> {
        self.records
            .get(&id)
            .map(|r| r.clone())
            .ok_or(TokenError::RecordNotFound)
    }

    async fn mark_used_if_unused(&self, id: PairId) -> Result<bool, TokenError> {
        match self.records.get_mut(&id) {
            Some(mut record) => {
                if record.is_used {
                    Ok(false)
                } else {
                    record.is_used = true;
                    Ok(true)
                }
            }
            None => Ok(false),
        }
    }

    async fn is_used(&self, id: PairId) -> Result<bool, TokenError> {
        self.records
            .get(&id)
            .map(|r| r.is_used)
            .ok_or(TokenError::RecordNotFound)
    }
}
