// ABOUTME: QuotaAccessor trait for the external accounting collaborator,
// ABOUTME: plus an in-memory implementation backed by a tokio mutex.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::QuotaError;

/// Caller-side view of a user's remaining usage units.
#[async_trait]
pub trait QuotaAccessor: Send + Sync {
    /// Units the user may still spend.
    async fn remaining(&self, user_id: &str) -> Result<u64, QuotaError>;

    /// Deduct `units` from the user's balance.
    async fn charge(&self, user_id: &str, units: u64) -> Result<(), QuotaError>;
}

/// Per-user balances held in memory.
///
/// Users without an explicit balance start at `default_balance`.
#[derive(Debug, Default)]
pub struct InMemoryQuota {
    balances: Mutex<HashMap<String, u64>>,
    default_balance: u64,
}

impl InMemoryQuota {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance given to users seen for the first time.
    pub fn with_default_balance(mut self, units: u64) -> Self {
        self.default_balance = units;
        self
    }

    /// Set a user's balance outright.
    pub async fn set_balance(&self, user_id: impl Into<String>, units: u64) {
        self.balances.lock().await.insert(user_id.into(), units);
    }

    /// Add units to a user's balance.
    pub async fn grant(&self, user_id: &str, units: u64) {
        let mut balances = self.balances.lock().await;
        let balance = balances
            .entry(user_id.to_string())
            .or_insert(self.default_balance);
        *balance = balance.saturating_add(units);
    }
}

#[async_trait]
impl QuotaAccessor for InMemoryQuota {
    async fn remaining(&self, user_id: &str) -> Result<u64, QuotaError> {
        let balances = self.balances.lock().await;
        Ok(balances
            .get(user_id)
            .copied()
            .unwrap_or(self.default_balance))
    }

    async fn charge(&self, user_id: &str, units: u64) -> Result<(), QuotaError> {
        let mut balances = self.balances.lock().await;
        let balance = balances
            .entry(user_id.to_string())
            .or_insert(self.default_balance);
        if *balance < units {
            return Err(QuotaError::Insufficient {
                user_id: user_id.to_string(),
                requested: units,
                remaining: *balance,
            });
        }
        *balance -= units;
        Ok(())
    }
}
