use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{OrderRequest, OrderTicket};
use crate::error::Result;

/// One balance row as stored server side; the record id is needed for updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub id: u64,
    pub amount: Decimal,
}

/// Seam over the exchange REST API. The emulation engine only talks through
/// this trait, which keeps the day loop testable without a server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Register an account; already-existing accounts are not an error
    async fn create_user(&self, email: &str, password: &str) -> Result<()>;

    /// Exchange credentials for a JWT token
    async fn obtain_token(&self, email: &str, password: &str) -> Result<String>;

    /// Create a tradable instrument, returning its id
    async fn create_instrument(&self, token: &str, name: &str) -> Result<u64>;

    /// Cancel every resting order owned by the token's account
    async fn delete_all_orders(&self, token: &str) -> Result<()>;

    async fn fiat_balance(&self, token: &str) -> Result<BalanceRecord>;

    async fn set_fiat_balance(&self, token: &str, record_id: u64, amount: Decimal) -> Result<()>;

    async fn instrument_balance(&self, token: &str, instrument_id: u64) -> Result<BalanceRecord>;

    async fn set_instrument_balance(
        &self,
        token: &str,
        record_id: u64,
        amount: Decimal,
    ) -> Result<()>;

    async fn submit_order(&self, token: &str, request: &OrderRequest) -> Result<OrderTicket>;
}
