pub mod rest;
pub mod traits;

pub use rest::RestExchangeClient;
pub use traits::{BalanceRecord, ExchangeApi};

#[cfg(test)]
pub use traits::MockExchangeApi;
