use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{Result, StampedeError};
use crate::model::{floor_4dp, limit_price};

use super::OrderRequest;

/// Liquidity provider: starts with a large instrument inventory and offers
/// all of it for sale every day at a premium over the scheduled return
#[derive(Debug, Clone)]
pub struct Bank {
    pub email: String,
    pub password: String,
    pub token: Option<String>,
    pub money: Decimal,
    pub assets: Decimal,
    pub money_history: Vec<Decimal>,
    pub assets_history: Vec<Decimal>,
}

impl Bank {
    pub fn new(email: String, password: String, assets: Decimal) -> Self {
        Self {
            email,
            password,
            token: None,
            money: Decimal::ZERO,
            assets,
            money_history: vec![Decimal::ZERO],
            assets_history: vec![assets],
        }
    }

    /// Whether the bank still quotes (it keeps quoting until inventory
    /// goes negative, mirroring short positions never being offered)
    pub fn has_inventory(&self) -> bool {
        self.assets >= Decimal::ZERO
    }

    /// Sell the whole inventory at the price implied by the given return
    pub fn offer(&self, asset_return: f64, instrument_id: u64, expires_in: u32) -> OrderRequest {
        OrderRequest::sell(
            floor_4dp(limit_price(asset_return)),
            floor_4dp(self.assets.to_f64().unwrap_or(0.0)),
            expires_in,
            instrument_id,
        )
    }

    pub fn record_balances(&mut self, money: Decimal, assets: Decimal) {
        self.money = money;
        self.assets = assets;
        self.money_history.push(money);
        self.assets_history.push(assets);
    }

    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| StampedeError::TokenMissing(self.email.clone()))
    }
}
