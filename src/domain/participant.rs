use rand::Rng;
use rand_distr::{Distribution, LogNormal, Uniform};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{Result, StampedeError};
use crate::model::{floor_4dp, OrderAction, SizingModel};

use super::OrderRequest;

/// Synthetic trader issuing buy/sell/skip orders against the exchange
#[derive(Debug, Clone)]
pub struct Participant {
    pub email: String,
    pub password: String,
    pub token: Option<String>,
    /// Current fiat balance, synced from the exchange after every day
    pub money: Decimal,
    /// Current instrument holdings, synced from the exchange after every day
    pub assets: Decimal,
    /// Desired profit ratio over the whole run
    pub target_return: f64,
    /// Realized return, (money + assets - initial) / initial
    pub current_return: f64,
    pub model: SizingModel,
    pub money_history: Vec<Decimal>,
    pub assets_history: Vec<Decimal>,
}

impl Participant {
    pub fn new(email: String, password: String, target_return: f64, money: Decimal) -> Self {
        Self {
            email,
            password,
            token: None,
            money,
            assets: Decimal::ZERO,
            target_return,
            current_return: 0.0,
            model: SizingModel::default(),
            money_history: vec![money],
            assets_history: vec![Decimal::ZERO],
        }
    }

    /// Draw a participant from the population distributions: lognormal target
    /// return around the mean, uniform starting fiat in [0.6, 1.4] of the mean
    pub fn sample<R: Rng + ?Sized>(
        rng: &mut R,
        email: String,
        password: String,
        mean_target_return: f64,
        mean_money: f64,
    ) -> Self {
        let target = LogNormal::new(mean_target_return.ln(), 0.1 * mean_target_return)
            .map(|dist| dist.sample(rng))
            .unwrap_or(mean_target_return);
        let target = (target * 1e4).floor() / 1e4;

        let money = Uniform::new(0.6 * mean_money, 1.4 * mean_money).sample(rng);

        Self::new(email, password, target, floor_4dp(money))
    }

    /// Decide today's order; `None` means skip and never touches the network
    pub fn plan<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        asset_return: f64,
        instrument_id: u64,
        expires_in: u32,
    ) -> Option<OrderRequest> {
        let action = self
            .model
            .decide(rng, self.target_return, self.current_return);

        let request = match action {
            OrderAction::Buy => {
                let sizing =
                    self.model
                        .size_buy(rng, self.target_return, self.current_return, asset_return);
                let amount = sizing.proportion * self.money.to_f64().unwrap_or(0.0);
                OrderRequest::buy(
                    floor_4dp(sizing.price),
                    floor_4dp(amount),
                    expires_in,
                    instrument_id,
                )
            }
            OrderAction::Sell => {
                let sizing =
                    self.model
                        .size_sell(rng, self.target_return, self.current_return, asset_return);
                let amount = sizing.proportion * self.assets.to_f64().unwrap_or(0.0);
                OrderRequest::sell(
                    floor_4dp(sizing.price),
                    floor_4dp(amount),
                    expires_in,
                    instrument_id,
                )
            }
            OrderAction::Skip => return None,
        };

        Some(request)
    }

    /// Record a balance snapshot and recompute the realized return
    pub fn record_balances(&mut self, money: Decimal, assets: Decimal) {
        self.money = money;
        self.assets = assets;
        self.money_history.push(money);
        self.assets_history.push(assets);

        let initial = self.initial_money();
        if !initial.is_zero() {
            self.current_return = ((money + assets - initial) / initial)
                .to_f64()
                .unwrap_or(0.0);
        }
    }

    pub fn initial_money(&self) -> Decimal {
        self.money_history[0]
    }

    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| StampedeError::TokenMissing(self.email.clone()))
    }
}
