//! Probabilistic order-sizing model.
//!
//! Each participant biases order direction and size by how far its realized
//! return has drifted from its target return. All stochastic math happens in
//! f64; amounts are floored to 4 decimal places at the wire boundary.

use rand::Rng;
use rand_distr::{Distribution, Exp};
use rust_decimal::Decimal;

/// Direction chosen for a single trading day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Buy,
    Sell,
    Skip,
}

/// Output of the sizing step: how much wealth to commit and at what price
#[derive(Debug, Clone, Copy)]
pub struct OrderSizing {
    /// Fraction of fiat (buy) or holdings (sell) committed, in [min_p, max_p]
    pub proportion: f64,
    /// Base return after the stochastic perturbation
    pub perturbed_return: f64,
    /// Limit price, 1 / (1 + perturbed_return)
    pub price: f64,
}

/// Per-participant model parameters
#[derive(Debug, Clone, Copy)]
pub struct SizingModel {
    pub buy_p: f64,
    pub sell_p: f64,
    pub skip_p: f64,
    pub min_proportion: f64,
    pub max_proportion: f64,
}

impl Default for SizingModel {
    fn default() -> Self {
        Self {
            buy_p: 0.2,
            sell_p: 0.2,
            skip_p: 0.2,
            min_proportion: 0.1,
            max_proportion: 0.5,
        }
    }
}

impl SizingModel {
    /// Buy/sell probabilities for the current return gap.
    ///
    /// The slack mass `1 - buy_p - sell_p - skip_p` is reassigned toward the
    /// direction that closes the gap: lagging the target inflates the buy
    /// probability, overshooting it inflates the sell probability. Zero
    /// denominators leave the base probabilities untouched.
    pub fn direction_weights(&self, target_return: f64, current_return: f64) -> (f64, f64) {
        let slack = 1.0 - self.buy_p - self.sell_p - self.skip_p;
        let delta = target_return - current_return;

        let mut buy = self.buy_p;
        let mut sell = self.sell_p;

        if delta >= 0.0 {
            if target_return.abs() > f64::EPSILON {
                buy += delta / target_return * slack;
            }
        } else if current_return.abs() > f64::EPSILON {
            sell -= delta / current_return * slack;
        }

        let buy = buy.clamp(0.0, 1.0);
        let sell = sell.clamp(0.0, 1.0 - buy);
        (buy, sell)
    }

    /// Draw a direction for the day
    pub fn decide<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        target_return: f64,
        current_return: f64,
    ) -> OrderAction {
        let (buy, sell) = self.direction_weights(target_return, current_return);
        let u: f64 = rng.gen();

        if u <= buy {
            OrderAction::Buy
        } else if u <= buy + sell {
            OrderAction::Sell
        } else {
            OrderAction::Skip
        }
    }

    /// Size a buy order against the scheduled asset return
    pub fn size_buy<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        target_return: f64,
        current_return: f64,
        asset_return: f64,
    ) -> OrderSizing {
        let delta = target_return - current_return;
        let denom = target_return.max(current_return);
        let span = self.max_proportion - self.min_proportion;

        let proportion = if denom.abs() > f64::EPSILON {
            (self.min_proportion + (delta / denom * span).max(0.0)).min(self.max_proportion)
        } else {
            self.min_proportion
        };

        let perturbed = asset_return * (1.0 + delta.signum() * 0.01 * exp_draw(rng, delta, denom));
        OrderSizing {
            proportion,
            perturbed_return: perturbed,
            price: limit_price(perturbed),
        }
    }

    /// Size a sell order against the scheduled asset return
    pub fn size_sell<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        target_return: f64,
        current_return: f64,
        asset_return: f64,
    ) -> OrderSizing {
        let delta = target_return - current_return;
        let denom = target_return.max(current_return);
        let span = self.max_proportion - self.min_proportion;

        let proportion = if denom.abs() > f64::EPSILON {
            (self.min_proportion - (delta / denom * span).min(0.0)).min(self.max_proportion)
        } else {
            self.min_proportion
        };

        let perturbed = asset_return * (1.0 - delta.signum() * 0.01 * exp_draw(rng, delta, denom));
        OrderSizing {
            proportion,
            perturbed_return: perturbed,
            price: limit_price(perturbed),
        }
    }
}

/// Exponential draw with mean `|delta / denom|`; zero mean short-circuits to zero
fn exp_draw<R: Rng + ?Sized>(rng: &mut R, delta: f64, denom: f64) -> f64 {
    if denom.abs() <= f64::EPSILON {
        return 0.0;
    }
    let mean = (delta / denom).abs();
    if mean <= f64::EPSILON {
        return 0.0;
    }
    match Exp::new(1.0 / mean) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0.0,
    }
}

/// Price implied by a return; guarded so a deep negative return cannot
/// produce a non-positive denominator
pub fn limit_price(rtrn: f64) -> f64 {
    let denom = (1.0 + rtrn).max(f64::EPSILON);
    1.0 / denom
}

/// Floor toward negative infinity at 4 decimal places, the wire precision
pub fn floor_4dp(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::new((value * 1e4).floor() as i64, 4)
}
