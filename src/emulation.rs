//! The day loop: one sequential pass per simulated day, driving the bank
//! offer and every participant's action against the exchange, then syncing
//! balances back for reporting.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::{ApiConfig, EmulationConfig};
use crate::domain::{Bank, OrderTicket, Participant};
use crate::error::Result;
use crate::exchange::ExchangeApi;
use crate::report::WealthReport;
use crate::tokens::TokenCache;

/// Scheduled asset return for a given day: starts at `year_return` scaled to
/// the run horizon and decays linearly to zero across the run
pub fn daily_return(days: u32, year_return: f64, day: u32) -> f64 {
    let horizon = days as f64;
    (horizon / 365.0) * (year_return - year_return / horizon * day as f64)
}

/// Build the synthetic population from the configured distributions
pub fn spawn_participants(
    rng: &mut StdRng,
    api: &ApiConfig,
    emulation: &EmulationConfig,
) -> Vec<Participant> {
    // Target returns are quoted annualized; scale to the run horizon
    let mean_target = emulation.mean_target_return * emulation.days as f64 / 365.0;
    let model = emulation.sizing_model();

    (0..emulation.participants)
        .map(|i| {
            let email = format!("{}{}@{}", api.email_prefix, i, api.email_domain);
            let mut participant = Participant::sample(
                rng,
                email,
                api.password.clone(),
                mean_target,
                emulation.mean_money,
            );
            participant.model = model;
            participant
        })
        .collect()
}

pub struct Emulation<E> {
    client: E,
    bank: Bank,
    participants: Vec<Participant>,
    instrument_id: u64,
    days: u32,
    year_return: f64,
    order_ttl_days: u32,
    rng: StdRng,
}

impl<E: ExchangeApi> Emulation<E> {
    pub fn new(
        client: E,
        bank: Bank,
        participants: Vec<Participant>,
        instrument_id: u64,
        emulation: &EmulationConfig,
    ) -> Self {
        let rng = match emulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            client,
            bank,
            participants,
            instrument_id,
            days: emulation.days,
            year_return: emulation.year_return,
            order_ttl_days: emulation.order_ttl_days,
            rng,
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    /// Fill tokens from the cache; returns false when any account is missing
    pub fn adopt_tokens(&mut self, cache: &TokenCache) -> bool {
        let mut complete = true;

        for participant in &mut self.participants {
            match cache.get(&participant.email) {
                Some(token) => participant.token = Some(token.to_string()),
                None => complete = false,
            }
        }
        match cache.get(&self.bank.email) {
            Some(token) => self.bank.token = Some(token.to_string()),
            None => complete = false,
        }

        complete
    }

    pub fn export_tokens(&self, cache: &mut TokenCache) {
        for participant in &self.participants {
            if let Some(token) = &participant.token {
                cache.insert(participant.email.clone(), token.clone());
            }
        }
        if let Some(token) = &self.bank.token {
            cache.insert(self.bank.email.clone(), token.clone());
        }
    }

    /// Exchange credentials for fresh tokens on every account
    pub async fn authenticate(&mut self) -> Result<()> {
        for participant in &mut self.participants {
            let token = self
                .client
                .obtain_token(&participant.email, &participant.password)
                .await?;
            participant.token = Some(token);
        }

        let token = self
            .client
            .obtain_token(&self.bank.email, &self.bank.password)
            .await?;
        self.bank.token = Some(token);

        info!(
            accounts = self.participants.len() + 1,
            "authenticated all accounts"
        );
        Ok(())
    }

    /// Create a fresh tradable instrument under the bank account
    pub async fn create_instrument(&self, name: &str) -> Result<u64> {
        self.client
            .create_instrument(self.bank.token()?, name)
            .await
    }

    pub fn set_instrument(&mut self, instrument_id: u64) {
        self.instrument_id = instrument_id;
    }

    /// Register every account with the exchange
    pub async fn create_accounts(&self) -> Result<()> {
        for participant in &self.participants {
            self.client
                .create_user(&participant.email, &participant.password)
                .await?;
        }
        self.client
            .create_user(&self.bank.email, &self.bank.password)
            .await?;
        Ok(())
    }

    /// Push the drawn starting balances to the exchange
    pub async fn push_initial_balances(&self) -> Result<()> {
        for participant in &self.participants {
            let token = participant.token()?.to_string();
            self.push_account(&token, participant.money, participant.assets)
                .await?;
        }

        let token = self.bank.token()?.to_string();
        self.push_account(&token, self.bank.money, self.bank.assets)
            .await?;
        Ok(())
    }

    async fn push_account(&self, token: &str, money: Decimal, assets: Decimal) -> Result<()> {
        let record = self
            .client
            .instrument_balance(token, self.instrument_id)
            .await?;
        self.client
            .set_instrument_balance(token, record.id, assets)
            .await?;

        let record = self.client.fiat_balance(token).await?;
        self.client.set_fiat_balance(token, record.id, money).await?;
        Ok(())
    }

    /// Run the full emulation and collect the wealth report
    pub async fn run(&mut self) -> Result<WealthReport> {
        for day in 0..self.days {
            self.run_day(day).await?;
        }

        let mut report = WealthReport::new(self.days);
        for participant in &self.participants {
            report.record(
                &participant.email,
                participant.money_history.clone(),
                participant.assets_history.clone(),
            );
        }
        report.record(
            &self.bank.email,
            self.bank.money_history.clone(),
            self.bank.assets_history.clone(),
        );

        Ok(report)
    }

    async fn run_day(&mut self, day: u32) -> Result<()> {
        let asset_return = daily_return(self.days, self.year_return, day);
        info!(day, asset_return, "trading day");

        // Clear yesterday's resting liquidity before re-quoting
        self.client
            .delete_all_orders(self.bank.token()?)
            .await?;

        if self.bank.has_inventory() {
            // The bank asks for a 10% premium over the scheduled return
            let request = self
                .bank
                .offer(1.1 * asset_return, self.instrument_id, self.order_ttl_days);
            let ticket = self
                .client
                .submit_order(self.bank.token()?, &request)
                .await?;
            info!(account = %self.bank.email, %ticket, "bank order");
        }

        let mut order: Vec<usize> = (0..self.participants.len()).collect();
        order.shuffle(&mut self.rng);

        for index in order {
            let request = self.participants[index].plan(
                &mut self.rng,
                asset_return,
                self.instrument_id,
                self.order_ttl_days,
            );

            let ticket = match request {
                Some(request) => {
                    self.client
                        .submit_order(self.participants[index].token()?, &request)
                        .await?
                }
                None => OrderTicket::skip(),
            };
            info!(account = %self.participants[index].email, %ticket, "participant order");
        }

        self.refresh_balances().await
    }

    /// Sync balances back from the exchange and log the aggregates
    async fn refresh_balances(&mut self) -> Result<()> {
        let mut total_money = Decimal::ZERO;
        let mut total_assets = Decimal::ZERO;

        for participant in &mut self.participants {
            let token = participant.token()?.to_string();
            let fiat = self.client.fiat_balance(&token).await?;
            let holdings = self
                .client
                .instrument_balance(&token, self.instrument_id)
                .await?;

            participant.record_balances(fiat.amount, holdings.amount);
            total_money += fiat.amount;
            total_assets += holdings.amount;

            debug!(
                account = %participant.email,
                money = %participant.money,
                assets = %participant.assets,
                target_return = participant.target_return,
                current_return = participant.current_return,
                "participant balances"
            );
        }

        let token = self.bank.token()?.to_string();
        let fiat = self.client.fiat_balance(&token).await?;
        let holdings = self
            .client
            .instrument_balance(&token, self.instrument_id)
            .await?;
        self.bank.record_balances(fiat.amount, holdings.amount);
        total_money += fiat.amount;
        total_assets += holdings.amount;

        info!(
            bank_money = %self.bank.money,
            bank_assets = %self.bank.assets,
            total_money = %total_money,
            total_assets = %total_assets,
            "end of day balances"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::domain::OrderRequest;
    use crate::exchange::{BalanceRecord, MockExchangeApi};
    use crate::model::SizingModel;
    use rust_decimal_macros::dec;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default_config("http://localhost:8000/", true);
        config.emulation.days = 2;
        config.emulation.participants = 2;
        config.emulation.seed = Some(42);
        config
    }

    fn echo_ticket(request: &OrderRequest) -> OrderTicket {
        OrderTicket {
            kind: request.side.to_string(),
            remaining_sum: request.total_sum,
            price: request.price,
            status: 0,
        }
    }

    fn build_emulation(client: MockExchangeApi) -> Emulation<MockExchangeApi> {
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(7);
        let mut participants = spawn_participants(&mut rng, &config.api, &config.emulation);
        for participant in &mut participants {
            participant.token = Some(format!("jwt-{}", participant.email));
        }

        let mut bank = Bank::new(
            config.api.bank_email.clone(),
            config.api.password.clone(),
            dec!(800),
        );
        bank.token = Some("jwt-bank".to_string());

        Emulation::new(client, bank, participants, 17, &config.emulation)
    }

    #[test]
    fn daily_return_decays_linearly_to_zero() {
        let first = daily_return(50, 0.15, 0);
        let last = daily_return(50, 0.15, 49);

        assert!((first - 50.0 / 365.0 * 0.15).abs() < 1e-12);
        assert!(last > 0.0 && last < first);
        // One step past the horizon the schedule hits exactly zero
        assert!(daily_return(50, 0.15, 50).abs() < 1e-12);
    }

    #[test]
    fn spawned_population_uses_the_configured_sizing_parameters() {
        let mut config = test_config();
        config.emulation.buy_p = 0.35;
        config.emulation.max_proportion = 0.25;

        let mut rng = StdRng::seed_from_u64(1);
        let participants = spawn_participants(&mut rng, &config.api, &config.emulation);
        for participant in &participants {
            assert!((participant.model.buy_p - 0.35).abs() < 1e-12);
            assert!((participant.model.max_proportion - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn spawned_population_has_distinct_emails() {
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(1);
        let participants = spawn_participants(&mut rng, &config.api, &config.emulation);

        assert_eq!(participants.len(), 2);
        assert_eq!(participants[0].email, "1bot0@mail.ru");
        assert_eq!(participants[1].email, "1bot1@mail.ru");
        assert_ne!(
            participants[0].target_return,
            participants[1].target_return
        );
    }

    #[test]
    fn token_cache_round_trips_through_the_emulation() {
        let mut emulation = build_emulation(MockExchangeApi::new());
        let mut cache = TokenCache::default();
        emulation.export_tokens(&mut cache);
        assert_eq!(cache.len(), 3);

        let mut fresh = build_emulation(MockExchangeApi::new());
        for participant in &mut fresh.participants {
            participant.token = None;
        }
        fresh.bank.token = None;
        assert!(fresh.adopt_tokens(&cache));
        assert!(fresh.bank.token.is_some());
    }

    #[test]
    fn adopt_tokens_reports_missing_accounts() {
        let mut emulation = build_emulation(MockExchangeApi::new());
        let cache = TokenCache::default();
        assert!(!emulation.adopt_tokens(&cache));
    }

    #[tokio::test]
    async fn day_loop_syncs_every_account_and_builds_the_report() {
        let mut mock = MockExchangeApi::new();

        // One cancel per day for the bank
        mock.expect_delete_all_orders().times(2).returning(|_| Ok(()));
        // Bank order every day, participant orders only when not skipping
        mock.expect_submit_order()
            .returning(|_, request| Ok(echo_ticket(request)));
        mock.expect_fiat_balance()
            .returning(|_| Ok(BalanceRecord { id: 1, amount: dec!(90) }));
        mock.expect_instrument_balance()
            .returning(|_, _| Ok(BalanceRecord { id: 2, amount: dec!(5) }));

        let mut emulation = build_emulation(mock);
        let report = emulation.run().await.unwrap();

        // 2 participants + the bank, with initial + 2 daily snapshots each
        assert_eq!(report.accounts.len(), 3);
        for history in report.accounts.values() {
            assert_eq!(history.money.len(), 3);
            assert_eq!(history.assets.len(), 3);
        }
        for participant in emulation.participants() {
            assert_eq!(participant.money, dec!(90));
            assert_eq!(participant.assets, dec!(5));
        }
        assert_eq!(emulation.bank().money, dec!(90));
    }

    #[tokio::test]
    async fn skipping_participants_never_reach_the_exchange() {
        let mut mock = MockExchangeApi::new();

        mock.expect_delete_all_orders().times(2).returning(|_| Ok(()));
        // With every participant forced to skip, only the bank's daily
        // offer may hit the order endpoint
        mock.expect_submit_order()
            .times(2)
            .returning(|_, request| Ok(echo_ticket(request)));
        mock.expect_fiat_balance()
            .returning(|_| Ok(BalanceRecord { id: 1, amount: dec!(90) }));
        mock.expect_instrument_balance()
            .returning(|_, _| Ok(BalanceRecord { id: 2, amount: dec!(5) }));

        let mut emulation = build_emulation(mock);
        for participant in &mut emulation.participants {
            participant.model = SizingModel {
                buy_p: 0.0,
                sell_p: 0.0,
                skip_p: 1.0,
                ..SizingModel::default()
            };
        }

        let report = emulation.run().await.unwrap();
        assert_eq!(report.accounts.len(), 3);
    }

    #[tokio::test]
    async fn seeding_pushes_balances_for_every_account() {
        let mut mock = MockExchangeApi::new();

        // 3 accounts, one instrument + one fiat read/write each
        mock.expect_instrument_balance()
            .times(3)
            .returning(|_, _| Ok(BalanceRecord { id: 2, amount: dec!(0) }));
        mock.expect_set_instrument_balance()
            .times(3)
            .returning(|_, _, _| Ok(()));
        mock.expect_fiat_balance()
            .times(3)
            .returning(|_| Ok(BalanceRecord { id: 1, amount: dec!(0) }));
        mock.expect_set_fiat_balance()
            .times(3)
            .returning(|_, _, _| Ok(()));

        let emulation = build_emulation(mock);
        emulation.push_initial_balances().await.unwrap();
    }

    #[tokio::test]
    async fn authenticate_fills_every_token() {
        let mut mock = MockExchangeApi::new();
        mock.expect_obtain_token()
            .times(3)
            .returning(|email, _| Ok(format!("jwt-{}", email)));

        let mut emulation = build_emulation(mock);
        for participant in &mut emulation.participants {
            participant.token = None;
        }
        emulation.bank.token = None;

        emulation.authenticate().await.unwrap();
        assert!(emulation.participants().iter().all(|p| p.token.is_some()));
        assert_eq!(emulation.bank().token.as_deref(), Some("jwt-bank1@mail.ru"));
    }
}
