//! Reqwest-backed client for the exchange REST API.
//!
//! The API is consumed, not designed, here: user creation, JWT token auth,
//! balance get/put and order create/delete are thin wrappers over the
//! endpoints. Dry-run mode keeps a tiny in-memory ledger so the day loop can
//! read back the balances it wrote without a server.

use async_trait::async_trait;
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::domain::{OrderRequest, OrderTicket};
use crate::error::{Result, StampedeError};

use super::traits::{BalanceRecord, ExchangeApi};

#[derive(Debug, Default)]
struct DryRunLedger {
    fiat: HashMap<String, Decimal>,
    assets: HashMap<String, Decimal>,
}

pub struct RestExchangeClient {
    http: Client,
    base_url: String,
    dry_run: bool,
    ledger: Mutex<DryRunLedger>,
}

impl RestExchangeClient {
    pub fn new(base_url: &str, timeout_secs: u64, dry_run: bool) -> Result<Self> {
        let http = Client::builder()
            .user_agent("stampede/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StampedeError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            dry_run,
            ledger: Mutex::new(DryRunLedger::default()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        let mut req = self.http.request(method.clone(), &url);

        if let Some(query) = query {
            req = req.query(query);
        }

        if let Some(token) = token {
            req = req.header("Authorization", format!("JWT {}", token));
        }

        if let Some(body) = body {
            req = req.json(&body);
        }

        debug!(%method, path, "exchange request");
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(StampedeError::Api {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| StampedeError::Internal(format!("invalid JSON response: {}", e)))
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, DryRunLedger> {
        // A poisoned lock only happens after a panic in another test thread
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn parse_amount(value: &Value) -> Decimal {
        match value {
            Value::String(s) => Decimal::from_str_exact(s.trim()).unwrap_or_default(),
            Value::Number(n) => Decimal::from_str_exact(&n.to_string()).unwrap_or_default(),
            _ => Decimal::ZERO,
        }
    }

    fn parse_record(value: &Value) -> Result<BalanceRecord> {
        let id = value
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| StampedeError::Internal("balance record without id".to_string()))?;
        let amount = value
            .get("amount")
            .map(Self::parse_amount)
            .unwrap_or_default();

        Ok(BalanceRecord { id, amount })
    }
}

#[async_trait]
impl ExchangeApi for RestExchangeClient {
    async fn create_user(&self, email: &str, password: &str) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }

        self.request_json(
            Method::POST,
            "api/v1/user/create-user/",
            None,
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await?;
        Ok(())
    }

    async fn obtain_token(&self, email: &str, password: &str) -> Result<String> {
        if self.dry_run {
            return Ok(format!("dry-{}", email));
        }

        let value = self
            .request_json(
                Method::POST,
                "api/v1/user/api-token-auth/",
                None,
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await?;

        value
            .get("token")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| StampedeError::Auth(format!("no token issued for {}", email)))
    }

    async fn create_instrument(&self, token: &str, name: &str) -> Result<u64> {
        if self.dry_run {
            return Ok(1);
        }

        let value = self
            .request_json(
                Method::POST,
                "api/v1/user/instruments/",
                None,
                Some(token),
                Some(json!({ "name": name })),
            )
            .await?;

        value
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| StampedeError::Internal("instrument created without id".to_string()))
    }

    async fn delete_all_orders(&self, token: &str) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }

        self.request_json(
            Method::DELETE,
            "api/v1/user/orders/delete-all/",
            None,
            Some(token),
            None,
        )
        .await?;
        Ok(())
    }

    async fn fiat_balance(&self, token: &str) -> Result<BalanceRecord> {
        if self.dry_run {
            let amount = self.ledger().fiat.get(token).copied().unwrap_or_default();
            return Ok(BalanceRecord { id: 0, amount });
        }

        let value = self
            .request_json(
                Method::GET,
                "api/v1/user/fiat-balance/",
                None,
                Some(token),
                None,
            )
            .await?;

        Self::parse_record(&value)
    }

    async fn set_fiat_balance(&self, token: &str, record_id: u64, amount: Decimal) -> Result<()> {
        if self.dry_run {
            self.ledger().fiat.insert(token.to_string(), amount);
            return Ok(());
        }

        self.request_json(
            Method::PUT,
            &format!("api/v1/user/fiat-balance/{}", record_id),
            None,
            Some(token),
            Some(json!({ "amount": amount })),
        )
        .await?;
        Ok(())
    }

    async fn instrument_balance(&self, token: &str, instrument_id: u64) -> Result<BalanceRecord> {
        if self.dry_run {
            let amount = self.ledger().assets.get(token).copied().unwrap_or_default();
            return Ok(BalanceRecord { id: 0, amount });
        }

        let value = self
            .request_json(
                Method::GET,
                "api/v1/user/instrument-balance/",
                Some(&[("instrument_id", instrument_id.to_string())]),
                Some(token),
                None,
            )
            .await?;

        let first = value.as_array().and_then(|rows| rows.first()).ok_or_else(|| {
            StampedeError::Internal(format!(
                "no balance row for instrument {}",
                instrument_id
            ))
        })?;

        Self::parse_record(first)
    }

    async fn set_instrument_balance(
        &self,
        token: &str,
        record_id: u64,
        amount: Decimal,
    ) -> Result<()> {
        if self.dry_run {
            self.ledger().assets.insert(token.to_string(), amount);
            return Ok(());
        }

        self.request_json(
            Method::PUT,
            &format!("api/v1/user/instrument-balance/{}", record_id),
            None,
            Some(token),
            Some(json!({ "amount": amount })),
        )
        .await?;
        Ok(())
    }

    async fn submit_order(&self, token: &str, request: &OrderRequest) -> Result<OrderTicket> {
        if self.dry_run {
            return Ok(OrderTicket {
                kind: request.side.to_string(),
                remaining_sum: request.total_sum,
                price: request.price,
                status: 0,
            });
        }

        let value = self
            .request_json(
                Method::POST,
                "api/v1/user/orders/",
                None,
                Some(token),
                Some(serde_json::to_value(request)?),
            )
            .await?;

        serde_json::from_value(value)
            .map_err(|e| StampedeError::Internal(format!("malformed order response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use rust_decimal_macros::dec;

    fn dry_client() -> RestExchangeClient {
        RestExchangeClient::new("http://localhost:8000/", 5, true).unwrap()
    }

    #[test]
    fn base_url_is_normalized() {
        let client = dry_client();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert!(client.is_dry_run());
    }

    #[test]
    fn parse_record_accepts_string_and_numeric_amounts() {
        let record =
            RestExchangeClient::parse_record(&json!({ "id": 5, "amount": "12.5" })).unwrap();
        assert_eq!(record.id, 5);
        assert_eq!(record.amount, dec!(12.5));

        let record =
            RestExchangeClient::parse_record(&json!({ "id": 6, "amount": 3.25 })).unwrap();
        assert_eq!(record.amount, dec!(3.25));
    }

    #[test]
    fn parse_record_requires_an_id() {
        assert!(RestExchangeClient::parse_record(&json!({ "amount": 1 })).is_err());
    }

    #[tokio::test]
    async fn dry_run_ledger_reads_back_written_balances() {
        let client = dry_client();
        let token = client.obtain_token("bot0@mail.ru", "pw").await.unwrap();

        client
            .set_fiat_balance(&token, 0, dec!(100))
            .await
            .unwrap();
        client
            .set_instrument_balance(&token, 0, dec!(7))
            .await
            .unwrap();

        assert_eq!(client.fiat_balance(&token).await.unwrap().amount, dec!(100));
        assert_eq!(
            client.instrument_balance(&token, 17).await.unwrap().amount,
            dec!(7)
        );
    }

    #[tokio::test]
    async fn dry_run_order_echoes_the_request() {
        let client = dry_client();
        let request = OrderRequest::sell(dec!(0.9), dec!(50), 4, 17);
        let ticket = client.submit_order("t", &request).await.unwrap();

        assert_eq!(ticket.kind, "sell");
        assert_eq!(ticket.remaining_sum, dec!(50));
        assert_eq!(ticket.price, dec!(0.9));
        assert!(matches!(request.side, OrderSide::Sell));
    }
}
