//! Post-hoc wealth reporting: JSON dump of every account's balance history
//! plus a rendered summary table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tabled::{Table, Tabled};
use uuid::Uuid;

use crate::error::Result;

/// Append-only balance history for one account; index 0 is the initial state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountHistory {
    pub money: Vec<Decimal>,
    pub assets: Vec<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WealthReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub days: u32,
    pub accounts: BTreeMap<String, AccountHistory>,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Money start")]
    money_start: Decimal,
    #[tabled(rename = "Money end")]
    money_end: Decimal,
    #[tabled(rename = "Assets start")]
    assets_start: Decimal,
    #[tabled(rename = "Assets end")]
    assets_end: Decimal,
    #[tabled(rename = "Wealth change")]
    wealth_change: Decimal,
}

impl WealthReport {
    pub fn new(days: u32) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            days,
            accounts: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, email: &str, money: Vec<Decimal>, assets: Vec<Decimal>) {
        self.accounts
            .insert(email.to_string(), AccountHistory { money, assets });
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// First-vs-last snapshot per account, rendered as a terminal table
    pub fn summary_table(&self) -> String {
        let rows: Vec<SummaryRow> = self
            .accounts
            .iter()
            .map(|(email, history)| {
                let money_start = history.money.first().copied().unwrap_or_default();
                let money_end = history.money.last().copied().unwrap_or_default();
                let assets_start = history.assets.first().copied().unwrap_or_default();
                let assets_end = history.assets.last().copied().unwrap_or_default();

                SummaryRow {
                    account: email.clone(),
                    money_start,
                    money_end,
                    assets_start,
                    assets_end,
                    wealth_change: (money_end + assets_end) - (money_start + assets_start),
                }
            })
            .collect();

        Table::new(rows).to_string()
    }
}
