pub mod cli;
pub mod config;
pub mod domain;
pub mod emulation;
pub mod error;
pub mod exchange;
pub mod model;
pub mod report;
pub mod tokens;

pub use config::AppConfig;
pub use domain::{Bank, OrderRequest, OrderSide, OrderTicket, Participant};
pub use emulation::{daily_return, spawn_participants, Emulation};
pub use error::{Result, StampedeError};
pub use exchange::{BalanceRecord, ExchangeApi, RestExchangeClient};
pub use model::{floor_4dp, limit_price, OrderAction, OrderSizing, SizingModel};
pub use report::{AccountHistory, WealthReport};
pub use tokens::TokenCache;
