use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Limit order as submitted to the exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(rename = "type")]
    pub side: OrderSide,
    pub price: Decimal,
    pub total_sum: Decimal,
    pub expires_in: u32,
    pub instrument_id: u64,
}

impl OrderRequest {
    pub fn buy(price: Decimal, total_sum: Decimal, expires_in: u32, instrument_id: u64) -> Self {
        Self {
            side: OrderSide::Buy,
            price,
            total_sum,
            expires_in,
            instrument_id,
        }
    }

    pub fn sell(price: Decimal, total_sum: Decimal, expires_in: u32, instrument_id: u64) -> Self {
        Self {
            side: OrderSide::Sell,
            price,
            total_sum,
            expires_in,
            instrument_id,
        }
    }
}

/// Normalized outcome of one daily action, as echoed back by the exchange.
/// Skips never reach the wire and produce a zeroed ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTicket {
    #[serde(rename = "type", default = "skip_kind")]
    pub kind: String,
    #[serde(default)]
    pub remaining_sum: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub status: i64,
}

fn skip_kind() -> String {
    "skip".to_string()
}

impl OrderTicket {
    pub fn skip() -> Self {
        Self {
            kind: skip_kind(),
            remaining_sum: Decimal::ZERO,
            price: Decimal::ZERO,
            status: 0,
        }
    }

    pub fn is_skip(&self) -> bool {
        self.kind == "skip"
    }
}

impl std::fmt::Display for OrderTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} remaining={} price={} status={}",
            self.kind, self.remaining_sum, self.price, self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_side_serializes_to_wire_casing() {
        let request = OrderRequest::buy(dec!(0.9523), dec!(12.5), 4, 17);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["type"], "buy");
        assert_eq!(json["expires_in"], 4);
        assert_eq!(json["instrument_id"], 17);
    }

    #[test]
    fn ticket_deserializes_with_missing_fields() {
        let ticket: OrderTicket = serde_json::from_str(r#"{"type":"sell","status":1}"#).unwrap();
        assert_eq!(ticket.kind, "sell");
        assert_eq!(ticket.status, 1);
        assert_eq!(ticket.remaining_sum, Decimal::ZERO);
    }

    #[test]
    fn skip_ticket_is_zeroed() {
        let ticket = OrderTicket::skip();
        assert!(ticket.is_skip());
        assert_eq!(ticket.price, Decimal::ZERO);
    }
}
