use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditDirection {
    Add,
    Subtract,
}

impl CreditDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
        }
    }
}

/// One append-only ledger row. Written in the same transaction as the
/// balance change it describes.
pub struct NewCreditEntry {
    pub id: Uuid,
    pub user_id: String,
    pub amount: i64,
    pub direction: CreditDirection,
    pub description: Option<String>,
    pub order_id: Option<String>,
    pub metadata: serde_json::Value,
}

impl NewCreditEntry {
    pub fn grant(user_id: &str, amount: i64, order_id: Option<&str>, description: Option<&str>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            amount,
            direction: CreditDirection::Add,
            description: description.map(str::to_string),
            order_id: order_id.map(str::to_string),
            metadata: serde_json::json!({}),
        }
    }

    pub fn debit(user_id: &str, amount: i64, description: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            amount,
            direction: CreditDirection::Subtract,
            description: Some(description.to_string()),
            order_id: None,
            metadata: serde_json::json!({}),
        }
    }
}
