use {
    super::status::{PaymentStatus, PlanInterval, PaymentType},
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

/// Provider-independent snapshot of one subscription, as extracted from a
/// webhook event. Adapters build this; the reconciler only ever sees
/// canonical values.
#[derive(Debug, Clone)]
pub struct SubscriptionState {
    pub provider: &'static str,
    pub subscription_id: String,
    pub customer_id: String,
    pub price_id: String,
    pub status: PaymentStatus,
    pub interval: Option<PlanInterval>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

impl SubscriptionState {
    /// `cancel_at_period_end` is derived, not copied from the provider:
    /// true only for a graceful cancellation, i.e. the subscription is
    /// canceled with a `canceled_at` at or before the current period end.
    /// A missing timestamp or one past the period end means the
    /// cancellation took effect immediately.
    pub fn cancel_at_period_end(&self) -> bool {
        if self.status != PaymentStatus::Canceled {
            return false;
        }
        match (self.canceled_at, self.period_end) {
            (Some(canceled_at), Some(period_end)) => canceled_at <= period_end,
            _ => false,
        }
    }
}

/// One-time purchase, normalized. `order_id` is the provider's own order
/// identifier (Creem order ID, Stripe payment intent).
#[derive(Debug, Clone)]
pub struct OrderState {
    pub provider: &'static str,
    pub order_id: String,
    pub customer_id: String,
    pub price_id: String,
    pub status: PaymentStatus,
    pub metadata: serde_json::Value,
}

impl OrderState {
    /// Credits attached to this purchase, when the checkout was for a
    /// credits pack (`metadata.product_type == "credits"`).
    pub fn credits_granted(&self) -> Option<i64> {
        if self.metadata.get("product_type").and_then(|v| v.as_str()) != Some("credits") {
            return None;
        }
        match self.metadata.get("credits") {
            Some(serde_json::Value::Number(n)) => n.as_i64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Outcome of one reconciled webhook event.
#[derive(Debug)]
pub enum ProcessResult {
    /// New payment row inserted.
    Created(Uuid),
    /// Existing payment row updated.
    Updated(Uuid),
    /// Event was already processed (exact redelivery).
    Duplicate,
}

/// Fields every payment row shares regardless of provider object type.
/// Subscription and order paths both flatten into this before hitting
/// the repo layer.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: Uuid,
    pub provider: &'static str,
    pub payment_type: PaymentType,
    pub interval: Option<PlanInterval>,
    pub price_id: String,
    pub user_id: String,
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub order_id: Option<String>,
    pub status: PaymentStatus,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

impl NewPayment {
    pub fn from_subscription(sub: &SubscriptionState, user_id: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            provider: sub.provider,
            payment_type: PaymentType::Subscription,
            interval: sub.interval,
            price_id: sub.price_id.clone(),
            user_id: user_id.to_string(),
            customer_id: sub.customer_id.clone(),
            subscription_id: Some(sub.subscription_id.clone()),
            order_id: None,
            status: sub.status,
            period_start: sub.period_start,
            period_end: sub.period_end,
            cancel_at_period_end: sub.cancel_at_period_end(),
            trial_start: sub.trial_start,
            trial_end: sub.trial_end,
            canceled_at: sub.canceled_at,
            metadata: sub.metadata.clone(),
        }
    }

    pub fn from_order(order: &OrderState, user_id: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            provider: order.provider,
            payment_type: PaymentType::OneTime,
            interval: None,
            price_id: order.price_id.clone(),
            user_id: user_id.to_string(),
            customer_id: order.customer_id.clone(),
            subscription_id: None,
            order_id: Some(order.order_id.clone()),
            status: order.status,
            period_start: None,
            period_end: None,
            cancel_at_period_end: false,
            trial_start: None,
            trial_end: None,
            canceled_at: None,
            metadata: order.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base_sub(status: PaymentStatus) -> SubscriptionState {
        SubscriptionState {
            provider: "creem",
            subscription_id: "sub_1".into(),
            customer_id: "cus_1".into(),
            price_id: "prod_1".into(),
            status,
            interval: Some(PlanInterval::Month),
            period_start: None,
            period_end: Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()),
            trial_start: None,
            trial_end: None,
            canceled_at: None,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn graceful_cancellation_sets_flag() {
        let mut sub = base_sub(PaymentStatus::Canceled);
        sub.canceled_at = Some(sub.period_end.unwrap() - Duration::days(1));
        assert!(sub.cancel_at_period_end());
    }

    #[test]
    fn late_cancellation_timestamp_is_immediate() {
        let mut sub = base_sub(PaymentStatus::Canceled);
        sub.canceled_at = Some(sub.period_end.unwrap() + Duration::days(1));
        assert!(!sub.cancel_at_period_end());
    }

    #[test]
    fn missing_canceled_at_is_immediate() {
        let sub = base_sub(PaymentStatus::Canceled);
        assert!(!sub.cancel_at_period_end());
    }

    #[test]
    fn non_canceled_status_never_sets_flag() {
        let mut sub = base_sub(PaymentStatus::Active);
        sub.canceled_at = Some(sub.period_end.unwrap() - Duration::days(1));
        assert!(!sub.cancel_at_period_end());
    }

    #[test]
    fn credits_granted_reads_metadata() {
        let order = OrderState {
            provider: "creem",
            order_id: "ord_1".into(),
            customer_id: "cus_1".into(),
            price_id: "prod_credits".into(),
            status: PaymentStatus::Active,
            metadata: serde_json::json!({"product_type": "credits", "credits": 500}),
        };
        assert_eq!(order.credits_granted(), Some(500));
    }

    #[test]
    fn credits_granted_handles_string_amounts() {
        let order = OrderState {
            provider: "creem",
            order_id: "ord_2".into(),
            customer_id: "cus_1".into(),
            price_id: "prod_credits".into(),
            status: PaymentStatus::Active,
            metadata: serde_json::json!({"product_type": "credits", "credits": "250"}),
        };
        assert_eq!(order.credits_granted(), Some(250));
    }

    #[test]
    fn no_credits_for_plain_orders() {
        let order = OrderState {
            provider: "creem",
            order_id: "ord_3".into(),
            customer_id: "cus_1".into(),
            price_id: "prod_ebook".into(),
            status: PaymentStatus::Active,
            metadata: serde_json::json!({"credits": 500}),
        };
        assert_eq!(order.credits_granted(), None);
    }
}
