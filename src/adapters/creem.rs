use {
    crate::{
        AppState,
        adapters::{api_errors::ApiError, signature},
        domain::{
            error::BillingError,
            status::{PaymentStatus, PaymentType, PlanInterval},
            subscription::{OrderState, ProcessResult, SubscriptionState},
        },
        services::reconcile::{process_order_event, process_subscription_event},
    },
    axum::{Json, extract::State, http::HeaderMap},
    chrono::{DateTime, Utc},
    serde::Deserialize,
};

pub const PROVIDER: &str = "creem";

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum CreemEventType {
    #[display("checkout.completed")]
    CheckoutCompleted,
    #[display("subscription.active")]
    SubscriptionActive,
    #[display("subscription.paid")]
    SubscriptionPaid,
    #[display("subscription.trialing")]
    SubscriptionTrialing,
    #[display("subscription.unpaid")]
    SubscriptionUnpaid,
    #[display("subscription.canceled")]
    SubscriptionCanceled,
    #[display("subscription.expired")]
    SubscriptionExpired,
    #[display("subscription.update")]
    SubscriptionUpdate,
}

impl CreemEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutCompleted => "checkout.completed",
            Self::SubscriptionActive => "subscription.active",
            Self::SubscriptionPaid => "subscription.paid",
            Self::SubscriptionTrialing => "subscription.trialing",
            Self::SubscriptionUnpaid => "subscription.unpaid",
            Self::SubscriptionCanceled => "subscription.canceled",
            Self::SubscriptionExpired => "subscription.expired",
            Self::SubscriptionUpdate => "subscription.update",
        }
    }
}

impl TryFrom<&str> for CreemEventType {
    type Error = BillingError;

    // New provider event types must surface as loud failures requiring a
    // code change, never as silent data loss.
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "checkout.completed" => Ok(Self::CheckoutCompleted),
            "subscription.active" => Ok(Self::SubscriptionActive),
            "subscription.paid" => Ok(Self::SubscriptionPaid),
            "subscription.trialing" => Ok(Self::SubscriptionTrialing),
            "subscription.unpaid" => Ok(Self::SubscriptionUnpaid),
            "subscription.canceled" => Ok(Self::SubscriptionCanceled),
            "subscription.expired" => Ok(Self::SubscriptionExpired),
            "subscription.update" => Ok(Self::SubscriptionUpdate),
            other => Err(BillingError::UnsupportedEvent(other.to_string())),
        }
    }
}

/// Wire envelope: `{id, eventType, object, mode}`.
#[derive(Debug, Deserialize)]
pub struct CreemEnvelope {
    pub id: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    pub object: serde_json::Value,
    #[serde(default)]
    pub mode: Option<String>,
}

/// Creem nests related objects either fully expanded or as a bare ID.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaybeExpanded<T> {
    Object(T),
    Id(String),
}

pub trait CreemObject {
    fn object_id(&self) -> &str;
}

impl<T: CreemObject> MaybeExpanded<T> {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Object(obj) => obj.object_id(),
        }
    }

    pub fn expanded(&self) -> Option<&T> {
        match self {
            Self::Object(obj) => Some(obj),
            Self::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreemProduct {
    pub id: String,
    #[serde(default)]
    pub billing_type: Option<String>,
    #[serde(default)]
    pub billing_period: Option<String>,
}

impl CreemObject for CreemProduct {
    fn object_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreemCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl CreemObject for CreemCustomer {
    fn object_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreemSubscription {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    pub product: MaybeExpanded<CreemProduct>,
    pub customer: MaybeExpanded<CreemCustomer>,
    #[serde(default)]
    pub current_period_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_period_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trial_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trial_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl CreemObject for CreemSubscription {
    fn object_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreemOrder {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub order_type: Option<String>,
    #[serde(default)]
    pub customer: Option<MaybeExpanded<CreemCustomer>>,
    #[serde(default)]
    pub product: Option<MaybeExpanded<CreemProduct>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreemCheckout {
    pub id: String,
    #[serde(default)]
    pub order: Option<CreemOrder>,
    #[serde(default)]
    pub customer: Option<MaybeExpanded<CreemCustomer>>,
    #[serde(default)]
    pub product: Option<MaybeExpanded<CreemProduct>>,
    #[serde(default)]
    pub subscription: Option<MaybeExpanded<CreemSubscription>>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

pub fn parse_envelope(raw_body: &str) -> Result<(CreemEnvelope, CreemEventType), BillingError> {
    let envelope: CreemEnvelope =
        serde_json::from_str(raw_body).map_err(|e| BillingError::Payload(e.to_string()))?;
    let event_type = CreemEventType::try_from(envelope.event_type.as_str())?;
    Ok((envelope, event_type))
}

fn payload<T: for<'de> Deserialize<'de>>(object: &serde_json::Value) -> Result<T, BillingError> {
    serde_json::from_value(object.clone()).map_err(|e| BillingError::Payload(e.to_string()))
}

/// Flatten a Creem subscription object into the canonical snapshot. The
/// event type is passed through as the status hint — it outranks the
/// object's 3-value status field.
pub fn subscription_state(
    sub: &CreemSubscription,
    event_hint: Option<&str>,
) -> SubscriptionState {
    let status = PaymentStatus::from_creem(sub.status.as_deref().unwrap_or(""), event_hint);
    let interval = sub
        .product
        .expanded()
        .and_then(|p| p.billing_period.as_deref())
        .and_then(PlanInterval::parse);

    SubscriptionState {
        provider: PROVIDER,
        subscription_id: sub.id.clone(),
        customer_id: sub.customer.id().to_string(),
        price_id: sub.product.id().to_string(),
        status,
        interval,
        period_start: sub.current_period_start_date,
        period_end: sub.current_period_end_date,
        trial_start: sub.trial_start_date,
        trial_end: sub.trial_end_date,
        canceled_at: sub.canceled_at,
        metadata: sub.metadata.clone(),
    }
}

/// A completed checkout with a one-time order becomes an `OrderState`.
/// Checkout metadata (user_id, product_type, credits) rides along so the
/// reconciler can resolve the user and grant purchased credits.
pub fn order_state(checkout: &CreemCheckout) -> Result<Option<OrderState>, BillingError> {
    let Some(order) = &checkout.order else {
        return Ok(None);
    };

    let order_kind = order
        .order_type
        .as_deref()
        .map(PaymentType::from_billing_type)
        .unwrap_or(PaymentType::OneTime);
    if order_kind != PaymentType::OneTime {
        return Ok(None);
    }

    let customer_id = order
        .customer
        .as_ref()
        .or(checkout.customer.as_ref())
        .map(|c| c.id().to_string())
        .ok_or_else(|| BillingError::Payload("checkout has no customer".into()))?;
    let price_id = order
        .product
        .as_ref()
        .or(checkout.product.as_ref())
        .map(|p| p.id().to_string())
        .ok_or_else(|| BillingError::Payload("checkout has no product".into()))?;

    Ok(Some(OrderState {
        provider: PROVIDER,
        order_id: order.id.clone(),
        customer_id,
        price_id,
        status: PaymentStatus::from_creem(order.status.as_deref().unwrap_or("paid"), None),
        metadata: checkout.metadata.clone(),
    }))
}

#[tracing::instrument(
    name = "creem_webhook",
    skip_all,
    fields(event_id = tracing::field::Empty, event_type = tracing::field::Empty)
)]
pub async fn creem_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sig = headers
        .get("creem-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| BillingError::Signature("missing creem-signature header".into()))?;
    signature::verify(&body, sig, &state.creem_webhook_secret)?;

    let (envelope, event_type) = parse_envelope(&body)?;

    tracing::Span::current()
        .record("event_id", tracing::field::display(&envelope.id))
        .record("event_type", tracing::field::display(&event_type));

    let result = match event_type {
        CreemEventType::CheckoutCompleted => {
            let checkout: CreemCheckout = payload(&envelope.object)?;

            if let Some(order) = order_state(&checkout)? {
                process_order_event(&state.pool, &order, &envelope.id, event_type.as_str(), &envelope.object)
                    .await?
            } else if let Some(sub) = checkout.subscription.as_ref().and_then(|s| s.expanded()) {
                // Subscription checkouts also emit subscription.* events;
                // reconciling here just gets the row in place sooner.
                let mut sub_state = subscription_state(sub, None);
                if sub_state.metadata.is_null() || sub_state.metadata == serde_json::json!({}) {
                    sub_state.metadata = checkout.metadata.clone();
                }
                process_subscription_event(
                    &state.pool,
                    &sub_state,
                    &envelope.id,
                    event_type.as_str(),
                    &envelope.object,
                )
                .await?
            } else {
                tracing::info!(checkout_id = %checkout.id, "checkout carried nothing to reconcile");
                return Ok(Json(serde_json::json!({"status": "ignored"})));
            }
        }
        _ => {
            let sub: CreemSubscription = payload(&envelope.object)?;
            let sub_state = subscription_state(&sub, Some(event_type.as_str()));
            process_subscription_event(
                &state.pool,
                &sub_state,
                &envelope.id,
                event_type.as_str(),
                &envelope.object,
            )
            .await?
        }
    };

    match result {
        ProcessResult::Created(id) => {
            tracing::info!(payment_id = %id, "payment created");
            Ok(Json(serde_json::json!({"status": "created"})))
        }
        ProcessResult::Updated(id) => {
            tracing::info!(payment_id = %id, "payment updated");
            Ok(Json(serde_json::json!({"status": "updated"})))
        }
        ProcessResult::Duplicate => {
            tracing::info!("duplicate event, already processed");
            Ok(Json(serde_json::json!({"status": "duplicate"})))
        }
    }
}
