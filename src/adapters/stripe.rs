use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            error::BillingError,
            status::{PaymentStatus, PlanInterval},
            subscription::{OrderState, ProcessResult, SubscriptionState},
        },
        services::reconcile::{process_order_event, process_subscription_event},
    },
    axum::{Json, extract::State, http::HeaderMap},
    chrono::{DateTime, Utc},
};

pub const PROVIDER: &str = "stripe";

fn convert_status(status: stripe::SubscriptionStatus) -> PaymentStatus {
    #[allow(unreachable_patterns)]
    match status {
        stripe::SubscriptionStatus::Active => PaymentStatus::Active,
        stripe::SubscriptionStatus::Canceled => PaymentStatus::Canceled,
        stripe::SubscriptionStatus::Incomplete => PaymentStatus::Incomplete,
        stripe::SubscriptionStatus::IncompleteExpired => PaymentStatus::IncompleteExpired,
        stripe::SubscriptionStatus::PastDue => PaymentStatus::PastDue,
        stripe::SubscriptionStatus::Paused => PaymentStatus::Paused,
        stripe::SubscriptionStatus::Trialing => PaymentStatus::Trialing,
        stripe::SubscriptionStatus::Unpaid => PaymentStatus::Unpaid,
        other => {
            tracing::warn!(status = ?other, "unknown SubscriptionStatus, defaulting to active");
            PaymentStatus::Active
        }
    }
}

fn convert_interval(interval: stripe::RecurringInterval) -> Option<PlanInterval> {
    match interval {
        stripe::RecurringInterval::Month => Some(PlanInterval::Month),
        stripe::RecurringInterval::Year => Some(PlanInterval::Year),
        other => {
            tracing::warn!(interval = ?other, "unsupported recurring interval");
            None
        }
    }
}

fn ts(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

fn customer_id_of(e: &stripe::Expandable<stripe::Customer>) -> String {
    match e {
        stripe::Expandable::Id(id) => id.to_string(),
        stripe::Expandable::Object(c) => c.id.to_string(),
    }
}

fn payment_intent_id_of(e: &stripe::Expandable<stripe::PaymentIntent>) -> String {
    match e {
        stripe::Expandable::Id(id) => id.to_string(),
        stripe::Expandable::Object(pi) => pi.id.to_string(),
    }
}

/// Unlike Creem, Stripe carries the full status on the subscription
/// object, so no event-type hint is needed.
fn subscription_state(sub: &stripe::Subscription) -> Result<SubscriptionState, BillingError> {
    let first_item = sub.items.data.first();
    let price = first_item.and_then(|item| item.price.as_ref());
    let price_id = price
        .map(|p| p.id.to_string())
        .ok_or_else(|| BillingError::Payload("subscription has no price".into()))?;
    let interval = price
        .and_then(|p| p.recurring.as_ref())
        .and_then(|r| convert_interval(r.interval));

    Ok(SubscriptionState {
        provider: PROVIDER,
        subscription_id: sub.id.to_string(),
        customer_id: customer_id_of(&sub.customer),
        price_id,
        status: convert_status(sub.status),
        interval,
        period_start: ts(sub.current_period_start),
        period_end: ts(sub.current_period_end),
        trial_start: sub.trial_start.and_then(ts),
        trial_end: sub.trial_end.and_then(ts),
        canceled_at: sub.canceled_at.and_then(ts),
        metadata: serde_json::to_value(&sub.metadata)?,
    })
}

/// One-time purchases arrive as payment-mode checkout sessions. The
/// session's payment intent is the natural order identifier; sessions
/// don't expand line items in webhook payloads, so the price rides in
/// the session metadata.
fn order_state(session: &stripe::CheckoutSession) -> Result<OrderState, BillingError> {
    let customer_id = session
        .customer
        .as_ref()
        .map(customer_id_of)
        .ok_or_else(|| BillingError::Payload("checkout session has no customer".into()))?;

    let order_id = session
        .payment_intent
        .as_ref()
        .map(payment_intent_id_of)
        .unwrap_or_else(|| session.id.to_string());

    let metadata = serde_json::to_value(session.metadata.clone().unwrap_or_default())?;
    let price_id = metadata
        .get("price_id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let status = match session.payment_status {
        stripe::CheckoutSessionPaymentStatus::Paid
        | stripe::CheckoutSessionPaymentStatus::NoPaymentRequired => PaymentStatus::Active,
        stripe::CheckoutSessionPaymentStatus::Unpaid => PaymentStatus::Incomplete,
    };

    Ok(OrderState {
        provider: PROVIDER,
        order_id,
        customer_id,
        price_id,
        status,
        metadata,
    })
}

#[tracing::instrument(
    name = "stripe_webhook",
    skip_all,
    fields(event_id = tracing::field::Empty, event_type = tracing::field::Empty)
)]
pub async fn stripe_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sig = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| BillingError::Signature("missing Stripe-Signature header".into()))?;

    let event = stripe::Webhook::construct_event(&body, sig, &state.stripe_webhook_secret)
        .map_err(|e| BillingError::Signature(e.to_string()))?;

    let event_id = event.id.to_string();
    let event_type = event.type_.to_string();
    let raw_event: serde_json::Value =
        serde_json::from_str(&body).map_err(BillingError::from)?;

    tracing::Span::current()
        .record("event_id", tracing::field::display(&event_id))
        .record("event_type", tracing::field::display(&event_type));

    let result = match event.type_ {
        stripe::EventType::CustomerSubscriptionCreated
        | stripe::EventType::CustomerSubscriptionUpdated
        | stripe::EventType::CustomerSubscriptionDeleted => {
            let stripe::EventObject::Subscription(ref sub) = event.data.object else {
                return Err(BillingError::Payload(format!(
                    "{event_type} did not carry a subscription object"
                ))
                .into());
            };
            let sub_state = subscription_state(sub)?;
            process_subscription_event(&state.pool, &sub_state, &event_id, &event_type, &raw_event)
                .await?
        }
        stripe::EventType::CheckoutSessionCompleted => {
            let stripe::EventObject::CheckoutSession(ref session) = event.data.object else {
                return Err(BillingError::Payload(format!(
                    "{event_type} did not carry a checkout session"
                ))
                .into());
            };
            if session.mode != stripe::CheckoutSessionMode::Payment {
                // Subscription checkouts reconcile through the
                // customer.subscription.* events.
                tracing::info!(session_id = %session.id, mode = ?session.mode, "non-payment checkout, nothing to reconcile");
                return Ok(Json(serde_json::json!({"status": "ignored"})));
            }
            let order = order_state(session)?;
            process_order_event(&state.pool, &order, &event_id, &event_type, &raw_event).await?
        }
        other => {
            return Err(BillingError::UnsupportedEvent(other.to_string()).into());
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
