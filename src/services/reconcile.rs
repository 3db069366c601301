use {
    crate::domain::{
        error::BillingError,
        status::PaymentStatus,
        subscription::{NewPayment, OrderState, ProcessResult, SubscriptionState},
    },
    crate::infra::postgres::{PgTx, credits_repo, event_repo, payment_repo, user_repo},
    sqlx::PgPool,
};

/// Resolution chain for the internal account behind a webhook event:
/// explicit `user_id` in the event metadata first, then the stored
/// provider customer ID. The webhook path never creates users — accounts
/// come from the signup flow only.
pub async fn resolve_user_id(
    tx: &mut PgTx<'_>,
    provider: &str,
    metadata: &serde_json::Value,
    customer_id: &str,
) -> Result<String, BillingError> {
    if let Some(user_id) = metadata.get("user_id").and_then(|v| v.as_str()) {
        if user_repo::exists(tx, user_id).await? {
            return Ok(user_id.to_string());
        }
        tracing::warn!(user_id, "metadata user_id does not exist, falling back to customer lookup");
    }

    user_repo::find_id_by_customer(tx, provider, customer_id)
        .await?
        .ok_or_else(|| BillingError::UserNotFound(customer_id.to_string()))
}

async fn begin_locked<'a>(
    pool: &PgPool,
    lock_key: &str,
) -> Result<PgTx<'a>, BillingError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;

    // Serialize all processing for this provider object. The advisory
    // lock holds even when the payment row doesn't exist yet, so
    // concurrent deliveries for the same subscription can't race the
    // find-then-act below.
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(lock_key)
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

/// Reconcile one subscription event: dedup, resolve the user, then
/// create or update the canonical payment row, all in one transaction.
/// Re-running with identical input is a no-op (`Duplicate`).
pub async fn process_subscription_event(
    pool: &PgPool,
    sub: &SubscriptionState,
    event_id: &str,
    event_type: &str,
    raw_payload: &serde_json::Value,
) -> Result<ProcessResult, BillingError> {
    let mut tx = begin_locked(pool, &sub.subscription_id).await?;

    let is_new = event_repo::insert_event(
        &mut tx,
        sub.provider,
        event_id,
        &sub.subscription_id,
        event_type,
        raw_payload,
    )
    .await?;

    if !is_new {
        tx.commit().await?;
        return Ok(ProcessResult::Duplicate);
    }

    let user_id = resolve_user_id(&mut tx, sub.provider, &sub.metadata, &sub.customer_id).await?;
    user_repo::link_customer(&mut tx, &user_id, sub.provider, &sub.customer_id).await?;

    let payment = NewPayment::from_subscription(sub, &user_id);
    let existing =
        payment_repo::find_by_subscription(&mut tx, sub.provider, &sub.subscription_id).await?;

    let result = match existing {
        None => {
            payment_repo::insert(&mut tx, &payment).await?;
            ProcessResult::Created(payment.id)
        }
        Some(row) => {
            let current = PaymentStatus::try_from(row.status.as_str())?;
            if current != sub.status && !current.can_transition_to(&sub.status) {
                // Last-write-wins: the update still lands, but the
                // lifecycle violation is visible in the logs.
                tracing::warn!(
                    subscription_id = %sub.subscription_id,
                    from = %current,
                    to = %sub.status,
                    "anomalous status transition"
                );
            }
            payment_repo::update_subscription_fields(&mut tx, row.id, &payment).await?;
            ProcessResult::Updated(row.id)
        }
    };

    sync_user_plan(&mut tx, &user_id, &payment).await?;

    tx.commit().await?;
    Ok(result)
}

/// Keep the denormalized plan columns on the user row in line with the
/// subscription: set while the subscription grants access, keep through
/// a grace period, clear on an immediate cancellation.
async fn sync_user_plan(
    tx: &mut PgTx<'_>,
    user_id: &str,
    payment: &NewPayment,
) -> Result<(), BillingError> {
    if payment.status.grants_access() {
        user_repo::set_plan(tx, user_id, Some(&payment.price_id), payment.period_end).await
    } else if payment.status == PaymentStatus::Canceled && !payment.cancel_at_period_end {
        user_repo::set_plan(tx, user_id, None, None).await
    } else {
        // Graceful cancellation: entitlement runs out at period_end,
        // which is already stored as plan_expires_at.
        Ok(())
    }
}

/// Reconcile a one-time order. Matching is by the dedicated
/// `(provider, order_id)` index; a replayed order never duplicates the
/// payment row or the credits grant.
pub async fn process_order_event(
    pool: &PgPool,
    order: &OrderState,
    event_id: &str,
    event_type: &str,
    raw_payload: &serde_json::Value,
) -> Result<ProcessResult, BillingError> {
    let mut tx = begin_locked(pool, &order.order_id).await?;

    let is_new = event_repo::insert_event(
        &mut tx,
        order.provider,
        event_id,
        &order.order_id,
        event_type,
        raw_payload,
    )
    .await?;

    if !is_new {
        tx.commit().await?;
        return Ok(ProcessResult::Duplicate);
    }

    let user_id =
        resolve_user_id(&mut tx, order.provider, &order.metadata, &order.customer_id).await?;
    user_repo::link_customer(&mut tx, &user_id, order.provider, &order.customer_id).await?;

    let payment = NewPayment::from_order(order, &user_id);
    let existing = payment_repo::find_by_order(&mut tx, order.provider, &order.order_id).await?;

    let result = match existing {
        Some(id) => {
            // Already reconciled under another event ID. Refresh the
            // snapshot fields; the credits were granted the first time.
            payment_repo::update_order_status(&mut tx, id, &payment).await?;
            ProcessResult::Updated(id)
        }
        None => {
            payment_repo::insert(&mut tx, &payment).await?;

            if let Some(credits) = order.credits_granted() {
                let balance = credits_repo::add_credits(
                    &mut tx,
                    &user_id,
                    credits,
                    Some(&order.order_id),
                    Some("credits purchase"),
                )
                .await?;
                tracing::info!(
                    user_id = %user_id,
                    credits,
                    balance,
                    order_id = %order.order_id,
                    "credits granted"
                );
            }

            ProcessResult::Created(payment.id)
        }
    };

    tx.commit().await?;
    Ok(result)
}
