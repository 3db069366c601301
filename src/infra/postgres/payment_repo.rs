use {
    super::PgTx,
    crate::domain::{error::BillingError, subscription::NewPayment},
    uuid::Uuid,
};

pub struct ExistingPayment {
    pub id: Uuid,
    pub status: String,
}

pub async fn find_by_subscription(
    tx: &mut PgTx<'_>,
    provider: &str,
    subscription_id: &str,
) -> Result<Option<ExistingPayment>, BillingError> {
    let row: Option<(Uuid, String)> = sqlx::query_as(
        "SELECT id, status FROM payments WHERE provider = $1 AND subscription_id = $2",
    )
    .bind(provider)
    .bind(subscription_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(|(id, status)| ExistingPayment { id, status }))
}

pub async fn find_by_order(
    tx: &mut PgTx<'_>,
    provider: &str,
    order_id: &str,
) -> Result<Option<Uuid>, BillingError> {
    let id: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM payments WHERE provider = $1 AND order_id = $2")
            .bind(provider)
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await?;

    Ok(id)
}

pub async fn insert(tx: &mut PgTx<'_>, payment: &NewPayment) -> Result<(), BillingError> {
    sqlx::query(
        r#"
        INSERT INTO payments
            (id, provider, payment_type, interval, price_id, user_id, customer_id,
             subscription_id, order_id, status, period_start, period_end,
             cancel_at_period_end, trial_start, trial_end, canceled_at, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(payment.id)
    .bind(payment.provider)
    .bind(payment.payment_type.as_str())
    .bind(payment.interval.map(|i| i.as_str()))
    .bind(&payment.price_id)
    .bind(&payment.user_id)
    .bind(&payment.customer_id)
    .bind(payment.subscription_id.as_deref())
    .bind(payment.order_id.as_deref())
    .bind(payment.status.as_str())
    .bind(payment.period_start)
    .bind(payment.period_end)
    .bind(payment.cancel_at_period_end)
    .bind(payment.trial_start)
    .bind(payment.trial_end)
    .bind(payment.canceled_at)
    .bind(&payment.metadata)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Update the mutable fields of an existing subscription row. Identity
/// fields (provider, subscription_id, user_id, customer_id) are never
/// touched after insert.
pub async fn update_subscription_fields(
    tx: &mut PgTx<'_>,
    id: Uuid,
    payment: &NewPayment,
) -> Result<(), BillingError> {
    sqlx::query(
        r#"
        UPDATE payments
        SET status = $1, interval = $2, price_id = $3,
            period_start = $4, period_end = $5, cancel_at_period_end = $6,
            trial_start = $7, trial_end = $8, canceled_at = $9,
            metadata = $10, updated_at = now()
        WHERE id = $11
        "#,
    )
    .bind(payment.status.as_str())
    .bind(payment.interval.map(|i| i.as_str()))
    .bind(&payment.price_id)
    .bind(payment.period_start)
    .bind(payment.period_end)
    .bind(payment.cancel_at_period_end)
    .bind(payment.trial_start)
    .bind(payment.trial_end)
    .bind(payment.canceled_at)
    .bind(&payment.metadata)
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn update_order_status(
    tx: &mut PgTx<'_>,
    id: Uuid,
    payment: &NewPayment,
) -> Result<(), BillingError> {
    sqlx::query(
        "UPDATE payments SET status = $1, metadata = $2, updated_at = now() WHERE id = $3",
    )
    .bind(payment.status.as_str())
    .bind(&payment.metadata)
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
