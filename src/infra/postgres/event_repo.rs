use {super::PgTx, crate::domain::error::BillingError};

/// Record a delivered provider event. Returns false when the
/// `(provider, event_id)` pair was already seen — the caller treats that
/// as an exact redelivery and short-circuits.
pub async fn insert_event(
    tx: &mut PgTx<'_>,
    provider: &str,
    event_id: &str,
    object_id: &str,
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<bool, BillingError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO webhook_events (provider, event_id, object_id, event_type, payload)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (provider, event_id) DO NOTHING
        RETURNING true
        "#,
    )
    .bind(provider)
    .bind(event_id)
    .bind(object_id)
    .bind(event_type)
    .bind(payload)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(inserted.is_some())
}
