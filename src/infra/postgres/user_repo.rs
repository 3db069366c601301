use {
    super::PgTx,
    crate::domain::error::BillingError,
    chrono::{DateTime, Utc},
};

fn customer_column(provider: &str) -> Result<&'static str, BillingError> {
    match provider {
        "creem" => Ok("creem_customer_id"),
        "stripe" => Ok("stripe_customer_id"),
        other => Err(BillingError::InvalidInput(format!(
            "unknown provider: {other}"
        ))),
    }
}

pub async fn exists(tx: &mut PgTx<'_>, user_id: &str) -> Result<bool, BillingError> {
    let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(found.is_some())
}

pub async fn find_id_by_customer(
    tx: &mut PgTx<'_>,
    provider: &str,
    customer_id: &str,
) -> Result<Option<String>, BillingError> {
    let column = customer_column(provider)?;
    let id: Option<String> =
        sqlx::query_scalar(&format!("SELECT id FROM users WHERE {column} = $1"))
            .bind(customer_id)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(id)
}

/// Store the provider customer ID on the user row if it isn't set yet.
/// First webhook for a signed-up user establishes the link.
pub async fn link_customer(
    tx: &mut PgTx<'_>,
    user_id: &str,
    provider: &str,
    customer_id: &str,
) -> Result<(), BillingError> {
    let column = customer_column(provider)?;
    sqlx::query(&format!(
        "UPDATE users SET {column} = $1, updated_at = now() WHERE id = $2 AND {column} IS NULL"
    ))
    .bind(customer_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Denormalized entitlement state: the current plan and its expiry,
/// driven by the subscription lifecycle.
pub async fn set_plan(
    tx: &mut PgTx<'_>,
    user_id: &str,
    plan_id: Option<&str>,
    plan_expires_at: Option<DateTime<Utc>>,
) -> Result<(), BillingError> {
    sqlx::query(
        "UPDATE users SET plan_id = $1, plan_expires_at = $2, updated_at = now() WHERE id = $3",
    )
    .bind(plan_id)
    .bind(plan_expires_at)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Current credits balance, locked for the rest of the transaction so
/// concurrent balance changes serialize.
pub async fn balance_for_update(
    tx: &mut PgTx<'_>,
    user_id: &str,
) -> Result<Option<i64>, BillingError> {
    let balance: Option<i64> =
        sqlx::query_scalar("SELECT credits FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(balance)
}

pub async fn set_balance(
    tx: &mut PgTx<'_>,
    user_id: &str,
    balance: i64,
) -> Result<(), BillingError> {
    sqlx::query("UPDATE users SET credits = $1, updated_at = now() WHERE id = $2")
        .bind(balance)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
