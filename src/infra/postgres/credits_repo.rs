use {
    super::{PgTx, user_repo},
    crate::domain::{credits::NewCreditEntry, error::BillingError},
};

async fn insert_entry(tx: &mut PgTx<'_>, entry: &NewCreditEntry) -> Result<(), BillingError> {
    sqlx::query(
        r#"
        INSERT INTO credits_history (id, user_id, amount, direction, description, order_id, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.id)
    .bind(&entry.user_id)
    .bind(entry.amount)
    .bind(entry.direction.as_str())
    .bind(entry.description.as_deref())
    .bind(entry.order_id.as_deref())
    .bind(&entry.metadata)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn validate_amount(amount: i64) -> Result<(), BillingError> {
    if amount <= 0 {
        return Err(BillingError::InvalidInput(format!(
            "credit amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// Grant credits: bump the balance and append one ledger row, both on the
/// caller's transaction. Returns the new balance.
pub async fn add_credits(
    tx: &mut PgTx<'_>,
    user_id: &str,
    amount: i64,
    order_id: Option<&str>,
    description: Option<&str>,
) -> Result<i64, BillingError> {
    validate_amount(amount)?;

    let balance = user_repo::balance_for_update(tx, user_id)
        .await?
        .ok_or_else(|| BillingError::UserNotFound(user_id.to_string()))?;
    let new_balance = balance
        .checked_add(amount)
        .ok_or_else(|| BillingError::InvalidInput("credits balance overflow".into()))?;

    user_repo::set_balance(tx, user_id, new_balance).await?;
    insert_entry(tx, &NewCreditEntry::grant(user_id, amount, order_id, description)).await?;

    Ok(new_balance)
}

/// Consume credits. Fails with `InsufficientCredits` before any write
/// when the balance would go negative.
pub async fn use_credits(
    tx: &mut PgTx<'_>,
    user_id: &str,
    amount: i64,
    description: &str,
) -> Result<i64, BillingError> {
    validate_amount(amount)?;

    let balance = user_repo::balance_for_update(tx, user_id)
        .await?
        .ok_or_else(|| BillingError::UserNotFound(user_id.to_string()))?;

    if balance < amount {
        return Err(BillingError::InsufficientCredits {
            available: balance,
            requested: amount,
        });
    }

    let new_balance = balance - amount;
    user_repo::set_balance(tx, user_id, new_balance).await?;
    insert_entry(tx, &NewCreditEntry::debit(user_id, amount, description)).await?;

    Ok(new_balance)
}
