pub mod credits_repo;
pub mod event_repo;
pub mod payment_repo;
pub mod user_repo;

/// All repo functions run on the caller's transaction so one webhook
/// event commits or rolls back as a unit.
pub type PgTx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;
