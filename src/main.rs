use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    billing_sync::adapters::{creem_client::CreemClient, stripe_client::StripeClient},
    sqlx::postgres::PgPoolOptions,
    std::{env, sync::Arc, time::Duration},
    tokio::signal,
    tower_http::timeout::TimeoutLayer,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let creem_webhook_secret =
        env::var("CREEM_WEBHOOK_SECRET").expect("CREEM_WEBHOOK_SECRET must be set");
    let creem_api_key = env::var("CREEM_API_KEY").expect("CREEM_API_KEY must be set");
    let creem_api_url = env::var("CREEM_API_URL").expect("CREEM_API_URL must be set");
    let stripe_secret_key = env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set");
    let stripe_webhook_secret =
        env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET must be set");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let state = billing_sync::AppState {
        pool,
        creem_webhook_secret: creem_webhook_secret.into(),
        stripe_webhook_secret: stripe_webhook_secret.into(),
        creem: Arc::new(CreemClient::new(creem_api_url, creem_api_key)),
        stripe: Arc::new(StripeClient::new(&stripe_secret_key)),
    };

    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/webhooks/creem",
            post(billing_sync::adapters::creem::creem_webhook_handler),
        )
        .route(
            "/webhooks/stripe",
            post(billing_sync::adapters::stripe::stripe_webhook_handler),
        )
        .layer(DefaultBodyLimit::max(64 * 1024)) // webhook payloads are typically <20 KB
        .layer(TimeoutLayer::new(Duration::from_secs(25)))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    tracing::info!("listening on 0.0.0.0:3000");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
