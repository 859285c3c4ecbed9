use shopauth::{
    app,
    config::{validate_production_config, AppConfig, SessionConfig},
    db,
    repositories::SqliteUserRepository,
    services::{
        create_email_service, AuthService, EmailService, MailDispatcher, PasswordResetService,
        SystemClock, UserService,
    },
    AppState,
};

use std::sync::Arc;
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopauth=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    validate_production_config()?;
    let config = AppConfig::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let email_service: Arc<dyn EmailService> = Arc::from(create_email_service());
    let (mailer, _mail_worker) = MailDispatcher::spawn(email_service, config.mail_timeout);

    let user_repository = Arc::new(SqliteUserRepository::new(pool.clone()));

    let app_state = AppState {
        user_service: Arc::new(UserService::new(user_repository.clone())),
        auth_service: Arc::new(AuthService::new(user_repository.clone())),
        reset_service: Arc::new(PasswordResetService::new(
            user_repository,
            mailer.clone(),
            Arc::new(SystemClock),
            config.base_url.clone(),
        )),
        mailer,
    };

    let session_store = SqliteStore::new(pool.clone()).with_table_name("sessions")?;
    session_store.migrate().await?;
    let session_layer = SessionConfig::from_env().create_layer(session_store);

    let router = app::router(app_state, session_layer);

    let addr = config.socket_addr()?;
    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
