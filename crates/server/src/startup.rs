use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use migration::MigratorTrait;
use tracing::info;

use configs::AppConfig;
use service::auth::repo::SeaOrmUserRepository;
use service::auth::{AmqpTransport, AuthConfig, AuthService, PasswordPolicy, TokenConfig, TokenService, UserRepository};
use service::clock::{Clock, SystemClock};
use service::storage::RedisStore;

use crate::routes;
use crate::state::{CookieSettings, ServerState};

fn load_bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

fn read_key(path: &str) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading key file {path}"))
}

/// Wire the production collaborators: Postgres, Redis, AMQP and the RSA key pair.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<ServerState> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    if cfg.database.run_migrations {
        migration::Migrator::up(&db, None).await.context("running migrations")?;
        info!("migrations applied");
    }

    let store = Arc::new(RedisStore::connect(&cfg.redis.url).await?);
    let transport = Arc::new(AmqpTransport::new(
        cfg.queue.url.clone(),
        cfg.queue.name.clone(),
        Duration::from_millis(cfg.queue.publish_timeout_ms),
    ));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let a = &cfg.auth;
    let token_cfg = TokenConfig {
        issuer: a.issuer.clone(),
        access_ttl_secs: i64::try_from(a.access_ttl_secs)?,
        refresh_ttl_secs: i64::try_from(a.refresh_ttl_secs)?,
    };
    let tokens = TokenService::from_pem(&read_key(&a.private_key_path)?, &read_key(&a.public_key_path)?, token_cfg, clock.clone())?;
    let auth_cfg = AuthConfig {
        session_ttl_secs: a.session_ttl_secs,
        reset_ttl_secs: a.reset_ttl_secs,
        password: PasswordPolicy { memory_kib: a.argon2_memory_kib, iterations: a.argon2_iterations, parallelism: a.argon2_parallelism },
    };

    let repo: Arc<dyn UserRepository> = Arc::new(SeaOrmUserRepository::new(db));
    let auth = AuthService::new(repo, tokens, store, transport, clock, auth_cfg);

    Ok(ServerState {
        auth: Arc::new(auth),
        cookie: CookieSettings {
            name: cfg.cookie.name.clone(),
            secure: cfg.cookie.secure,
            max_age_secs: i64::try_from(a.refresh_ttl_secs)?,
        },
    })
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&cfg).await?;
    let cors = routes::build_cors(cfg.server.frontend_origin.as_deref());
    let app: Router = routes::build_router(state, &cfg.server.base_path, cors);

    let addr = load_bind_addr(&cfg)?;
    info!(%addr, base_path = %cfg.server.base_path, "starting auth server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
