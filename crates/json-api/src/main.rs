//! Storefront JSON API Server

use std::{process, sync::Arc};

use salvo::{
    affix_state::inject,
    oapi::{
        OpenApi,
        security::{Http, HttpAuthScheme, SecurityScheme},
        swagger_ui::SwaggerUi,
    },
    prelude::*,
    trailing_slash::remove_slash,
};
use tracing::{error, info};

use storefront_app::{
    admission::{
        AlertSink, CounterCache, LogAlertSink, MemoryCounterCache, PgCounterCache, RateLimiter,
        Throttle, WebhookAlertSink, spawn_purger,
    },
    context::{self, AppContext},
    domain::reservations::reaper::spawn_reaper,
};

use crate::{
    admission::ClientIpResolver,
    config::{ServerConfig, admission::CounterBackend},
    observability::{Observability, metrics_handler, request_logging},
    state::State,
};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admission;
mod auth;
mod carts;
mod config;
mod extensions;
mod healthcheck;
mod observability;
mod orders;
mod products;
mod router;
mod shutdown;
mod state;
#[cfg(test)]
mod test_helpers;

/// Storefront JSON API Server entry point
#[tokio::main]
pub async fn main() {
    let config = ServerConfig::load().unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln for config errors"
        )]
        {
            eprintln!("Configuration error: {e}");
        }

        process::exit(1);
    });

    let observability = Observability::init(&config).unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialize, must use eprintln"
        )]
        {
            eprintln!("Observability error: {e}");
        }

        process::exit(1);
    });

    let addr = config.socket_addr();
    let shutdown_grace = config.server.shutdown_grace();

    let db = match context::connect(
        &config.database.to_database_config(),
        config.database.database_run_migrations,
    )
    .await
    {
        Ok(db) => db,
        Err(init_error) => {
            error!("failed to connect to database: {init_error}");

            process::exit(1);
        }
    };

    let app = AppContext::new(db.clone(), config.reservations.ttl());

    let counters: Arc<dyn CounterCache> = match config.rate_limit.backend {
        CounterBackend::Postgres => Arc::new(PgCounterCache::new(db)),
        CounterBackend::Memory => Arc::new(MemoryCounterCache::new()),
    };

    let alerts: Arc<dyn AlertSink> = match &config.alerts.alert_webhook_url {
        Some(url) => {
            match WebhookAlertSink::with_timeout(url.clone(), config.alerts.webhook_timeout()) {
                Ok(sink) => Arc::new(sink),
                Err(init_error) => {
                    error!("failed to build alert webhook client: {init_error}");

                    process::exit(1);
                }
            }
        }
        None => Arc::new(LogAlertSink),
    };

    let reap_interval = config.reservations.reap_interval();

    let background = vec![
        spawn_reaper(Arc::clone(&app.reservations), reap_interval),
        spawn_purger(Arc::clone(&counters), reap_interval),
    ];

    let state = State::new(
        app,
        RateLimiter::new(config.rate_limit.to_rate_limit_config(), counters),
        Throttle::new(&config.throttle.to_throttle_config()),
        alerts,
        ClientIpResolver::new(config.rate_limit.trusted_proxy_hops),
    );

    info!("Starting server on {addr}");

    let listener = TcpListener::new(addr).bind().await;

    let router = Router::new()
        .hoop(CatchPanic::new())
        .hoop(remove_slash())
        .hoop(inject(state))
        .hoop(request_logging)
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(Router::with_path("metrics").get(metrics_handler))
        .push(router::app_router());

    let doc = OpenApi::new("Storefront API", env!("CARGO_PKG_VERSION"))
        .add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
        .merge_router(&router);

    let router = router
        .push(doc.into_router("/api-doc/openapi.json"))
        .push(SwaggerUi::new("/api-doc/openapi.json").into_router("docs"));

    let server = Server::new(listener);

    let handle = server.handle();

    tokio::spawn(async move {
        if let Err(error) = shutdown::listen(handle, background, shutdown_grace).await {
            error!("failed to listen for shutdown signal: {error}");
        }
    });

    server.serve(router).await;

    observability.shutdown();
}
