//! App Context

use std::{fmt, sync::Arc, time::Duration};

use sqlx::migrate::MigrateError;
use thiserror::Error;

use crate::{
    auth::{AuthService, PgAuthService},
    database::{self, DatabaseConfig, Db},
    domain::{
        carts::{CartsService, PgCartsService},
        orders::{OrdersService, PgOrdersService},
        products::{PgProductsService, ProductsService},
        reservations::{PgReservationsService, ReservationsService},
        users::{PgUsersService, UsersService},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to apply database migrations")]
    Migrate(#[source] MigrateError),
}

/// Every service the HTTP layer needs, behind trait objects so handlers can
/// be tested against mocks.
#[derive(Clone)]
pub struct AppContext {
    pub users: Arc<dyn UsersService>,
    pub products: Arc<dyn ProductsService>,
    pub carts: Arc<dyn CartsService>,
    pub orders: Arc<dyn OrdersService>,
    pub reservations: Arc<dyn ReservationsService>,
    pub auth: Arc<dyn AuthService>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext").finish_non_exhaustive()
    }
}

impl AppContext {
    /// Wire the Postgres-backed services onto an existing handle.
    #[must_use]
    pub fn new(db: Db, reservation_ttl: Duration) -> Self {
        Self {
            users: Arc::new(PgUsersService::new(db.clone())),
            products: Arc::new(PgProductsService::new(db.clone())),
            carts: Arc::new(PgCartsService::new(db.clone()).with_reservation_ttl(reservation_ttl)),
            orders: Arc::new(PgOrdersService::new(db.clone())),
            reservations: Arc::new(PgReservationsService::new(db.clone())),
            auth: Arc::new(PgAuthService::new(db)),
        }
    }
}

/// Connect with explicit pool settings, optionally applying migrations.
///
/// # Errors
///
/// Returns an error when connecting to the database or applying migrations
/// fails.
pub async fn connect(config: &DatabaseConfig, run_migrations: bool) -> Result<Db, AppInitError> {
    let pool = database::connect_with(config)
        .await
        .map_err(AppInitError::Database)?;

    if run_migrations {
        database::migrate(&pool)
            .await
            .map_err(AppInitError::Migrate)?;
    }

    Ok(Db::new(pool).with_statement_timeout(config.statement_timeout))
}
