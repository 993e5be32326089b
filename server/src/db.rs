use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../migrations");

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub fn create_pool(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .build(manager)
        .expect("Failed to create database pool");

    // Run pending migrations on startup
    let mut conn = pool
        .get()
        .expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");

    pool
}

/// Pool that never connects eagerly, for exercising routers in tests that
/// fail before touching the database.
#[cfg(test)]
pub fn test_pool() -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new("postgres://localhost/unused");
    r2d2::Pool::builder().max_size(1).build_unchecked(manager)
}

/// Connection for tests that exercise real queries. Returns None (skipping
/// the test) unless DATABASE_URL points at a reachable Postgres.
#[cfg(test)]
pub fn test_connection() -> Option<PgConnection> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let mut conn = PgConnection::establish(&url).ok()?;
    conn.run_pending_migrations(MIGRATIONS).ok()?;
    Some(conn)
}

/// Get a pooled connection or return a 500 response from the current handler.
#[macro_export]
macro_rules! get_conn {
    ($pool:expr) => {
        match $pool.get() {
            Ok(c) => c,
            Err(_) => {
                return (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json($crate::api::ErrorResponse {
                        error: "Database connection failed".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    };
}
