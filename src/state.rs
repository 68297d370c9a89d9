use sqlx::SqlitePool;

/// Shared per-process handles. Services receive what they need from here on
/// every request; nothing else is kept between requests.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}
