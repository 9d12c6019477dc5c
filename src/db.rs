use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Open a single-connection pool for `url`.
///
/// Accepts `sqlite:<path>`, `sqlite://<path>`, `sqlite::memory:` or a bare
/// file path. Query parameters on file URLs are dropped; the parent
/// directory of a file database is created if needed.
pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = match database_path(url) {
        Some(path) => {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        }
        None => SqliteConnectOptions::from_str(url)?,
    };

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}

/// File path named by a connection string, or `None` for in-memory databases.
fn database_path(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path)
    }
}
