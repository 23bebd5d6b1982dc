use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;
use crate::error::{Result, ArtistGraphError};

pub mod migrate;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Database connection wrapper
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
    busy_timeout: Duration,
    read_only: bool,
}

impl Db {
    /// Create a new database connection manager; the file is created on first use
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            read_only: false,
        }
    }

    /// Connection manager for an existing database that is never written
    pub fn read_only<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            read_only: true,
            ..Self::new(db_path)
        }
    }

    /// How long a statement waits on a locked database before failing
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new database connection with the store pragmas applied
    pub fn open_connection(&self) -> Result<Connection> {
        open(&self.path, self.busy_timeout, self.read_only)
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        let busy_timeout = self.busy_timeout;
        let read_only = self.read_only;
        task::spawn_blocking(move || {
            let mut conn = open(&path, busy_timeout, read_only)?;
            f(&mut conn).map_err(classify)
        })
        .await
        .map_err(|e| ArtistGraphError::Connectivity(format!("database task failed: {}", e)))?
    }
}

fn open(path: &Path, busy_timeout: Duration, read_only: bool) -> Result<Connection> {
    let flags = if read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
    } else {
        OpenFlags::default()
    };

    let conn = Connection::open_with_flags(path, flags).map_err(|e| {
        ArtistGraphError::Connectivity(format!("cannot open graph store {}: {}", path.display(), e))
    })?;
    conn.busy_timeout(busy_timeout).map_err(classify_sqlite)?;

    // WAL for concurrent readers; journal mode can only be switched by a writer
    if read_only {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA temp_store = MEMORY;")
            .map_err(classify_sqlite)?;
    } else {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA temp_store = MEMORY;"
        )
        .map_err(classify_sqlite)?;
    }

    Ok(conn)
}

/// Lock waits that outlive the busy timeout mean the store is unavailable, not broken.
fn classify(err: ArtistGraphError) -> ArtistGraphError {
    match err {
        ArtistGraphError::Database(e) => classify_sqlite(e),
        other => other,
    }
}

fn classify_sqlite(err: rusqlite::Error) -> ArtistGraphError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            ArtistGraphError::Connectivity(format!("graph store busy: {}", err))
        }
        Some(ErrorCode::CannotOpen) => {
            ArtistGraphError::Connectivity(format!("graph store unreachable: {}", err))
        }
        _ => ArtistGraphError::Database(err),
    }
}
