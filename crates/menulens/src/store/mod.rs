//! Optional SQLite persistence for analysis runs.

pub mod migrations;
pub mod persist;
pub mod query;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, Error as SqliteError, OptionalExtension, ffi::ErrorCode};
use tracing::debug;

use crate::{LensError, LensResult};
use migrations::{EXPECTED_SCHEMA_VERSION, EXPECTED_USER_VERSION, REQUIRED_INDEX_NAMES, REQUIRED_TABLES, run_pending};

pub const STORE_HOME_ENV: &str = "MENULENS_HOME";
const STORE_DIR_NAME: &str = ".menulens";
const STORE_DB_NAME: &str = "menulens.db";
const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// Where an analysis store lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub home: PathBuf,
    pub db_path: PathBuf,
}

impl StoreLocation {
    /// An explicit home wins, then `MENULENS_HOME`, then `~/.menulens`.
    pub fn resolve(home_override: Option<&Path>) -> LensResult<Self> {
        let home = match home_override {
            Some(path) => path.to_path_buf(),
            None => std::env::var_os(STORE_HOME_ENV)
                .map(PathBuf::from)
                .or_else(|| home::home_dir().map(|dir| dir.join(STORE_DIR_NAME)))
                .ok_or_else(|| {
                    LensError::store_init_failed(
                        Path::new("."),
                        "Could not resolve a home directory for the analysis store.",
                    )
                })?,
        };
        let home = std::path::absolute(&home)
            .map_err(|error| LensError::store_init_failed(&home, &error.to_string()))?;

        Ok(Self {
            db_path: home.join(STORE_DB_NAME),
            home,
        })
    }

    fn create_home(&self) -> LensResult<()> {
        fs::create_dir_all(&self.home).map_err(|error| {
            if error.kind() == std::io::ErrorKind::PermissionDenied {
                LensError::store_permission_denied(&self.home, &error.to_string())
            } else {
                LensError::store_init_failed(&self.home, &error.to_string())
            }
        })?;
        restrict_to_owner(&self.home);
        Ok(())
    }

    fn connect(&self) -> LensResult<Connection> {
        let connection = Connection::open(&self.db_path).map_err(|error| self.failure(&error))?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(|error| self.failure(&error))?;
        connection
            .pragma_update(None, "foreign_keys", true)
            .map_err(|error| self.failure(&error))?;
        Ok(connection)
    }

    fn failure(&self, error: &SqliteError) -> LensError {
        sqlite_failure(&self.db_path, error)
    }
}

/// An open, migrated and verified analysis store.
#[derive(Debug)]
pub struct Store {
    pub(crate) connection: Connection,
    location: StoreLocation,
}

impl Store {
    pub fn home(&self) -> &Path {
        &self.location.home
    }

    pub fn db_path(&self) -> &Path {
        &self.location.db_path
    }
}

/// Resolves the store home, creates it when missing, brings the schema up to
/// date and checks that every required table, column and index is present.
pub fn open_store(home_override: Option<&Path>) -> LensResult<Store> {
    let location = StoreLocation::resolve(home_override)?;
    location.create_home()?;

    let mut connection = location.connect()?;
    run_pending(&mut connection).map_err(|error| migration_failure(&location.db_path, &error))?;
    verify_schema(&connection, &location)?;

    debug!(db_path = %location.db_path.display(), "analysis store ready");
    Ok(Store {
        connection,
        location,
    })
}

/// Maps a SQLite failure onto the store error codes callers can act on.
pub(crate) fn sqlite_failure(db_path: &Path, error: &SqliteError) -> LensError {
    match error.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => LensError::store_locked(db_path),
        Some(ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt) => {
            LensError::store_corrupt(db_path)
        }
        Some(ErrorCode::CannotOpen | ErrorCode::ReadOnly | ErrorCode::PermissionDenied) => {
            LensError::store_permission_denied(db_path, &error.to_string())
        }
        _ => LensError::store_init_failed(db_path, &error.to_string()),
    }
}

fn migration_failure(db_path: &Path, error: &rusqlite_migration::Error) -> LensError {
    if let rusqlite_migration::Error::RusqliteError { err, .. } = error {
        let mapped = sqlite_failure(db_path, err);
        if mapped.code != "store_init_failed" {
            return mapped;
        }
    }
    LensError::migration_failed(db_path, &error.to_string())
}

fn verify_schema(connection: &Connection, location: &StoreLocation) -> LensResult<()> {
    let db_path = location.db_path.as_path();
    let corrupt = || LensError::store_corrupt(db_path);

    let tables = schema_objects(connection, "table", db_path)?;
    for (table_name, required_columns) in REQUIRED_TABLES {
        if !tables.contains(table_name) {
            return Err(corrupt());
        }
        let columns = table_columns(connection, table_name, db_path)?;
        if required_columns.iter().any(|column| !columns.contains(*column)) {
            return Err(corrupt());
        }
    }

    let indexes = schema_objects(connection, "index", db_path)?;
    if REQUIRED_INDEX_NAMES.iter().any(|name| !indexes.contains(*name)) {
        return Err(corrupt());
    }

    let user_version = connection
        .query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))
        .map_err(|error| sqlite_failure(db_path, &error))?;
    let schema_version = connection
        .query_row(
            "SELECT value FROM store_meta WHERE key = 'schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|error| sqlite_failure(db_path, &error))?;
    if user_version != EXPECTED_USER_VERSION
        || schema_version.as_deref() != Some(EXPECTED_SCHEMA_VERSION)
    {
        return Err(corrupt());
    }

    Ok(())
}

fn schema_objects(connection: &Connection, kind: &str, db_path: &Path) -> LensResult<HashSet<String>> {
    let mut statement = connection
        .prepare("SELECT name FROM sqlite_master WHERE type = ?1")
        .map_err(|error| sqlite_failure(db_path, &error))?;
    let names = statement
        .query_map([kind], |row| row.get::<_, String>(0))
        .map_err(|error| sqlite_failure(db_path, &error))?
        .collect::<Result<HashSet<String>, SqliteError>>()
        .map_err(|error| sqlite_failure(db_path, &error))?;
    Ok(names)
}

fn table_columns(connection: &Connection, table: &str, db_path: &Path) -> LensResult<HashSet<String>> {
    let mut statement = connection
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .map_err(|error| sqlite_failure(db_path, &error))?;
    let columns = statement
        .query_map([table], |row| row.get::<_, String>(0))
        .map_err(|error| sqlite_failure(db_path, &error))?
        .collect::<Result<HashSet<String>, SqliteError>>()
        .map_err(|error| sqlite_failure(db_path, &error))?;
    Ok(columns)
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o700));
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) {}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{StoreLocation, open_store};

    #[test]
    fn explicit_home_wins_and_relative_homes_become_absolute() {
        let explicit = StoreLocation::resolve(Some(Path::new("/tmp/menulens-home")));
        assert!(explicit.is_ok());
        if let Ok(location) = explicit {
            assert_eq!(location.home, Path::new("/tmp/menulens-home"));
            assert_eq!(location.db_path, Path::new("/tmp/menulens-home/menulens.db"));
        }

        let relative = StoreLocation::resolve(Some(Path::new("relative-store")));
        assert!(relative.is_ok());
        if let Ok(location) = relative {
            assert!(location.home.is_absolute());
            assert!(location.home.ends_with("relative-store"));
        }
    }

    #[test]
    fn open_store_creates_database_and_is_reentrant() {
        let temp = tempfile::tempdir();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let first = open_store(Some(temp.path()));
            assert!(first.is_ok());
            if let Ok(store) = first {
                assert!(store.db_path().exists());
                assert_eq!(store.home(), temp.path());
            }

            let second = open_store(Some(temp.path()));
            assert!(second.is_ok());
        }
    }

    #[test]
    fn dropped_index_is_reported_corrupt() {
        let temp = tempfile::tempdir();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let first = open_store(Some(temp.path()));
            assert!(first.is_ok());
            if let Ok(store) = first {
                let dropped = store
                    .connection
                    .execute_batch("DROP INDEX idx_order_items_run_catalog_item;");
                assert!(dropped.is_ok());
            }

            let reopened = open_store(Some(temp.path()));
            assert!(matches!(reopened, Err(error) if error.code == "store_corrupt"));
        }
    }

    #[test]
    fn garbage_database_file_is_reported_corrupt() {
        let temp = tempfile::tempdir();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let written = std::fs::write(
                temp.path().join("menulens.db"),
                b"this is definitely not an sqlite database file, just some bytes",
            );
            assert!(written.is_ok());

            let opened = open_store(Some(temp.path()));
            assert!(opened.is_err());
            if let Err(error) = opened {
                assert_eq!(error.code, "store_corrupt");
            }
        }
    }
}
