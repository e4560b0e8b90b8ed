//! User Storage
//! Credential and role persistence behind the `CredentialStore` trait, with a SQLite backend

use crate::auth::errors::StoreError;
use crate::auth::models::{Credential, CredentialUpdate, NewCredential, Role, UserFilter};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, ToSql};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// What the auth core needs from persistence
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Credential>, StoreError>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;
    async fn find_role_by_id(&self, id: i64) -> Result<Option<Role>, StoreError>;
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;
    /// Insert a role. A duplicate name fails with `StoreError::Conflict`.
    async fn insert_role(&self, name: &str, description: Option<&str>) -> Result<Role, StoreError>;

    /// Insert a credential. A duplicate email or username fails with `StoreError::Conflict`.
    async fn insert_credential(&self, new: NewCredential) -> Result<Credential, StoreError>;
    /// Apply a partial update. Fails with `StoreError::NotFound` if no row has `id`.
    async fn update_credential(&self, id: i64, update: CredentialUpdate) -> Result<(), StoreError>;
    async fn delete_credential(&self, id: i64) -> Result<(), StoreError>;
    /// One page of credentials matching `filter`, ordered by id, plus the total match count.
    async fn list_credentials(
        &self,
        filter: &UserFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Credential>, u64), StoreError>;
}

const CREDENTIAL_SELECT: &str = "SELECT u.id, u.email, u.username, u.full_name, u.password_hash,
        u.is_active, u.is_verified, u.role_id, u.created_at, u.updated_at, u.last_login,
        r.id, r.name, r.description, r.created_at
     FROM users u LEFT JOIN roles r ON r.id = u.role_id";

/// User storage with SQLite backend
#[derive(Clone)]
pub struct UserStore {
    conn: Arc<Mutex<Connection>>,
}

impl UserStore {
    /// Open (or create) the database at `db_path` and initialize the schema
    pub fn open(db_path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path).context("open auth db")?;
        match conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        }) {
            Ok(mode) if mode.eq_ignore_ascii_case("wal") => {
                debug!("Auth db journal mode: {}", mode)
            }
            Ok(mode) => warn!("Auth db stayed in {} journal mode, WAL unavailable", mode),
            Err(e) => warn!("Failed to enable WAL on auth db: {}", e),
        }
        Self::from_connection(conn)
    }

    /// Private in-memory database, mostly for tests
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory auth db")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn find_one(
        &self,
        clause: &str,
        value: &(dyn ToSql + Send + Sync),
    ) -> Result<Option<Credential>, StoreError> {
        let conn = self.conn.lock().await;
        let sql = format!("{CREDENTIAL_SELECT} WHERE {clause}");
        let mut stmt = conn.prepare_cached(&sql).map_err(map_sqlite_error)?;
        stmt.query_row(params![value], credential_from_row)
            .optional()
            .map_err(map_sqlite_error)
    }
}

/// Initialize database schema
fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS roles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT UNIQUE NOT NULL,
            username TEXT UNIQUE NOT NULL,
            full_name TEXT,
            password_hash TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_verified INTEGER NOT NULL DEFAULT 0,
            role_id INTEGER NOT NULL REFERENCES roles(id),
            created_at TEXT NOT NULL,
            updated_at TEXT,
            last_login TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_role_id ON users(role_id)",
        [],
    )?;

    Ok(())
}

fn credential_from_row(row: &Row<'_>) -> rusqlite::Result<Credential> {
    let role_id: Option<i64> = row.get(11)?;
    let role = match role_id {
        Some(id) => Some(Role {
            id,
            name: row.get(12)?,
            description: row.get(13)?,
            created_at: row.get(14)?,
        }),
        None => None,
    };

    Ok(Credential {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        full_name: row.get(3)?,
        password_hash: row.get(4)?,
        is_active: row.get(5)?,
        is_verified: row.get(6)?,
        role_id: row.get(7)?,
        role,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        last_login: row.get(10)?,
    })
}

fn role_from_row(row: &Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Map SQLite failures, pulling the column out of unique-constraint messages
/// such as `UNIQUE constraint failed: users.email`.
fn map_sqlite_error(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(code, Some(msg)) = &err {
        if code.code == ErrorCode::ConstraintViolation && msg.starts_with("UNIQUE") {
            let column = msg
                .rsplit('.')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            return StoreError::Conflict { column };
        }
    }
    StoreError::Backend(err.into())
}

/// Escape LIKE wildcards so a search term matches literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn filter_clause(filter: &UserFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        clauses.push(
            "(LOWER(u.email) LIKE ? ESCAPE '\\' OR LOWER(u.username) LIKE ? ESCAPE '\\' \
             OR LOWER(COALESCE(u.full_name, '')) LIKE ? ESCAPE '\\')",
        );
        let pattern = like_pattern(search.trim());
        for _ in 0..3 {
            values.push(Box::new(pattern.clone()));
        }
    }
    if let Some(role_name) = &filter.role_name {
        clauses.push("r.name = ?");
        values.push(Box::new(role_name.clone()));
    }
    if let Some(is_active) = filter.is_active {
        clauses.push("u.is_active = ?");
        values.push(Box::new(is_active));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

#[async_trait]
impl CredentialStore for UserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, StoreError> {
        self.find_one("u.email = ?1", &email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        self.find_one("u.username = ?1", &username).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Credential>, StoreError> {
        self.find_one("u.id = ?1", &id).await
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, name, description, created_at FROM roles WHERE name = ?1",
            params![name],
            role_from_row,
        )
        .optional()
        .map_err(map_sqlite_error)
    }

    async fn find_role_by_id(&self, id: i64) -> Result<Option<Role>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, name, description, created_at FROM roles WHERE id = ?1",
            params![id],
            role_from_row,
        )
        .optional()
        .map_err(map_sqlite_error)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare_cached("SELECT id, name, description, created_at FROM roles ORDER BY id ASC")
            .map_err(map_sqlite_error)?;

        let roles = stmt
            .query_map([], role_from_row)
            .map_err(map_sqlite_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlite_error)?;

        Ok(roles)
    }

    async fn insert_role(&self, name: &str, description: Option<&str>) -> Result<Role, StoreError> {
        let created_at = Utc::now();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO roles (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![name, description, created_at],
        )
        .map_err(map_sqlite_error)?;

        info!("Created role: {}", name);

        Ok(Role {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at,
        })
    }

    async fn insert_credential(&self, new: NewCredential) -> Result<Credential, StoreError> {
        let created_at = Utc::now();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (email, username, full_name, password_hash, is_active,
                                is_verified, role_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new.email,
                new.username,
                new.full_name,
                new.password_hash,
                new.is_active,
                new.is_verified,
                new.role_id,
                created_at,
            ],
        )
        .map_err(map_sqlite_error)?;

        let id = conn.last_insert_rowid();
        let sql = format!("{CREDENTIAL_SELECT} WHERE u.id = ?1");
        let credential = conn
            .query_row(&sql, params![id], credential_from_row)
            .map_err(map_sqlite_error)?;

        debug!("Inserted credential {} ({})", credential.id, credential.username);

        Ok(credential)
    }

    async fn update_credential(&self, id: i64, update: CredentialUpdate) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(email) = update.email {
            sets.push("email = ?");
            values.push(Box::new(email));
        }
        if let Some(username) = update.username {
            sets.push("username = ?");
            values.push(Box::new(username));
        }
        if let Some(full_name) = update.full_name {
            sets.push("full_name = ?");
            values.push(Box::new(full_name));
        }
        if let Some(password_hash) = update.password_hash {
            sets.push("password_hash = ?");
            values.push(Box::new(password_hash));
        }
        if let Some(is_active) = update.is_active {
            sets.push("is_active = ?");
            values.push(Box::new(is_active));
        }
        if let Some(is_verified) = update.is_verified {
            sets.push("is_verified = ?");
            values.push(Box::new(is_verified));
        }
        if let Some(role_id) = update.role_id {
            sets.push("role_id = ?");
            values.push(Box::new(role_id));
        }
        if let Some(last_login) = update.last_login {
            sets.push("last_login = ?");
            values.push(Box::new(last_login));
        }

        sets.push("updated_at = ?");
        values.push(Box::new(Utc::now()));
        values.push(Box::new(id));

        let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
        let rows = conn
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(map_sqlite_error)?;

        if rows == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn delete_credential(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let rows = conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .map_err(map_sqlite_error)?;

        if rows == 0 {
            return Err(StoreError::NotFound);
        }

        info!("Deleted user: {}", id);
        Ok(())
    }

    async fn list_credentials(
        &self,
        filter: &UserFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Credential>, u64), StoreError> {
        let conn = self.conn.lock().await;
        let (where_sql, mut values) = filter_clause(filter);

        let count_sql = format!(
            "SELECT COUNT(*) FROM users u LEFT JOIN roles r ON r.id = u.role_id{where_sql}"
        );
        let total: i64 = conn
            .query_row(&count_sql, params_from_iter(values.iter()), |row| row.get(0))
            .map_err(map_sqlite_error)?;

        let total = total.max(0) as u64;

        // An offset SQLite cannot represent lies past every row
        let (Ok(limit), Ok(offset)) = (i64::try_from(limit), i64::try_from(offset)) else {
            return Ok((Vec::new(), total));
        };

        let page_sql =
            format!("{CREDENTIAL_SELECT}{where_sql} ORDER BY u.id ASC LIMIT ? OFFSET ?");
        values.push(Box::new(limit));
        values.push(Box::new(offset));

        let mut stmt = conn.prepare(&page_sql).map_err(map_sqlite_error)?;
        let users = stmt
            .query_map(params_from_iter(values.iter()), credential_from_row)
            .map_err(map_sqlite_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlite_error)?;

        Ok((users, total))
    }
}
