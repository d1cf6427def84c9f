use crate::db::models::{DbUser, NewUser};
use crate::db::schema::USER_ENTITY;
use crate::error::AuthError;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

const USER_COLUMNS: &str = "id, username, password, createdAt, updatedAt";

/// Build a pool without opening a connection; an unreachable database shows
/// up on first use (normally `UserStorage::synchronize`).
pub fn connect_lazy(database_url: &str) -> Result<SqlitePool, AuthError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let mut pool_opts = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(5));
    // each in-memory connection is its own database
    if database_url.contains(":memory:") {
        pool_opts = pool_opts
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    Ok(pool_opts.connect_lazy_with(connect_opts))
}

fn normalize_sql(sql: &str) -> String {
    sql.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

#[derive(Clone)]
pub struct UserStorage {
    pool: SqlitePool,
}

impl UserStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the users table if absent, then check that the live table
    /// carries every declared column with its declared constraints. Safe to
    /// run on every startup.
    pub async fn synchronize(&self) -> Result<(), AuthError> {
        let table = USER_ENTITY.table_name();
        sqlx::query(&USER_ENTITY.create_table_sql())
            .execute(&self.pool)
            .await?;

        let problems = self.schema_problems(&table).await?;
        if !problems.is_empty() {
            return Err(AuthError::SchemaConflict { table, problems });
        }
        debug!(table = %table, "schema verified");
        Ok(())
    }

    /// Differences between the live table and `USER_ENTITY`.
    async fn schema_problems(&self, table: &str) -> Result<Vec<String>, AuthError> {
        let columns: Vec<(String, i64)> =
            sqlx::query_as(r#"SELECT name, "notnull" FROM pragma_table_info(?)"#)
                .bind(table)
                .fetch_all(&self.pool)
                .await?;

        // (index name, column name) for every UNIQUE index on the table
        let unique_index_columns: Vec<(String, Option<String>)> = sqlx::query_as(
            r#"SELECT il.name, ii.name
               FROM pragma_index_list(?1) AS il
               JOIN pragma_index_info(il.name) AS ii
               WHERE il."unique" = 1"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;
        let mut unique_indexes: HashMap<String, Vec<Option<String>>> = HashMap::new();
        for (index, column) in unique_index_columns {
            unique_indexes.entry(index).or_default().push(column);
        }

        let table_sql: Option<String> =
            sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(&self.pool)
                .await?;
        let table_sql = normalize_sql(table_sql.as_deref().unwrap_or(""));

        let mut problems: Vec<String> = USER_ENTITY
            .column_names()
            .into_iter()
            .filter(|col| !columns.iter().any(|(name, _)| name == col))
            .map(|col| format!("missing column `{col}`"))
            .collect();

        for field in USER_ENTITY.fields {
            let Some((_, notnull)) = columns.iter().find(|(name, _)| name == field.name) else {
                continue;
            };
            if !field.nullable && *notnull == 0 {
                problems.push(format!("column `{}` allows NULL", field.name));
            }
            if field.unique
                && !unique_indexes
                    .values()
                    .any(|cols| cols.len() == 1 && cols[0].as_deref() == Some(field.name))
            {
                problems.push(format!("column `{}` is not UNIQUE", field.name));
            }
            if let Some(check) = field.check_sql()
                && !table_sql.contains(&normalize_sql(&check))
            {
                problems.push(format!("column `{}` lacks {check}", field.name));
            }
        }
        Ok(problems)
    }

    /// Insert a user. A taken username yields `DuplicateUsername`.
    pub async fn create(&self, user: NewUser) -> Result<DbUser, AuthError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query_as::<_, DbUser>(&format!(
            "INSERT INTO Users (username, password, createdAt, updatedAt)
             VALUES (?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.password)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthError::from_write(e, &user.username))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<DbUser>, AuthError> {
        let user = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM Users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<DbUser>, AuthError> {
        let user = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM Users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<DbUser>, AuthError> {
        let users = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM Users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn count(&self) -> Result<i64, AuthError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Users")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Returns false when no user has this id.
    pub async fn update_password(&self, id: i64, password: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE Users SET password = ?, updatedAt = ? WHERE id = ?")
            .bind(password)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::from_write(e, ""))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn rename(&self, id: i64, username: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE Users SET username = ?, updatedAt = ? WHERE id = ?")
            .bind(username)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::from_write(e, username))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM Users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
