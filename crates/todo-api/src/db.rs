use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::models::{Todo, TodoRow, User};

/// Relational store over a SQLite pool. Owned by `AppState` and cloned into
/// handlers; all queries are explicit, including foreign-key lookups.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        // Foreign keys must be on for every pooled connection, not just the
        // one that runs the migrations: image-row cleanup relies on cascade.
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                username      TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at    TEXT NOT NULL
            );"#,
            r#"
            CREATE TABLE IF NOT EXISTS todos (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                description TEXT,
                time        TEXT,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL
            );"#,
            r#"
            CREATE TABLE IF NOT EXISTS todo_images (
                todo_id  INTEGER NOT NULL REFERENCES todos(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                filename TEXT NOT NULL,
                PRIMARY KEY (todo_id, position)
            );"#,
        ];
        for statement in &statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Liveness check used by the health endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        self.pool.acquire().await.map(|_| ())
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let created_at = chrono::Utc::now().to_rfc3339();
        let result =
            sqlx::query("INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)")
                .bind(username)
                .bind(password_hash)
                .bind(&created_at)
                .execute(&self.pool)
                .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }

    pub async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// Inserts a todo and its image rows in one transaction so a failed
    /// insert never leaves a todo without its recorded uploads.
    pub async fn insert_todo(
        &self,
        user_id: i64,
        title: &str,
        description: Option<&str>,
        time: Option<&str>,
        images: &[String],
    ) -> Result<i64, sqlx::Error> {
        let created_at = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO todos (title, description, time, user_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(title)
        .bind(description)
        .bind(time)
        .bind(user_id)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;
        let todo_id = result.last_insert_rowid();

        for (position, filename) in images.iter().enumerate() {
            sqlx::query("INSERT INTO todo_images (todo_id, position, filename) VALUES (?, ?, ?)")
                .bind(todo_id)
                .bind(position as i64)
                .bind(filename)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(todo_id)
    }

    pub async fn get_todo(&self, id: i64) -> Result<Option<Todo>, sqlx::Error> {
        let row = sqlx::query_as::<_, TodoRow>(
            "SELECT id, title, description, time, user_id, created_at FROM todos WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let images = self.images_for(row.id).await?;
                Ok(Some(row.into_todo(images)))
            }
            None => Ok(None),
        }
    }

    pub async fn update_todo(
        &self,
        id: i64,
        title: &str,
        description: Option<&str>,
        time: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE todos SET title = ?, description = ?, time = ? WHERE id = ?")
            .bind(title)
            .bind(description)
            .bind(time)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_todo(&self, id: i64) -> Result<(), sqlx::Error> {
        // Image rows cascade via the foreign key.
        sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Page of todos in id order, starting strictly after `after`. Fetches
    /// one row beyond `limit` so callers can tell whether more remain.
    pub async fn todos_after(
        &self,
        after: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Todo>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TodoRow>(
            "SELECT id, title, description, time, user_id, created_at FROM todos \
             WHERE id > ? ORDER BY id LIMIT ?",
        )
        .bind(after.unwrap_or(0))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut todos = Vec::with_capacity(rows.len());
        for row in rows {
            let images = self.images_for(row.id).await?;
            todos.push(row.into_todo(images));
        }
        Ok(todos)
    }

    async fn images_for(&self, todo_id: i64) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT filename FROM todo_images WHERE todo_id = ? ORDER BY position")
            .bind(todo_id)
            .fetch_all(&self.pool)
            .await
    }
}
