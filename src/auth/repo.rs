use time::OffsetDateTime;

use crate::{
    auth::repo_types::{TokenRecord, User},
    store::{Db, StoreError},
};

impl User {
    pub async fn exists(db: &mut Db<'_>, login: &str) -> Result<bool, StoreError> {
        db.fetch_scalar(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE login = $1)")
                .bind(login),
        )
        .await
    }

    pub async fn find_by_login(db: &mut Db<'_>, login: &str) -> Result<Option<User>, StoreError> {
        db.fetch_optional(
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, login, password_hash, created_at
                FROM users
                WHERE login = $1
                "#,
            )
            .bind(login),
        )
        .await
    }

    pub async fn find_by_id(db: &mut Db<'_>, id: i64) -> Result<Option<User>, StoreError> {
        db.fetch_optional(
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, login, password_hash, created_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id),
        )
        .await
    }

    /// Fails with a unique violation if the login is taken.
    pub async fn create(db: &mut Db<'_>, login: &str, password_hash: &str) -> Result<User, StoreError> {
        db.fetch_one(
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (login, password_hash)
                VALUES ($1, $2)
                RETURNING id, login, password_hash, created_at
                "#,
            )
            .bind(login)
            .bind(password_hash),
        )
        .await
    }
}

impl TokenRecord {
    pub async fn insert(&self, db: &mut Db<'_>) -> Result<(), StoreError> {
        db.execute(
            sqlx::query("INSERT INTO tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
                .bind(&self.token)
                .bind(self.user_id)
                .bind(self.expires_at),
        )
        .await?;
        Ok(())
    }

    /// True while the row exists and has not passed its expiry.
    pub async fn exists_active(
        db: &mut Db<'_>,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        db.fetch_scalar(
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM tokens WHERE token = $1 AND expires_at > $2)",
            )
            .bind(token)
            .bind(now),
        )
        .await
    }

    /// Returns whether a row was removed.
    pub async fn delete(db: &mut Db<'_>, token: &str) -> Result<bool, StoreError> {
        let result = db
            .execute(sqlx::query("DELETE FROM tokens WHERE token = $1").bind(token))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Removes rows whose expiry is strictly before `now`.
    pub async fn delete_expired(db: &mut Db<'_>, now: OffsetDateTime) -> Result<u64, StoreError> {
        let result = db
            .execute(sqlx::query("DELETE FROM tokens WHERE expires_at < $1").bind(now))
            .await?;
        Ok(result.rows_affected())
    }
}
