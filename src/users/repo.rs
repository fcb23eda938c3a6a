use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewUser, PasswordResetToken, ProfileUpdate, PublicUser, User};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Same as `find_by_id` but never loads the password hash.
    async fn find_public(&self, id: Uuid) -> anyhow::Result<Option<PublicUser>>;

    /// Returns `None` when the email is already registered.
    async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>>;

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate)
        -> anyhow::Result<Option<User>>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn delete_for_user(&self, user_id: Uuid) -> anyhow::Result<u64>;

    async fn insert(&self, token: &PasswordResetToken) -> anyhow::Result<()>;

    /// Token with this digest whose expiry is after `now`.
    async fn find_live(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<PasswordResetToken>>;
}

const USER_COLUMNS: &str =
    "id, email, name, password_hash, phone, bio, photo, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_public(&self, id: Uuid) -> anyhow::Result<Option<PublicUser>> {
        let user = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, name, email, photo, phone, bio
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find public user")?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, phone, bio)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(&user.bio)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(created)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET name = $2, phone = $3, bio = $4, photo = $5, updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.phone)
        .bind(&update.bio)
        .bind(&update.photo)
        .fetch_optional(&self.db)
        .await
        .context("update user profile")?;
        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await
        .context("update user password")?;
        Ok(res.rows_affected() == 1)
    }
}

#[derive(Clone)]
pub struct PgResetTokenStore {
    db: PgPool,
}

impl PgResetTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResetTokenStore for PgResetTokenStore {
    async fn delete_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete reset tokens")?;
        Ok(res.rows_affected())
    }

    async fn insert(&self, token: &PasswordResetToken) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (user_id, token_hash, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.db)
        .await
        .context("insert reset token")?;
        Ok(())
    }

    async fn find_live(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<PasswordResetToken>> {
        let token = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            SELECT user_id, token_hash, created_at, expires_at
              FROM password_reset_tokens
             WHERE token_hash = $1 AND expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("find reset token")?;
        Ok(token)
    }
}
