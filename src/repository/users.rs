//! Users and staff repository for database operations

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::user::{Identity, Staff, User},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get staff by ID
    pub async fn get_staff_by_id(&self, id: i32) -> AppResult<Staff> {
        sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE staff_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Staff with id {} not found", id)))
    }

    /// Get user by email
    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    /// Get staff by email
    pub async fn get_staff_by_email(&self, email: &str) -> AppResult<Option<Staff>> {
        let staff =
            sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(staff)
    }

    /// Resolve an email to its tagged identity: users first, then staff.
    ///
    /// This is the single role-disambiguation point; everything downstream
    /// carries the resolved role in claims instead of re-querying.
    pub async fn resolve_identity(&self, email: &str) -> AppResult<Option<Identity>> {
        if let Some(user) = self.get_user_by_email(email).await? {
            return Ok(Some(Identity::User(user)));
        }

        if let Some(staff) = self.get_staff_by_email(email).await? {
            return Ok(Some(Identity::Staff(staff)));
        }

        Ok(None)
    }

    /// Check if email already exists in either accounts table
    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))
                OR EXISTS(SELECT 1 FROM staff WHERE LOWER(email) = LOWER($1))
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Create a new user account
    pub async fn create_user(
        &self,
        full_name: &str,
        email: &str,
        password_hash: &str,
        id_number: Option<&str>,
    ) -> AppResult<User> {
        if self.email_exists(email).await? {
            return Err(AppError::Conflict(format!(
                "email {} is already registered",
                email
            )));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, password_hash, id_number)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(full_name)
        .bind(email)
        .bind(password_hash)
        .bind(id_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Create a new staff account
    pub async fn create_staff(
        &self,
        full_name: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<Staff> {
        if self.email_exists(email).await? {
            return Err(AppError::Conflict(format!(
                "email {} is already registered",
                email
            )));
        }

        let staff = sqlx::query_as::<_, Staff>(
            r#"
            INSERT INTO staff (staff_uuid, full_name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(full_name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(staff)
    }

    /// Count staff accounts, used by the startup bootstrap check
    pub async fn staff_count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staff")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
