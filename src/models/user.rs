//! User, staff and identity models.
//!
//! Role is not a stored column: an email resolves against the `users` or the
//! `staff` table exactly once at login, and the resulting tag travels in the
//! JWT claims from then on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Tagged role of an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Staff => "staff",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registered borrower.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub user_id: i32,
    pub full_name: String,
    pub email: String,
    pub id_number: Option<String>,
    /// Argon2 hash, never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Library staff member. `staff_uuid` is the catalog's creator reference.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Staff {
    pub staff_id: i32,
    pub staff_uuid: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Identity resolved from an email: the role tag plus the matched row.
#[derive(Debug, Clone)]
pub enum Identity {
    User(User),
    Staff(Staff),
}

impl Identity {
    pub fn role(&self) -> Role {
        match self {
            Identity::User(_) => Role::User,
            Identity::Staff(_) => Role::Staff,
        }
    }

    /// user_id or staff_id, depending on the role tag.
    pub fn subject_id(&self) -> i32 {
        match self {
            Identity::User(u) => u.user_id,
            Identity::Staff(s) => s.staff_id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Identity::User(u) => &u.email,
            Identity::Staff(s) => &s.email,
        }
    }

    pub fn full_name(&self) -> &str {
        match self {
            Identity::User(u) => &u.full_name,
            Identity::Staff(s) => &s.full_name,
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            Identity::User(u) => &u.password_hash,
            Identity::Staff(s) => &s.password_hash,
        }
    }
}

/// JWT claims for authenticated calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject email.
    pub sub: String,
    /// user_id or staff_id depending on `role`.
    pub subject_id: i32,
    pub role: Role,
    pub full_name: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Build claims for a resolved identity, expiring `expiration_hours` out.
    pub fn for_identity(identity: &Identity, expiration_hours: u64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: identity.email().to_string(),
            subject_id: identity.subject_id(),
            role: identity.role(),
            full_name: identity.full_name().to_string(),
            exp: now + (expiration_hours as i64) * 3600,
            iat: now,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    /// Require the staff role; circulation approvals, catalog mutations and
    /// reports are staff-only.
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Staff privileges required".to_string(),
            ))
        }
    }

    /// Require the user role and return the acting user_id. Borrow-pipeline
    /// operations always act on the authenticated subject's own id.
    pub fn require_user(&self) -> Result<i32, AppError> {
        match self.role {
            Role::User => Ok(self.subject_id),
            Role::Staff => Err(AppError::Authorization(
                "Only registered borrowers can use the borrowing pipeline".to_string(),
            )),
        }
    }
}

/// Signup request (registers a borrower account).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub id_number: Option<String>,
}

/// Login request; the same endpoint serves users and staff.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login/signup response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub role: Role,
    pub subject_id: i32,
    pub full_name: String,
}

/// Profile view returned by `/auth/me`.
#[derive(Debug, Serialize, ToSchema)]
pub struct Profile {
    pub email: String,
    pub role: Role,
    pub subject_id: i32,
    pub full_name: String,
}

impl From<&Claims> for Profile {
    fn from(claims: &Claims) -> Self {
        Self {
            email: claims.sub.clone(),
            role: claims.role,
            subject_id: claims.subject_id,
            full_name: claims.full_name.clone(),
        }
    }
}
