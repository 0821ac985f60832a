//! Identity and authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{AuthResponse, Claims, Identity, LoginRequest, SignupRequest, Staff},
    repository::Repository,
};

#[derive(Clone)]
pub struct IdentityService {
    repository: Repository,
    config: AuthConfig,
}

impl IdentityService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new user account and sign them in
    pub async fn signup(&self, request: SignupRequest) -> AppResult<AuthResponse> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let password_hash = self.hash_password(&request.password)?;

        let user = self
            .repository
            .users
            .create_user(
                &request.full_name,
                &request.email,
                &password_hash,
                request.id_number.as_deref(),
            )
            .await?;

        self.issue_token(&Identity::User(user))
    }

    /// Authenticate by email and password against both account tables
    pub async fn login(&self, request: &LoginRequest) -> AppResult<AuthResponse> {
        let identity = self
            .repository
            .users
            .resolve_identity(&request.email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(identity.password_hash(), &request.password)? {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        self.issue_token(&identity)
    }

    /// Create a staff account from configuration when the staff table is
    /// empty, so a fresh deployment has a working login.
    pub async fn bootstrap_staff(&self) -> AppResult<Option<Staff>> {
        if self.repository.users.staff_count().await? > 0 {
            return Ok(None);
        }

        let password_hash = self.hash_password(&self.config.bootstrap_staff_password)?;
        let staff = self
            .repository
            .users
            .create_staff(
                &self.config.bootstrap_staff_name,
                &self.config.bootstrap_staff_email,
                &password_hash,
            )
            .await?;

        tracing::info!("Bootstrapped staff account {}", staff.email);
        Ok(Some(staff))
    }

    fn issue_token(&self, identity: &Identity) -> AppResult<AuthResponse> {
        let claims = Claims::for_identity(identity, self.config.jwt_expiration_hours);
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok(AuthResponse {
            token,
            token_type: "Bearer".to_string(),
            role: identity.role(),
            subject_id: identity.subject_id(),
            full_name: identity.full_name().to_string(),
        })
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, hash: &str, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
