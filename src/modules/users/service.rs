//! Registration, login and profile lookup.

use std::sync::Arc;

use bookbay_authz::password::{hash_password_blocking, verify_password_blocking};
use bookbay_authz::{AuthError, Claims, TokenService};
use bookbay_db::{Collection, DbError};
use thiserror::Error;
use time::OffsetDateTime;

use super::models::{
    normalize_email, AuthResult, LoginRequest, RegisterRequest, User, UserView, DEFAULT_ROLE,
};

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("User already exists with this email")]
    AlreadyExists,

    /// Shared by unknown email and wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found")]
    NotFound,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] DbError),
}

pub type UserResult<T> = Result<T, UserError>;

pub struct UserService {
    users: Arc<Collection<User>>,
    tokens: TokenService,
}

impl UserService {
    pub fn new(users: Arc<Collection<User>>, tokens: TokenService) -> Self {
        Self { users, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub async fn register(&self, request: RegisterRequest) -> UserResult<AuthResult> {
        let email = normalize_email(&request.email);
        let name = request.name.trim().to_string();
        if email.is_empty() || request.password.is_empty() || name.is_empty() {
            return Err(UserError::InvalidInput(
                "Email, password, and name are required",
            ));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(UserError::InvalidInput(
                "Password must be at least 6 characters long",
            ));
        }

        if self.find_by_email(&email).await?.is_some() {
            tracing::info!(%email, "registration rejected, email taken");
            return Err(UserError::AlreadyExists);
        }

        let password = hash_password_blocking(request.password).await?;
        let role = request
            .role
            .map(|role| role.trim().to_string())
            .filter(|role| !role.is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());

        let user = User {
            id: String::new(),
            email,
            password,
            name,
            role,
            created_at: OffsetDateTime::now_utc(),
        };

        // A concurrent registration can still win between the lookup and here.
        let user = self.users.insert(user).await.map_err(|e| match e {
            DbError::Duplicate { .. } => UserError::AlreadyExists,
            other => UserError::Store(other),
        })?;

        tracing::info!(user_id = %user.id, email = %user.email, "user registered");
        self.authenticated(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> UserResult<AuthResult> {
        let email = normalize_email(&request.email);
        if email.is_empty() || request.password.is_empty() {
            return Err(UserError::InvalidInput("Email and password are required"));
        }

        let Some(user) = self.find_by_email(&email).await? else {
            tracing::info!(%email, "login failed");
            return Err(UserError::InvalidCredentials);
        };

        if !verify_password_blocking(request.password, user.password.clone()).await? {
            tracing::info!(%email, "login failed");
            return Err(UserError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "user logged in");
        self.authenticated(&user)
    }

    pub async fn profile(&self, user_id: &str) -> UserResult<UserView> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| UserView::from(&user))
            .ok_or(UserError::NotFound)
    }

    pub fn verify_token(&self, token: &str) -> UserResult<Claims> {
        Ok(self.tokens.verify(token)?)
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let email = email.to_string();
        Ok(self.users.find_one(move |user| user.email == email).await?)
    }

    fn authenticated(&self, user: &User) -> UserResult<AuthResult> {
        let token = self.tokens.issue(&user.id, &user.email, &user.role)?;
        Ok(AuthResult {
            user: UserView::from(user),
            token,
        })
    }
}
