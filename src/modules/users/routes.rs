//! HTTP handlers for the user service, mounted under `/api/users`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Extension, Json, Router,
};
use bookbay_authz::{AuthError, Claims};
use bookbay_db::DbError;
use bookbay_http::error::AppError;
use bookbay_http::HealthStatus;
use serde::Serialize;

use super::models::{AuthResult, LoginRequest, RegisterRequest, UserView};
use super::service::{UserError, UserService};

/// Success envelope shared by every user route.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: &'static str,
    pub data: T,
}

pub fn router(users: Arc<UserService>) -> Router {
    let protected = Router::new()
        .route("/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(
            users.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/health", get(health))
        .merge(protected)
        .with_state(users)
}

fn user_error(err: UserError, fallback: &str) -> AppError {
    let message = err.to_string();
    match err {
        UserError::InvalidInput(_) | UserError::AlreadyExists => AppError::bad_request(message),
        UserError::InvalidCredentials => AppError::unauthorized(message),
        UserError::NotFound => AppError::not_found(message),
        UserError::Auth(AuthError::InvalidToken) => AppError::forbidden(message),
        UserError::Store(DbError::Validation { violations, .. }) => AppError::validation(
            violations
                .iter()
                .filter_map(|v| serde_json::to_value(v).ok())
                .collect(),
            fallback,
        ),
        UserError::Store(DbError::Unavailable(reason)) => {
            tracing::error!(%reason, "user store unavailable");
            AppError::unavailable(fallback)
        }
        other => {
            tracing::error!(error = %other, "user request failed");
            AppError::Internal(anyhow::anyhow!(fallback.to_string()))
        }
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>, fallback: &str) -> Result<T, AppError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::warn!(error = %rejection, "malformed request body");
        AppError::bad_request(fallback)
    })
}

async fn register(
    State(users): State<Arc<UserService>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<AuthResult>>), AppError> {
    const FALLBACK: &str = "Registration failed";
    let request = json_body(payload, FALLBACK)?;
    let result = users
        .register(request)
        .await
        .map_err(|e| user_error(e, FALLBACK))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            message: "User registered successfully",
            data: result,
        }),
    ))
}

async fn login(
    State(users): State<Arc<UserService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Envelope<AuthResult>>, AppError> {
    const FALLBACK: &str = "Login failed";
    let request = json_body(payload, FALLBACK)?;
    let result = users
        .login(request)
        .await
        .map_err(|e| user_error(e, FALLBACK))?;

    Ok(Json(Envelope {
        message: "Login successful",
        data: result,
    }))
}

async fn profile(
    State(users): State<Arc<UserService>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Envelope<UserView>>, AppError> {
    let user = users
        .profile(&claims.user_id)
        .await
        .map_err(|e| user_error(e, "Failed to get profile"))?;

    Ok(Json(Envelope {
        message: "Profile retrieved successfully",
        data: user,
    }))
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::healthy("user-service"))
}

/// Verify the bearer token and expose its [`Claims`] to the handler.
///
/// No token is 401; a token that fails verification is 403.
async fn require_bearer(
    State(users): State<Arc<UserService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_whitespace().nth(1))
        .map(str::to_string);

    let Some(token) = token else {
        return Err(AppError::unauthorized("Access token required"));
    };

    let claims = users.verify_token(&token).map_err(|e| {
        tracing::warn!(error = %e, "rejected bearer token");
        AppError::forbidden("Invalid or expired token")
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use bookbay_authz::TokenService;
    use bookbay_db::Collection;
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(UserService::new(
            Arc::new(Collection::detached()),
            TokenService::new("route-secret"),
        )))
    }

    async fn send(router: &Router, request: Request) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn profile_request(authorization: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/profile");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn register_ada(router: &Router) -> serde_json::Value {
        let (status, body) = send(
            router,
            post_json(
                "/register",
                serde_json::json!({
                    "email": "ada@example.com",
                    "password": "secret1",
                    "name": "Ada"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn register_returns_user_and_token() {
        let router = app();
        let body = register_ada(&router).await;

        assert_eq!(body["message"], "User registered successfully");
        assert_eq!(body["data"]["user"]["email"], "ada@example.com");
        assert!(body["data"]["user"].get("password").is_none());
        assert!(body["data"]["token"].is_string());
    }

    #[tokio::test]
    async fn register_errors_are_400() {
        let router = app();
        register_ada(&router).await;

        let (status, body) = send(
            &router,
            post_json(
                "/register",
                serde_json::json!({ "email": "ada@example.com", "password": "secret1", "name": "Ada" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "User already exists with this email");

        let (status, body) = send(
            &router,
            post_json("/register", serde_json::json!({ "email": "bob@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Email, password, and name are required");
    }

    #[tokio::test]
    async fn login_success_and_failure() {
        let router = app();
        register_ada(&router).await;

        let (status, body) = send(
            &router,
            post_json(
                "/login",
                serde_json::json!({ "email": "ada@example.com", "password": "secret1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Login successful");

        let (status, body) = send(
            &router,
            post_json(
                "/login",
                serde_json::json!({ "email": "ada@example.com", "password": "wrong-one" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn profile_with_valid_token() {
        let router = app();
        let registered = register_ada(&router).await;
        let token = registered["data"]["token"].as_str().unwrap();

        let (status, body) = send(
            &router,
            profile_request(Some(&format!("Bearer {token}"))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Profile retrieved successfully");
        assert_eq!(body["data"]["id"], registered["data"]["user"]["id"]);
    }

    #[tokio::test]
    async fn profile_without_token_is_401() {
        let (status, body) = send(&app(), profile_request(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Access token required");
    }

    #[tokio::test]
    async fn profile_with_bad_or_expired_token_is_403() {
        let router = app();
        let (status, body) = send(&router, profile_request(Some("Bearer garbage"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["message"], "Invalid or expired token");

        let expired = TokenService::new("route-secret")
            .issue_at(
                "u-1",
                "ada@example.com",
                "user",
                OffsetDateTime::now_utc() - Duration::hours(48),
            )
            .unwrap();
        let (status, _) = send(
            &router,
            profile_request(Some(&format!("Bearer {expired}"))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn profile_of_deleted_user_is_404() {
        let token = TokenService::new("route-secret")
            .issue("ghost", "ghost@example.com", "user")
            .unwrap();
        let (status, body) = send(
            &app(),
            profile_request(Some(&format!("Bearer {token}"))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "User not found");
    }

    #[tokio::test]
    async fn module_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "user-service");
    }
}
