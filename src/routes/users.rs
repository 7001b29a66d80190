//! HTTP Routes for user accounts
//!
//! - POST  /users/register   - Create an account
//! - POST  /users/login      - Authenticate and get JWT token
//! - GET   /users            - List accounts (public fields only)
//! - PATCH /users/{username} - Change username
//! - GET   /users/me         - Identity from a bearer token
//! - GET   /users/test       - Plain-text liveness check

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::auth::extract_token_from_header;
use crate::server::AppState;
use crate::types::{FieldError, GatehouseError};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 10 * 1024;

const ALLOWED_METHODS: &str = "GET, POST, PATCH, OPTIONS";

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    #[serde(default)]
    pub new_username: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub username: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

// =============================================================================
// Response Helpers
// =============================================================================

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOWED_METHODS)
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

fn message_response(status: StatusCode, message: &str) -> Response<BoxBody> {
    json_response(
        status,
        &MessageResponse {
            message: message.to_string(),
        },
    )
}

/// Render an error. Internal faults are logged here and reach the caller
/// only as the generic message.
fn error_response(err: &GatehouseError) -> Response<BoxBody> {
    if err.is_internal() {
        error!("Request failed: {}", err);
    }

    json_response(
        err.status_code(),
        &ErrorResponse {
            message: err.public_message(),
            code: err.code(),
            errors: err.field_errors().map(|f| f.to_vec()),
        },
    )
}

fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOWED_METHODS)
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(full_body(Bytes::new()))
        .unwrap()
}

fn method_not_allowed() -> Response<BoxBody> {
    message_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn parse_json_body<T, B>(req: Request<B>) -> Result<T, GatehouseError>
where
    T: for<'de> Deserialize<'de>,
    B: Body,
    B::Error: Into<BoxError>,
{
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                GatehouseError::Http("Request body too large".into())
            } else {
                GatehouseError::Http(format!("Failed to read body: {}", e))
            }
        })?;

    let bytes = body.to_bytes();
    serde_json::from_slice(&bytes).map_err(|e| GatehouseError::Http(format!("Invalid JSON: {}", e)))
}

fn bearer_token<B>(req: &Request<B>) -> Option<&str> {
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    extract_token_from_header(header)
}

/// `/users/{segment}` with exactly one non-empty segment
fn single_segment(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/users/")?;
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /users/register
async fn handle_register<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let body: CredentialsRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state.accounts.register(&body.username, &body.password).await {
        Ok(()) => message_response(StatusCode::CREATED, "User registered successfully"),
        Err(e) => error_response(&e),
    }
}

/// POST /users/login
async fn handle_login<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let body: CredentialsRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state
        .accounts
        .authenticate(&body.username, &body.password)
        .await
    {
        Ok(token) => json_response(StatusCode::OK, &TokenResponse { token }),
        Err(e) => error_response(&e),
    }
}

/// GET /users
async fn handle_list(state: Arc<AppState>) -> Response<BoxBody> {
    match state.accounts.list_accounts().await {
        Ok(accounts) => json_response(StatusCode::OK, &accounts),
        Err(e) => error_response(&e),
    }
}

/// PATCH /users/{username}
async fn handle_rename<B>(
    req: Request<B>,
    state: Arc<AppState>,
    raw_username: &str,
) -> Response<BoxBody>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let username = match urlencoding::decode(raw_username) {
        Ok(name) => name.into_owned(),
        Err(_) => {
            return error_response(&GatehouseError::invalid(
                "username",
                "Username in path is not valid UTF-8",
            ))
        }
    };

    let body: RenameRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state
        .accounts
        .rename_handle(&username, &body.new_username)
        .await
    {
        Ok(()) => message_response(StatusCode::OK, "User profile updated successfully"),
        Err(e) => error_response(&e),
    }
}

/// GET /users/me
fn handle_me<B>(req: &Request<B>, state: &AppState) -> Response<BoxBody> {
    let token = match bearer_token(req) {
        Some(t) => t,
        None => {
            return error_response(&GatehouseError::Unauthorized("No token provided".into()))
        }
    };

    match state.accounts.verify_token(token) {
        Ok(claims) => json_response(
            StatusCode::OK,
            &MeResponse {
                username: claims.username,
                issued_at: claims.iat,
                expires_at: claims.exp,
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// GET /users/test
fn handle_test() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain")
        .body(full_body("Server is working!"))
        .unwrap()
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle user-related HTTP requests.
///
/// Returns Some(response) if request was handled, None if not a user route.
pub async fn handle_users_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path().to_string();
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    if path != "/users" && !path.starts_with("/users/") {
        return None;
    }

    let method = req.method().clone();
    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let response = match (&method, path) {
        (&Method::GET, "/users") => handle_list(state).await,
        (&Method::POST, "/users/register") => handle_register(req, state).await,
        (&Method::POST, "/users/login") => handle_login(req, state).await,
        (&Method::GET, "/users/me") => handle_me(&req, &state),
        (&Method::GET, "/users/test") => handle_test(),
        (&Method::PATCH, p) if single_segment(p).is_some() => {
            let raw = single_segment(p).unwrap_or_default().to_string();
            handle_rename(req, state, &raw).await
        }

        // Method not allowed
        (_, "/users")
        | (_, "/users/register")
        | (_, "/users/login")
        | (_, "/users/me")
        | (_, "/users/test") => method_not_allowed(),
        (_, p) if single_segment(p).is_some() => method_not_allowed(),

        _ => message_response(StatusCode::NOT_FOUND, "User endpoint not found"),
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountService;
    use crate::auth::JwtValidator;
    use crate::config::Args;
    use crate::store::MemoryCredentialStore;
    use clap::Parser;

    fn test_state() -> Arc<AppState> {
        let args = Args::try_parse_from(["gatehouse", "--dev-mode"]).unwrap();
        let tokens =
            JwtValidator::new("test-secret-that-is-at-least-32-characters-long", 3600).unwrap();
        let accounts = AccountService::new(Arc::new(MemoryCredentialStore::new()), tokens);
        Arc::new(AppState::new(args, accounts))
    }

    fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn call(
        state: &Arc<AppState>,
        req: Request<Full<Bytes>>,
    ) -> (StatusCode, serde_json::Value) {
        let response = handle_users_request(req, Arc::clone(state))
            .await
            .expect("user route");
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_non_user_path_is_ignored() {
        let state = test_state();
        let req = request(Method::GET, "/health", "");
        assert!(handle_users_request(req, state).await.is_none());

        let req = request(Method::GET, "/usersx", "");
        assert!(handle_users_request(req, test_state()).await.is_none());
    }

    #[tokio::test]
    async fn test_register_login_flow() {
        let state = test_state();

        let (status, body) = call(
            &state,
            request(
                Method::POST,
                "/users/register",
                r#"{"username":"alice","password":"hunter2"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User registered successfully");

        let (status, body) = call(
            &state,
            request(
                Method::POST,
                "/users/login",
                r#"{"username":"alice","password":"hunter2"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let req = Request::builder()
            .method(Method::GET)
            .uri("/users/me")
            .header("Authorization", format!("Bearer {}", token))
            .body(Full::new(Bytes::new()))
            .unwrap();
        let (status, body) = call(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let state = test_state();
        let (status, body) = call(
            &state,
            request(Method::POST, "/users/register", r#"{"username":"bob"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
        assert_eq!(body["errors"][0]["field"], "password");
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let state = test_state();
        let (status, body) = call(
            &state,
            request(Method::POST, "/users/login", "{not json"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_oversized_body() {
        let state = test_state();
        let huge = format!(
            r#"{{"username":"{}","password":"hunter2"}}"#,
            "a".repeat(MAX_BODY_BYTES)
        );
        let (status, body) = call(&state, request(Method::POST, "/users/register", &huge)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Request body too large");
        assert!(state.accounts.list_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rename_with_encoded_path() {
        let state = test_state();
        state.accounts.register("ann lee", "hunter2").await.unwrap();

        let (status, body) = call(
            &state,
            request(
                Method::PATCH,
                "/users/ann%20lee",
                r#"{"newUsername":"ann"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User profile updated successfully");

        let (_, body) = call(&state, request(Method::GET, "/users", "")).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["username"], "ann");
        assert!(body[0].get("password").is_none());
        assert!(body[0].get("credentialHash").is_none());
    }

    #[tokio::test]
    async fn test_rename_unknown_user() {
        let state = test_state();
        let (status, body) = call(
            &state,
            request(Method::PATCH, "/users/ghost", r#"{"newUsername":"ghost2"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_me_without_token() {
        let state = test_state();
        let (status, _) = call(&state, request(Method::GET, "/users/me", "")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_method_routing() {
        let state = test_state();

        let (status, _) = call(&state, request(Method::GET, "/users/register", "")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(&state, request(Method::DELETE, "/users/alice", "")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(&state, request(Method::GET, "/users/a/b", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let response = handle_users_request(request(Method::OPTIONS, "/users", ""), state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_plain_text_test_route() {
        let state = test_state();
        let response = handle_users_request(request(Method::GET, "/users/test", ""), state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Server is working!");
    }

    #[test]
    fn test_single_segment() {
        assert_eq!(single_segment("/users/alice"), Some("alice"));
        assert_eq!(single_segment("/users/"), None);
        assert_eq!(single_segment("/users/a/b"), None);
        assert_eq!(single_segment("/users"), None);
    }
}
