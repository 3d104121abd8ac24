use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{
    auth::{AuthSession, SESSION_COOKIE},
    errors::ApiError,
    services::customers::CustomerQuery,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Account routes: register, login, logout, me.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Routes that need an authenticated session.
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

/// Admin customer directory routes
pub fn admin_customers_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers))
        .route("/:id", get(get_customer))
        .route("/:id/deactivate", post(deactivate_customer))
        .route("/:id/reactivate", post(reactivate_customer))
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, max = 128))]
    password: String,
    #[validate(length(min = 1, max = 255))]
    name: String,
}

#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    customer_id: Uuid,
    email: String,
    name: String,
    role: String,
    token: String,
    expires_in: i64,
}

fn session_cookie_header(token: &str, max_age: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    )
}

fn session_response(
    customer: crate::entities::CustomerModel,
    token: crate::auth::IssuedToken,
    status: StatusCode,
) -> Response {
    let cookie = session_cookie_header(&token.token, token.expires_in);
    let body = SessionResponse {
        customer_id: customer.id,
        email: customer.email,
        name: customer.name,
        role: customer.role.to_string(),
        token: token.token,
        expires_in: token.expires_in,
    };
    (status, [(header::SET_COOKIE, cookie)], axum::Json(body)).into_response()
}

/// Register a new customer account. Accounts created here always get
/// the customer role.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;

    let customer = state
        .auth
        .register(&payload.email, &payload.password, &payload.name)
        .await?;
    let token = state.auth.issue_token(&customer)?;

    state
        .event_sender
        .send_or_log(crate::events::Event::CustomerRegistered(customer.id))
        .await;

    Ok(session_response(customer, token, StatusCode::CREATED))
}

/// Log in with email and password; issues the session token as both a
/// cookie and a bearer-usable value.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;

    let customer = state
        .auth
        .authenticate(&payload.email, &payload.password)
        .await?;
    let token = state.auth.issue_token(&customer)?;

    Ok(session_response(customer, token, StatusCode::OK))
}

/// Clear the session cookie. Tokens are stateless, so this is purely a
/// client-side cleanup aid.
async fn logout() -> Response {
    let cookie = session_cookie_header("", 0);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        axum::Json(serde_json::json!({ "message": "Logged out" })),
    )
        .into_response()
}

/// The authenticated customer's profile
async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state
        .services
        .customers
        .get(session.customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(customer))
}

/// List customers with search and activity filters
async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .customers
        .list(query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

/// Get a customer by id
async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state
        .services
        .customers
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(customer))
}

/// Deactivate a customer account
async fn deactivate_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state
        .services
        .customers
        .deactivate(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(customer))
}

/// Reactivate a customer account
async fn reactivate_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state
        .services
        .customers
        .reactivate(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(customer))
}
