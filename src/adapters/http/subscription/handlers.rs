//! HTTP handlers for subscription endpoints.
//!
//! These handlers connect Axum routes to the application layer command and
//! query handlers. They parse ids, build commands and map errors; nothing else.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Json, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::handlers::subscription::{
    CreateUserSubscriptionCommand, CreateUserSubscriptionHandler, FetchPaymentGatewayInfoCommand,
    FetchPaymentGatewayInfoHandler, FetchUserPaymentTransactionsHistoryHandler,
    FetchUserPaymentTransactionsHistoryQuery, FetchUserSubscriptionListHandler,
    FetchUserSubscriptionListQuery, GetUserSubscriptionsByCityHandler,
    GetUserSubscriptionsByCityQuery, DEFAULT_CHARGE_DESCRIPTION, DEFAULT_GATEWAY_TIMEOUT,
};
use crate::domain::foundation::{AuthorityToken, CityId, PlanId, UserId, ValidationError};
use crate::domain::subscription::{SubscriptionError, FIRST_PURCHASE_BONUS_DAYS};
use crate::ports::{CatalogReader, PaymentGateway, SubscriptionReader, SubscriptionStore};

use super::dto::{
    CitySubscriptionResponse, ConfirmChargeRequest, ConfirmChargeResponse, ErrorResponse,
    GrantStatusResponse, OpenChargeRequest, OpenChargeResponse, TransactionResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Tunables applied to every command handler built from the state.
#[derive(Debug, Clone)]
pub struct SubscriptionSettings {
    pub charge_description: String,
    pub gateway_timeout: Duration,
    pub first_purchase_bonus_days: i64,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            charge_description: DEFAULT_CHARGE_DESCRIPTION.to_string(),
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            first_purchase_bonus_days: FIRST_PURCHASE_BONUS_DAYS,
        }
    }
}

/// Shared state for subscription routes.
///
/// Cloned per request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct SubscriptionAppState {
    pub catalog: Arc<dyn CatalogReader>,
    pub store: Arc<dyn SubscriptionStore>,
    pub reader: Arc<dyn SubscriptionReader>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub settings: SubscriptionSettings,
}

impl SubscriptionAppState {
    pub fn open_charge_handler(&self) -> FetchPaymentGatewayInfoHandler {
        FetchPaymentGatewayInfoHandler::new(
            self.catalog.clone(),
            self.store.clone(),
            self.gateway.clone(),
        )
        .with_description(self.settings.charge_description.clone())
        .with_gateway_timeout(self.settings.gateway_timeout)
    }

    pub fn confirm_charge_handler(&self) -> CreateUserSubscriptionHandler {
        CreateUserSubscriptionHandler::new(
            self.catalog.clone(),
            self.store.clone(),
            self.gateway.clone(),
        )
        .with_first_purchase_bonus_days(self.settings.first_purchase_bonus_days)
        .with_gateway_timeout(self.settings.gateway_timeout)
    }

    pub fn city_grants_handler(&self) -> GetUserSubscriptionsByCityHandler {
        GetUserSubscriptionsByCityHandler::new(self.reader.clone())
    }

    pub fn history_handler(&self) -> FetchUserPaymentTransactionsHistoryHandler {
        FetchUserPaymentTransactionsHistoryHandler::new(self.reader.clone())
    }

    pub fn subscription_list_handler(&self) -> FetchUserSubscriptionListHandler {
        FetchUserSubscriptionListHandler::new(self.reader.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Acting user, taken from the `X-User-Id` header.
///
/// Stand-in for the session middleware that fronts this service in
/// deployment.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<UserId>().ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /subscriptions/checkout - Open a charge and get the gateway redirect
pub async fn open_charge(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
    Json(request): Json<OpenChargeRequest>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let cmd = FetchPaymentGatewayInfoCommand {
        user_id: user.user_id,
        city_id: CityId::new(request.city_id)?,
        plan_id: PlanId::new(request.plan_id)?,
        callback_url: request.callback_url,
    };

    let result = state.open_charge_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(OpenChargeResponse::from(result))))
}

/// POST /subscriptions/confirm - Verify a paid charge and grant the subscription
pub async fn confirm_charge(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
    Json(request): Json<ConfirmChargeRequest>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let cmd = CreateUserSubscriptionCommand {
        user_id: user.user_id,
        authority: AuthorityToken::new(request.authority)?,
    };

    let result = state.confirm_charge_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(ConfirmChargeResponse::from(result))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /subscriptions/cities/:city_id - The user's grant for one city
pub async fn get_city_subscriptions(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
    Path(city_id): Path<i64>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let query = GetUserSubscriptionsByCityQuery {
        user_id: user.user_id,
        city_id: CityId::new(city_id)?,
    };

    let result = state.city_grants_handler().handle(query).await?;

    let response: Vec<GrantStatusResponse> = result.iter().map(GrantStatusResponse::from).collect();
    Ok(Json(response))
}

/// GET /subscriptions/transactions - The user's payment history, newest first
pub async fn get_transaction_history(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let query = FetchUserPaymentTransactionsHistoryQuery {
        user_id: user.user_id,
    };

    let result = state.history_handler().handle(query).await?;

    let response: Vec<TransactionResponse> = result.iter().map(TransactionResponse::from).collect();
    Ok(Json(response))
}

/// GET /subscriptions - All of the user's grants with city names
pub async fn list_subscriptions(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let query = FetchUserSubscriptionListQuery {
        user_id: user.user_id,
    };

    let result = state.subscription_list_handler().handle(query).await?;

    let response: Vec<CitySubscriptionResponse> =
        result.iter().map(CitySubscriptionResponse::from).collect();
    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts workflow errors to HTTP responses.
#[derive(Debug)]
pub struct SubscriptionApiError(SubscriptionError);

impl From<SubscriptionError> for SubscriptionApiError {
    fn from(err: SubscriptionError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for SubscriptionApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl SubscriptionApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SubscriptionError::CallbackUrlMissing | SubscriptionError::InvalidInput { .. } => {
                StatusCode::BAD_REQUEST
            }
            SubscriptionError::AlreadySubscribedForCity { .. }
            | SubscriptionError::InvalidOrConsumedAuthority => StatusCode::CONFLICT,
            SubscriptionError::InvalidPlan(_)
            | SubscriptionError::InvalidCity(_)
            | SubscriptionError::UserNotFound(_) => StatusCode::NOT_FOUND,
            SubscriptionError::DataMismatch => StatusCode::FORBIDDEN,
            SubscriptionError::PaymentAlreadyVerified
            | SubscriptionError::PaymentRejected { .. }
            | SubscriptionError::PaymentFailed => StatusCode::PAYMENT_REQUIRED,
            SubscriptionError::Gateway(_) => StatusCode::BAD_GATEWAY,
            SubscriptionError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SubscriptionApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Infrastructure details stay in the logs.
        let message = match &self.0 {
            SubscriptionError::Infrastructure(_) => "Internal error".to_string(),
            other => other.to_string(),
        };
        let body = ErrorResponse::new(self.0.code().to_string(), message);
        (status, Json(body)).into_response()
    }
}
