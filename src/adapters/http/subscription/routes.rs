//! Axum router configuration for subscription endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    confirm_charge, get_city_subscriptions, get_transaction_history, list_subscriptions,
    open_charge, SubscriptionAppState,
};

/// Create the subscription API router, to be nested under `/api`.
///
/// # Routes
/// - `GET /subscriptions` - All of the user's grants with city names
/// - `POST /subscriptions/checkout` - Open a charge
/// - `POST /subscriptions/confirm` - Confirm a paid charge
/// - `GET /subscriptions/cities/:city_id` - The user's grant for one city
/// - `GET /subscriptions/transactions` - The user's payment history
pub fn subscription_router() -> Router<SubscriptionAppState> {
    Router::new()
        .route("/subscriptions", get(list_subscriptions))
        .route("/subscriptions/checkout", post(open_charge))
        .route("/subscriptions/confirm", post(confirm_charge))
        .route("/subscriptions/cities/:city_id", get(get_city_subscriptions))
        .route("/subscriptions/transactions", get(get_transaction_history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::http::subscription::SubscriptionSettings;
    use crate::adapters::memory::{
        InMemoryCatalog, InMemorySubscriptionReader, InMemorySubscriptionStore,
    };
    use crate::domain::catalog::{City, CityTier, PlanPeriod, SubscriptionPlan, UserProfile};
    use crate::domain::foundation::{CityId, PlanId, UserId};

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn test_app() -> (Router, InMemorySubscriptionStore) {
        let catalog = InMemoryCatalog::new();
        catalog.add_city(City::new(CityId::new(1).unwrap(), "Tehran", CityTier::Capital));
        catalog.add_city(City::new(CityId::new(2).unwrap(), "Karaj", CityTier::Ordinary));
        catalog.add_plan(
            SubscriptionPlan::new(PlanId::new(1).unwrap(), PlanPeriod::ThreeMonths, 1000).unwrap(),
        );
        catalog.add_user(UserProfile::new(
            UserId::new(7).unwrap(),
            Some(CityId::new(2).unwrap()),
        ));

        let store = InMemorySubscriptionStore::new();
        let state = SubscriptionAppState {
            catalog: Arc::new(catalog.clone()),
            store: Arc::new(store.clone()),
            reader: Arc::new(InMemorySubscriptionReader::new(store.clone(), catalog)),
            gateway: Arc::new(MockPaymentGateway::new()),
            settings: SubscriptionSettings::default(),
        };

        (subscription_router().with_state(state), store)
    }

    fn post_json(uri: &str, user: Option<i64>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("X-User-Id", user.to_string());
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_as(uri: &str, user: i64) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("X-User-Id", user.to_string())
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Router Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_user_header_is_unauthorized() {
        let (app, _) = test_app();
        let request = post_json(
            "/subscriptions/checkout",
            None,
            json!({"city_id": 1, "plan_id": 1, "callback_url": "https://app.test/cb"}),
        );

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "AUTHENTICATION_REQUIRED");
    }

    #[tokio::test]
    async fn checkout_then_confirm_grants_subscription() {
        let (app, store) = test_app();

        let (status, opened) = send(
            &app,
            post_json(
                "/subscriptions/checkout",
                Some(7),
                json!({"city_id": 1, "plan_id": 1, "callback_url": "https://app.test/cb"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(opened["amount"], 4000);
        let authority = opened["authority"].as_str().unwrap().to_string();

        let (status, confirmed) = send(
            &app,
            post_json("/subscriptions/confirm", Some(7), json!({ "authority": authority })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(confirmed["first_purchase"], true);
        assert_eq!(confirmed["transaction"]["amount"], 4000);
        assert_eq!(store.pending_count(), 0);

        let (status, list) = send(&app, get_as("/subscriptions", 7)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["city_name"], "Tehran");
        assert_eq!(list[0]["is_active"], true);

        let (_, history) = send(&app, get_as("/subscriptions/transactions", 7)).await;
        assert_eq!(history.as_array().unwrap().len(), 1);

        let (_, city) = send(&app, get_as("/subscriptions/cities/1", 7)).await;
        assert_eq!(city.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn confirming_twice_is_conflict() {
        let (app, _) = test_app();
        let (_, opened) = send(
            &app,
            post_json(
                "/subscriptions/checkout",
                Some(7),
                json!({"city_id": 2, "plan_id": 1, "callback_url": "https://app.test/cb"}),
            ),
        )
        .await;
        let confirm = json!({ "authority": opened["authority"] });

        let (first, _) = send(&app, post_json("/subscriptions/confirm", Some(7), confirm.clone())).await;
        let (second, body) = send(&app, post_json("/subscriptions/confirm", Some(7), confirm)).await;

        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INVALID_OR_CONSUMED_AUTHORITY");
    }

    #[tokio::test]
    async fn blank_callback_url_is_bad_request() {
        let (app, _) = test_app();
        let (status, body) = send(
            &app,
            post_json(
                "/subscriptions/checkout",
                Some(7),
                json!({"city_id": 1, "plan_id": 1, "callback_url": "  "}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "CALLBACK_URL_MISSING");
    }

    #[tokio::test]
    async fn zero_city_id_in_path_is_bad_request() {
        let (app, _) = test_app();
        let (status, body) = send(&app, get_as("/subscriptions/cities/0", 7)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn unknown_plan_is_not_found() {
        let (app, _) = test_app();
        let (status, body) = send(
            &app,
            post_json(
                "/subscriptions/checkout",
                Some(7),
                json!({"city_id": 1, "plan_id": 99, "callback_url": "https://app.test/cb"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "PLAN_NOT_FOUND");
    }
}
