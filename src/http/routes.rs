//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Extension, State},
    http::{header, HeaderName, Method},
    middleware,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer, trace::TraceLayer,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::http::handlers::{
    analytics, chat, customers, files, inventory, orders, products, purchase_orders, settings,
    suppliers,
};
use crate::http::middleware::{csrf_guard, require_auth, AuthenticatedUser, Role};
use crate::integrations::shopify_webhook_handler;
use crate::util::csrf::{self, CSRF_COOKIE, CSRF_HEADER};
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(CSRF_HEADER),
        ])
        .allow_credentials(true);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/csrf", get(csrf_handler))
        .route("/api/webhooks/shopify", post(shopify_webhook_handler));

    // Protected routes (auth required). `require_auth` is added last so it
    // runs before the CSRF guard.
    let protected_routes = Router::new()
        .route("/api/me", get(me_handler))
        .merge(inventory_routes())
        .merge(catalogue_routes())
        .merge(purchase_order_routes())
        .merge(analytics_routes())
        .merge(chat_routes())
        .route("/api/settings", get(settings::get_settings).put(settings::update_settings))
        .route("/api/import", post(files::import_csv))
        .route("/api/export/:kind", get(files::export_csv))
        .layer(middleware::from_fn_with_state(state.clone(), csrf_guard))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let body_limit = state.config.max_import_bytes;
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/api/inventory", get(inventory::list_inventory))
        .route("/api/inventory/adjust", post(inventory::adjust_inventory))
        .route(
            "/api/inventory/:variant_id/ledger",
            get(inventory::inventory_ledger),
        )
}

fn catalogue_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/products/:id",
            get(products::get_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/api/suppliers",
            get(suppliers::list_suppliers).post(suppliers::create_supplier),
        )
        .route(
            "/api/suppliers/:id",
            get(suppliers::get_supplier)
                .patch(suppliers::update_supplier)
                .delete(suppliers::delete_supplier),
        )
        .route("/api/customers", get(customers::list_customers))
        .route(
            "/api/customers/:id",
            get(customers::get_customer).delete(customers::delete_customer),
        )
        .route("/api/orders", get(orders::list_orders))
        .route("/api/orders/:id", get(orders::get_order))
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/purchase-orders",
            get(purchase_orders::list_purchase_orders)
                .post(purchase_orders::create_purchase_order),
        )
        .route(
            "/api/purchase-orders/from-suggestions",
            post(purchase_orders::create_from_suggestions),
        )
        .route(
            "/api/purchase-orders/:id",
            get(purchase_orders::get_purchase_order),
        )
        .route(
            "/api/purchase-orders/:id/status",
            patch(purchase_orders::update_purchase_order_status),
        )
        .route(
            "/api/purchase-orders/:id/receive",
            post(purchase_orders::receive_purchase_order),
        )
}

fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analytics/dashboard", get(analytics::dashboard))
        .route("/api/analytics/dead-stock", get(analytics::dead_stock))
        .route("/api/analytics/reorder", get(analytics::reorder_suggestions))
        .route("/api/analytics/abc-analysis", get(analytics::abc_analysis))
        .route(
            "/api/analytics/supplier-performance",
            get(analytics::supplier_performance),
        )
        .route(
            "/api/analytics/inventory-turnover",
            get(analytics::inventory_turnover),
        )
        .route("/api/analytics/sales", get(analytics::sales_analytics))
        .route("/api/analytics/inventory", get(analytics::inventory_analytics))
        .route("/api/analytics/customers", get(analytics::customer_analytics))
        .route("/api/analytics/sales-velocity", get(analytics::sales_velocity))
        .route("/api/analytics/gross-margin", get(analytics::gross_margin))
        .route("/api/analytics/forecast", get(analytics::forecast))
        .route("/api/analytics/advanced", post(analytics::advanced))
        .route("/api/alerts", get(analytics::alerts))
}

fn chat_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/conversations",
            get(chat::list_conversations).post(chat::create_conversation),
        )
        .route("/api/conversations/:id", get(chat::get_conversation))
        .route(
            "/api/conversations/:id/messages",
            get(chat::list_messages).post(chat::post_message),
        )
        .route("/api/chat/message", post(chat::send_message))
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    ai_enabled: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        ai_enabled: state.chat.is_available(),
    })
}

// ============================================================================
// Session endpoints
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsrfResponse {
    csrf_token: String,
}

/// Issue a CSRF token as both a cookie and a JSON body
async fn csrf_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<CsrfResponse>) {
    let token = csrf::generate_token(&state.config.csrf_secret);
    let secure = state
        .config
        .client_origin
        .split(',')
        .all(|origin| origin.trim().starts_with("https://"));

    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax);

    (jar.add(cookie), Json(CsrfResponse { csrf_token: token }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    user_id: Uuid,
    company_id: Uuid,
    role: Role,
    email: Option<String>,
}

async fn me_handler(Extension(auth): Extension<AuthenticatedUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: auth.user_id,
        company_id: auth.company_id,
        role: auth.role,
        email: auth.email,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::ai::model::scripted::ScriptedModel;
    use crate::ai::LanguageModel;
    use crate::config::Config;
    use crate::http::middleware::test_tokens;

    const JWT_SECRET: &str = "test-jwt-secret";

    struct Harness {
        server: MockServer,
        company: Uuid,
        user: Uuid,
    }

    impl Harness {
        async fn start() -> Self {
            Self {
                server: MockServer::start().await,
                company: Uuid::new_v4(),
                user: Uuid::new_v4(),
            }
        }

        fn router(&self) -> Router {
            build_router(AppState::with_model(
                Config::for_tests(&self.server.uri()),
                None,
            ))
        }

        fn router_with_model(&self, model: Arc<dyn LanguageModel>) -> Router {
            build_router(AppState::with_model(
                Config::for_tests(&self.server.uri()),
                Some(model),
            ))
        }

        fn token(&self, role: &str) -> String {
            test_tokens::for_company(self.user, self.company, role, JWT_SECRET)
        }

        fn get(&self, uri: &str, role: &str) -> Request<Body> {
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token(role)))
                .body(Body::empty())
                .unwrap()
        }

        fn json(&self, method: Method, uri: &str, role: &str, body: Value) -> Request<Body> {
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token(role)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let h = Harness::start().await;
        let response = h
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["ai_enabled"], false);
    }

    #[tokio::test]
    async fn api_requires_a_token() {
        let h = Harness::start().await;
        let response = h
            .router()
            .oneshot(Request::get("/api/inventory").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_reflects_the_token() {
        let h = Harness::start().await;
        let response = h.router().oneshot(h.get("/api/me", "admin")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["companyId"], h.company.to_string());
        assert_eq!(body["role"], "Admin");
    }

    #[tokio::test]
    async fn inventory_list_is_paginated() {
        let h = Harness::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/product_variants_with_details"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Range", "0-0/41")
                    .set_body_json(json!([{
                        "id": Uuid::new_v4(),
                        "product_id": Uuid::new_v4(),
                        "sku": "MUG-01",
                        "inventory_quantity": 3,
                        "reorder_point": 5
                    }])),
            )
            .expect(1)
            .mount(&h.server)
            .await;

        let response = h
            .router()
            .oneshot(h.get("/api/inventory?status=low_stock&page=2&limit=1", "member"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["totalCount"], 41);
        assert_eq!(body["page"], 2);
        assert_eq!(body["items"][0]["sku"], "MUG-01");
        assert_eq!(body["items"][0]["inventoryQuantity"], 3);
    }

    #[tokio::test]
    async fn malformed_requests_get_json_errors() {
        let h = Harness::start().await;
        let router = h.router();

        let bad_body = Request::post("/api/suppliers")
            .header(header::AUTHORIZATION, format!("Bearer {}", h.token("owner")))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.clone().oneshot(bad_body).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(body_json(response).await["error"].is_string());

        let wrong_shape = h.json(Method::POST, "/api/suppliers", "owner", json!({ "name": 42 }));
        let response = router.clone().oneshot(wrong_shape).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(response).await["error"].is_string());

        let response = router
            .oneshot(h.get("/api/products/not-a-uuid", "member"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(body_json(response)
            .await["error"]
            .as_str()
            .unwrap()
            .contains("UUID"));
    }

    #[tokio::test]
    async fn members_cannot_delete() {
        let h = Harness::start().await;
        let uri = format!("/api/suppliers/{}", Uuid::new_v4());
        let request = Request::delete(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", h.token("member")))
            .body(Body::empty())
            .unwrap();

        let response = h.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn invalid_days_are_rejected() {
        let h = Harness::start().await;
        let response = h
            .router()
            .oneshot(h.get("/api/analytics/dashboard?period=400", "member"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn advanced_forecast_includes_moving_average() {
        let h = Harness::start().await;
        let today = chrono::Utc::now().date_naive();
        let history: Vec<Value> = (0..7)
            .map(|d| {
                json!({
                    "sale_date": (today - chrono::Duration::days(d)).to_string(),
                    "total_quantity": 3
                })
            })
            .collect();
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_historical_sales_for_sku"))
            .respond_with(ResponseTemplate::new(200).set_body_json(history))
            .expect(1)
            .mount(&h.server)
            .await;

        let response = h
            .router()
            .oneshot(h.json(
                Method::POST,
                "/api/analytics/advanced",
                "member",
                json!({ "analysisType": "demand_forecast", "sku": "MUG-01" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["metadata"]["analysisType"], "demand-forecast");
        assert_eq!(body["data"][0]["sku"], "MUG-01");
        assert_eq!(body["data"][0]["dailyAverage"], 3.0);
        assert_eq!(body["data"][0]["movingAverageNext"], 3.0);
    }

    #[tokio::test]
    async fn cookie_sessions_need_a_csrf_token() {
        let h = Harness::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/suppliers"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": Uuid::new_v4(),
                "company_id": h.company,
                "name": "Acme",
                "created_at": "2024-05-01T00:00:00Z"
            }])))
            .expect(1)
            .mount(&h.server)
            .await;
        let router = h.router();

        let issued = router
            .clone()
            .oneshot(Request::get("/api/auth/csrf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(issued
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("csrf_token=")));
        let csrf_token = body_json(issued).await["csrfToken"]
            .as_str()
            .unwrap()
            .to_string();

        let cookies = format!("sb-access-token={}; csrf_token={}", h.token("owner"), csrf_token);
        let create = |with_header: bool| {
            let mut builder = Request::post("/api/suppliers")
                .header(header::COOKIE, cookies.clone())
                .header(header::CONTENT_TYPE, "application/json");
            if with_header {
                builder = builder.header(CSRF_HEADER, csrf_token.clone());
            }
            builder
                .body(Body::from(json!({ "name": "Acme" }).to_string()))
                .unwrap()
        };

        let rejected = router.clone().oneshot(create(false)).await.unwrap();
        assert_eq!(rejected.status(), StatusCode::FORBIDDEN);

        let accepted = router.oneshot(create(true)).await.unwrap();
        assert_eq!(accepted.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn purchase_orders_follow_the_state_machine() {
        let h = Harness::start().await;
        let po_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/rest/v1/purchase_orders_view"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": po_id,
                "po_number": "PO-1001",
                "status": "Received",
                "created_at": "2024-05-01T00:00:00Z"
            })))
            .mount(&h.server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&h.server)
            .await;

        let response = h
            .router()
            .oneshot(h.json(
                Method::PATCH,
                &format!("/api/purchase-orders/{}/status", po_id),
                "admin",
                json!({ "status": "Ordered" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("Received"));
    }

    #[tokio::test]
    async fn stale_status_updates_conflict() {
        let h = Harness::start().await;
        let po_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/rest/v1/purchase_orders_view"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": po_id,
                "po_number": "PO-1002",
                "status": "Ordered",
                "created_at": "2024-05-01T00:00:00Z"
            })))
            .mount(&h.server)
            .await;
        // another request already received the order, so nothing matches
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/purchase_orders"))
            .and(query_param("status", "eq.Ordered"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&h.server)
            .await;

        let response = h
            .router()
            .oneshot(h.json(
                Method::PATCH,
                &format!("/api/purchase-orders/{}/status", po_id),
                "admin",
                json!({ "status": "Cancelled" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn partial_import_reports_written_rows() {
        let h = Harness::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/batch_import_products"))
            .respond_with(ResponseTemplate::new(204))
            .up_to_n_times(1)
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/batch_import_products"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&h.server)
            .await;

        let mut csv = String::from("sku,title\n");
        for i in 0..=crate::import::BATCH_SIZE {
            csv.push_str(&format!("SKU-{i},Product {i}\n"));
        }
        let boundary = "import-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"dataType\"\r\n\r\nproducts\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"p.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
            b = boundary,
            csv = csv
        );
        let request = Request::post("/api/import")
            .header(header::AUTHORIZATION, format!("Bearer {}", h.token("admin")))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = h.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["written"], crate::import::BATCH_SIZE);
        assert_eq!(body["failedBatch"]["firstRow"], crate::import::BATCH_SIZE + 1);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn export_is_a_csv_attachment() {
        let h = Harness::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/suppliers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&h.server)
            .await;

        let response = h
            .router()
            .oneshot(h.get("/api/export/suppliers", "member"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"suppliers-"));

        let unknown = h
            .router()
            .oneshot(h.get("/api/export/payroll", "member"))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chat_without_a_model_is_unavailable() {
        let h = Harness::start().await;
        let response = h
            .router()
            .oneshot(h.json(
                Method::POST,
                "/api/chat/message",
                "member",
                json!({ "content": "How is stock looking?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn chat_replies_with_the_new_message() {
        let h = Harness::start().await;
        let conversation_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/rest/v1/conversations"))
            .respond_with(ResponseTemplate::new(406))
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/conversations"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": conversation_id,
                "user_id": h.user,
                "title": "Hello",
                "created_at": "2024-05-01T00:00:00Z"
            }])))
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/messages"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": Uuid::new_v4(),
                "conversation_id": conversation_id,
                "role": "assistant",
                "content": "All good.",
                "created_at": "2024-05-01T00:00:01Z"
            }])))
            .mount(&h.server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/conversations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&h.server)
            .await;

        let model: Arc<dyn LanguageModel> =
            Arc::new(ScriptedModel::new(vec![ScriptedModel::text("All good.")]));
        let response = h
            .router_with_model(model)
            .oneshot(h.json(
                Method::POST,
                "/api/chat/message",
                "member",
                json!({ "content": "Hello", "conversationId": conversation_id }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["conversationId"], conversation_id.to_string());
        assert_eq!(body["newMessage"]["role"], "assistant");
        assert_eq!(body["newMessage"]["content"], "All good.");
    }

    #[tokio::test]
    async fn shopify_webhook_is_public_but_signed() {
        let h = Harness::start().await;
        let request = Request::post("/api/webhooks/shopify")
            .header("X-Shopify-Topic", "orders/create")
            .body(Body::from("{}"))
            .unwrap();

        let response = h.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
