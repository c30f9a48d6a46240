//! HTTP server for the storefront admin API.
//!
//! Thin axum adapters around the functions in [`crate::apis`]; all status
//! rules live in the core crate.

use axum::{
	extract::{rejection::JsonRejection, DefaultBodyLimit, FromRequest, Path, Request, State},
	http::{HeaderValue, StatusCode},
	response::Json,
	routing::{get, patch},
	Router,
};
use std::sync::Arc;
use std::time::Duration;
use storefront_config::ApiConfig;
use storefront_core::ShopEngine;
use storefront_types::{
	APIError, NewOrder, OrderListResponse, OrderResponse, TransitionsResponse,
	UpdateOrderStatusRequest, WorkflowResponse,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, Any, CorsLayer},
	timeout::TimeoutLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the shop engine for processing requests.
	pub engine: Arc<ShopEngine>,
}

/// JSON body extractor that reports malformed bodies as [`APIError`].
///
/// axum's own rejection answers 422 in plain text; here 422 is reserved for
/// transitions the workflow refuses.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
	Json<T>: FromRequest<S, Rejection = JsonRejection>,
	S: Send + Sync,
{
	type Rejection = APIError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		match Json::<T>::from_request(req, state).await {
			Ok(Json(value)) => Ok(Self(value)),
			Err(rejection) => Err(json_rejection(rejection)),
		}
	}
}

fn json_rejection(rejection: JsonRejection) -> APIError {
	tracing::debug!("Rejected request body: {}", rejection.body_text());
	if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
		return APIError::PayloadTooLarge {
			error_type: "PAYLOAD_TOO_LARGE".to_string(),
			message: "Request body exceeds the configured limit".to_string(),
		};
	}
	APIError::BadRequest {
		error_type: "INVALID_REQUEST".to_string(),
		message: rejection.body_text(),
		details: None,
	}
}

/// Builds the router with every route under `/api`.
pub fn router(api_config: &ApiConfig, engine: Arc<ShopEngine>) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", get(handle_list_orders).post(handle_create_order))
				.route("/orders/{id}", get(handle_get_order_by_id))
				.route("/orders/{id}/transitions", get(handle_get_transitions))
				.route("/orders/{id}/status", patch(handle_update_status))
				.route("/order-statuses", get(handle_workflow)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(cors_layer(api_config))
				.layer(TimeoutLayer::with_status_code(
					StatusCode::REQUEST_TIMEOUT,
					Duration::from_secs(api_config.timeout_seconds),
				))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(AppState { engine })
}

/// Permissive unless specific origins are configured.
fn cors_layer(api_config: &ApiConfig) -> CorsLayer {
	let Some(cors) = &api_config.cors else {
		return CorsLayer::permissive();
	};

	let origins: Vec<HeaderValue> = cors
		.allowed_origins
		.iter()
		.filter_map(|origin| match origin.parse() {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!("Ignoring invalid CORS origin: {}", origin);
				None
			},
		})
		.collect();

	CorsLayer::new()
		.allow_origin(AllowOrigin::list(origins))
		.allow_methods(Any)
		.allow_headers(Any)
}

/// Starts the HTTP server for the API and serves until the process stops.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<ShopEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(&api_config, engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Storefront API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::warn!("Failed to listen for shutdown signal: {}", e);
			}
		})
		.await?;

	Ok(())
}

/// Handles GET /api/orders requests.
async fn handle_list_orders(
	State(state): State<AppState>,
) -> Result<Json<OrderListResponse>, APIError> {
	crate::apis::order::list_orders(&state.engine).await.map(Json)
}

/// Handles POST /api/orders requests.
async fn handle_create_order(
	State(state): State<AppState>,
	ApiJson(request): ApiJson<NewOrder>,
) -> Result<(StatusCode, Json<OrderResponse>), APIError> {
	let order = crate::apis::order::create_order(request, &state.engine).await?;
	Ok((StatusCode::CREATED, Json(order)))
}

/// Handles GET /api/orders/{id} requests.
async fn handle_get_order_by_id(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<OrderResponse>, APIError> {
	match crate::apis::order::get_order_by_id(&id, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order retrieval failed: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/orders/{id}/transitions requests.
async fn handle_get_transitions(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<TransitionsResponse>, APIError> {
	crate::apis::order::get_transitions(&id, &state.engine)
		.await
		.map(Json)
}

/// Handles PATCH /api/orders/{id}/status requests.
async fn handle_update_status(
	Path(id): Path<String>,
	State(state): State<AppState>,
	ApiJson(request): ApiJson<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, APIError> {
	crate::apis::order::update_order_status(&id, request, &state.engine)
		.await
		.map(Json)
}

/// Handles GET /api/order-statuses requests.
async fn handle_workflow() -> Json<WorkflowResponse> {
	Json(crate::apis::status::get_workflow())
}
