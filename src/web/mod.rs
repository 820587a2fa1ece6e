use std::{future::Future, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, State,
    },
    http::{HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{error, warn};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::{
    db::{Store, StoreError},
    ml::encoder::PropertyFeatures,
    models::{
        image::Image, location::Location, prediction::Prediction, property::Property,
        property_type::PropertyType, user::User,
    },
    services::predictions::{
        CombinedPrediction, PredictionError, PredictionService, PricePrediction,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub predictions: Arc<PredictionService>,
}

/// Request-boundary error, rendered as `{"detail": "..."}`.
#[derive(Debug, PartialEq)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) | StoreError::InvalidReference(_) => {
                ApiError::BadRequest(err.to_string())
            }
            StoreError::Database(_) | StoreError::Pool(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::PropertyNotFound(_) => ApiError::NotFound(err.to_string()),
            PredictionError::InvalidInput(detail) => ApiError::BadRequest(detail),
            PredictionError::Store(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            ApiError::BadRequest(detail) => {
                warn!("Bad request: {detail}");
                (StatusCode::BAD_REQUEST, detail)
            }
            ApiError::Internal(detail) => {
                error!("Internal error: {detail}");
                (StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// JSON request body; a malformed payload is answered through [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct JsonBody<T>(T);

/// Integer path segment, rejected through [`ApiError`] when it does not parse.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
struct Id<T>(T);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route("/users/:id", get(get_user))
        .route("/locations/", get(list_locations).post(create_location))
        .route("/locations/:id", get(get_location))
        .route(
            "/property_types/",
            get(list_property_types).post(create_property_type),
        )
        .route("/property_types/:id", get(get_property_type))
        .route("/properties/", get(list_properties).post(create_property))
        .route("/properties/:id", get(get_property))
        .route("/images/", get(list_images).post(create_image))
        .route("/images/:id", get(get_image))
        .route("/predict/sale/:property_id", get(predict_sale))
        .route("/predict/rent/:property_id", get(predict_rent))
        .route("/predict/cox", axum::routing::post(predict_cox_features))
        .route("/predict/cox/:property_id", get(predict_cox))
        .route("/predictions/", get(list_predictions))
        .route("/predictions/:property_id", get(get_prediction))
        .layer(middleware::from_fn(cors_layer))
        .with_state(state)
}

pub async fn start_http_server(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn cors_layer(req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        apply_cors_headers(response.headers_mut());
        *response.status_mut() = StatusCode::NO_CONTENT;
        response
    } else {
        let mut response = next.run(req).await;
        apply_cors_headers(response.headers_mut());
        response
    }
}

fn apply_cors_headers(headers: &mut axum::http::HeaderMap) {
    headers.insert(
        axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        axum::http::header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
    headers.insert(
        axum::http::header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
}

// Diesel is synchronous; keep it off the async workers.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ApiResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {e}")))?
}

async fn fetch<T, F>(entity: &'static str, f: F) -> ApiResult<Json<T>>
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Result<Option<T>, StoreError> + Send + 'static,
{
    blocking(move || f()?.ok_or_else(|| ApiError::NotFound(format!("{entity} not found"))))
        .await
        .map(Json)
}

async fn list<T, F>(f: F) -> ApiResult<Json<Vec<T>>>
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Result<Vec<T>, StoreError> + Send + 'static,
{
    blocking(move || Ok(f()?)).await.map(Json)
}

async fn create<T, F>(f: F) -> ApiResult<(StatusCode, Json<T>)>
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    blocking(move || Ok(f()?))
        .await
        .map(|created| (StatusCode::CREATED, Json(created)))
}

async fn predict<T, F>(f: F) -> ApiResult<Json<T>>
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Result<T, PredictionError> + Send + 'static,
{
    blocking(move || Ok(f()?)).await.map(Json)
}

async fn create_user(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<User>,
) -> ApiResult<(StatusCode, Json<User>)> {
    create(move || state.store.create_user(body)).await
}

async fn get_user(State(state): State<AppState>, Id(id): Id<i32>) -> ApiResult<Json<User>> {
    fetch("User", move || state.store.get_user(id)).await
}

async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    list(move || state.store.list_users()).await
}

async fn create_location(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Location>,
) -> ApiResult<(StatusCode, Json<Location>)> {
    create(move || state.store.create_location(body)).await
}

async fn get_location(
    State(state): State<AppState>,
    Id(id): Id<i32>,
) -> ApiResult<Json<Location>> {
    fetch("Location", move || state.store.get_location(id)).await
}

async fn list_locations(State(state): State<AppState>) -> ApiResult<Json<Vec<Location>>> {
    list(move || state.store.list_locations()).await
}

async fn create_property_type(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<PropertyType>,
) -> ApiResult<(StatusCode, Json<PropertyType>)> {
    create(move || state.store.create_property_type(body)).await
}

async fn get_property_type(
    State(state): State<AppState>,
    Id(id): Id<i32>,
) -> ApiResult<Json<PropertyType>> {
    fetch("PropertyType", move || state.store.get_property_type(id)).await
}

async fn list_property_types(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PropertyType>>> {
    list(move || state.store.list_property_types()).await
}

async fn create_property(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Property>,
) -> ApiResult<(StatusCode, Json<Property>)> {
    create(move || state.store.create_property(body)).await
}

async fn get_property(
    State(state): State<AppState>,
    Id(id): Id<i32>,
) -> ApiResult<Json<Property>> {
    fetch("Property", move || state.store.get_property(id)).await
}

async fn list_properties(State(state): State<AppState>) -> ApiResult<Json<Vec<Property>>> {
    list(move || state.store.list_properties()).await
}

async fn create_image(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Image>,
) -> ApiResult<(StatusCode, Json<Image>)> {
    create(move || state.store.create_image(body)).await
}

async fn get_image(State(state): State<AppState>, Id(id): Id<i32>) -> ApiResult<Json<Image>> {
    fetch("Image", move || state.store.get_image(id)).await
}

async fn list_images(State(state): State<AppState>) -> ApiResult<Json<Vec<Image>>> {
    list(move || state.store.list_images()).await
}

async fn predict_sale(
    State(state): State<AppState>,
    Id(property_id): Id<i32>,
) -> ApiResult<Json<PricePrediction>> {
    predict(move || state.predictions.predict_sale(property_id)).await
}

async fn predict_rent(
    State(state): State<AppState>,
    Id(property_id): Id<i32>,
) -> ApiResult<Json<PricePrediction>> {
    predict(move || state.predictions.predict_rent(property_id)).await
}

async fn predict_cox(
    State(state): State<AppState>,
    Id(property_id): Id<i32>,
) -> ApiResult<Json<CombinedPrediction>> {
    predict(move || state.predictions.predict_combined(property_id)).await
}

async fn predict_cox_features(
    State(state): State<AppState>,
    JsonBody(features): JsonBody<PropertyFeatures>,
) -> ApiResult<Json<CombinedPrediction>> {
    predict(move || state.predictions.predict_from_features(&features)).await
}

async fn get_prediction(
    State(state): State<AppState>,
    Id(property_id): Id<i32>,
) -> ApiResult<Json<Prediction>> {
    fetch("Prediction", move || state.store.get_prediction(property_id)).await
}

async fn list_predictions(State(state): State<AppState>) -> ApiResult<Json<Vec<Prediction>>> {
    list(move || state.store.list_predictions()).await
}
