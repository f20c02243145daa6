//! Product endpoints.
//!
//! ```text
//! POST   /products        create   → 201
//! GET    /products        list     → 200
//! GET    /products/{id}   get      → 200
//! PUT    /products/{id}   update   → 200
//! DELETE /products/{id}   delete   → 204
//! ```
//!
//! Every failure leaves through the classifier as an `ErrorResponse`.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::catalog::{Product, ProductId};
use crate::failure::{ErrorResponse, Failure};
use crate::http::request::{invalid_path, malformed_body, ProductRequest};
use crate::http::server::AppState;

type ApiResult<T> = Result<T, ErrorResponse>;

fn product_id(path: Result<Path<i64>, PathRejection>) -> Result<ProductId, Failure> {
    path.map(|Path(id)| ProductId(id)).map_err(invalid_path)
}

fn product_body(
    body: Result<Json<ProductRequest>, JsonRejection>,
    id: Option<ProductId>,
) -> Result<Product, Failure> {
    let Json(request) = body.map_err(malformed_body)?;
    request.into_product(id)
}

pub async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = product_body(body, None).map_err(|f| state.reject(&f))?;
    let created = state.service.create(product).await.map_err(|f| state.reject(&f))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    let products = state.service.list().await.map_err(|f| state.reject(&f))?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Product>> {
    let id = product_id(path).map_err(|f| state.reject(&f))?;
    let product = state.service.get_by_id(id).await.map_err(|f| state.reject(&f))?;
    Ok(Json(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let id = product_id(path).map_err(|f| state.reject(&f))?;
    let product = product_body(body, Some(id)).map_err(|f| state.reject(&f))?;
    let updated = state.service.update(product).await.map_err(|f| state.reject(&f))?;
    Ok(Json(updated))
}

pub async fn delete_product(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = product_id(path).map_err(|f| state.reject(&f))?;
    state.service.delete(id).await.map_err(|f| state.reject(&f))?;
    Ok(StatusCode::NO_CONTENT)
}
