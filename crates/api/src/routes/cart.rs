//! Session cart endpoints.
//!
//! Every endpoint responds with the cart as it stands after the operation.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use common::ProductId;
use domain::Cart;
use serde::{Deserialize, Serialize};
use store::ShopStore;

use super::AppState;
use crate::error::ApiError;
use crate::session::Session;

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct AddToCartRequest {
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub total_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub line_total_cents: i64,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineResponse {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    unit_price_cents: line.unit_price.cents(),
                    quantity: line.quantity,
                    line_total_cents: line.line_total().cents(),
                })
                .collect(),
            total_cents: cart.total().cents(),
        }
    }
}

fn respond(session: Session, cart: &Cart) -> Response {
    let mut response = Json(CartResponse::from(cart)).into_response();
    session.attach(&mut response);
    response
}

// -- Handlers --

/// GET /cart
#[tracing::instrument(skip(state, headers))]
pub async fn view<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let session = Session::from_headers(&headers);
    let cart = state.cart_service.view(session.id).await?;
    Ok(respond(session, &cart))
}

/// POST /cart/add/{product_id}, with an optional `{"quantity": n}` body.
#[tracing::instrument(skip(state, headers, body))]
pub async fn add<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let product_id = parse_product_id(&product_id)?;
    let req: AddToCartRequest = if body.iter().all(u8::is_ascii_whitespace) {
        AddToCartRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };

    let session = Session::from_headers(&headers);
    let cart = state
        .cart_service
        .add(session.id, product_id, req.quantity)
        .await?;
    Ok(respond(session, &cart))
}

/// POST /cart/update
#[tracing::instrument(skip(state, headers, req))]
pub async fn update<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<UpdateCartRequest>,
) -> Result<Response, ApiError> {
    let session = Session::from_headers(&headers);
    let cart = state
        .cart_service
        .update(session.id, req.product_id, req.quantity)
        .await?;
    Ok(respond(session, &cart))
}

/// POST /cart/remove/{product_id}
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let product_id = parse_product_id(&product_id)?;
    let session = Session::from_headers(&headers);
    let cart = state.cart_service.remove(session.id, product_id).await?;
    Ok(respond(session, &cart))
}

/// POST /cart/clear
#[tracing::instrument(skip(state, headers))]
pub async fn clear<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let session = Session::from_headers(&headers);
    let cart = state.cart_service.clear(session.id).await?;
    Ok(respond(session, &cart))
}

fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    id.parse::<i64>()
        .map(ProductId::new)
        .map_err(|e| ApiError::BadRequest(format!("Invalid product id: {e}")))
}
