//! Order placement, listing, editing and deletion endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderItemId, ProductId};
use domain::{
    DomainError, LineEdit, OrderDetails, OrderEditForm, SelectableProduct, Selection,
};
use serde::{Deserialize, Serialize};
use store::{Order, ShopStore};

use super::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<SelectionRequest>,
}

/// One row of the order form, echoed back when checkout is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct EditOrderRequest {
    /// Version from the edit form; omit to overwrite whatever is stored.
    pub version: Option<i64>,
    pub items: Vec<LineEditRequest>,
}

#[derive(Debug, Deserialize)]
pub struct LineEditRequest {
    pub order_item_id: OrderItemId,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub order_date: DateTime<Utc>,
    pub version: i64,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        Self {
            id: details.id,
            order_date: details.order_date,
            version: details.version,
            items: details
                .lines
                .into_iter()
                .map(|line| OrderItemResponse {
                    id: line.item.id,
                    product_id: line.item.product_id,
                    product_name: line.product_name,
                    quantity: line.item.quantity,
                    unit_price_cents: line.item.unit_price.cents(),
                    line_total_cents: line.line_total.cents(),
                })
                .collect(),
            total_cents: details.total.cents(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SelectableProductResponse {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price_cents: i64,
    pub stock: u32,
    pub selected: bool,
    pub quantity: u32,
}

impl From<SelectableProduct> for SelectableProductResponse {
    fn from(p: SelectableProduct) -> Self {
        Self {
            product_id: p.product_id,
            name: p.name,
            unit_price_cents: p.unit_price.cents(),
            stock: p.stock,
            selected: p.selected,
            quantity: p.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EditFormResponse {
    pub id: OrderId,
    pub order_date: DateTime<Utc>,
    pub version: i64,
    pub items: Vec<EditableLineResponse>,
}

#[derive(Debug, Serialize)]
pub struct EditableLineResponse {
    pub order_item_id: OrderItemId,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

impl From<OrderEditForm> for EditFormResponse {
    fn from(form: OrderEditForm) -> Self {
        Self {
            id: form.id,
            order_date: form.order_date,
            version: form.version,
            items: form
                .items
                .into_iter()
                .map(|line| EditableLineResponse {
                    order_item_id: line.order_item_id,
                    product_name: line.product_name,
                    unit_price_cents: line.unit_price.cents(),
                    quantity: line.quantity,
                })
                .collect(),
        }
    }
}

/// Body of a rejected checkout: every violation plus the submitted form.
#[derive(Debug, Serialize)]
pub struct CheckoutRejectedResponse {
    pub errors: Vec<String>,
    pub items: Vec<SelectionRequest>,
}

// -- Handlers --

/// GET /orders: every order, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.order_service.list().await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/create: the catalog as an empty order form.
#[tracing::instrument(skip(state))]
pub async fn create_form<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<SelectableProductResponse>>, ApiError> {
    let products = state.checkout_service.selectable_products().await?;
    Ok(Json(
        products
            .into_iter()
            .map(SelectableProductResponse::from)
            .collect(),
    ))
}

/// POST /orders/create: places an order from the submitted selections.
///
/// Rows sent with `"selected": false` are ignored.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Response, ApiError> {
    let selections: Vec<Selection> = req
        .items
        .iter()
        .filter(|item| item.selected.unwrap_or(true))
        .map(|item| Selection::new(item.product_id, item.quantity))
        .collect();

    let order = match state.checkout_service.checkout(&selections).await {
        Ok(order) => order,
        Err(DomainError::Validation(errors)) => {
            let body = CheckoutRejectedResponse {
                errors: errors.messages(),
                items: req.items,
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let reread = state.order_service.get_details(order.id).await;
    Ok(created_response(order, reread))
}

/// 201 for a committed order. The order is already stored, so a failed
/// re-read only costs the product names in the body.
fn created_response(order: Order, reread: Result<OrderDetails, DomainError>) -> Response {
    let location = format!("/orders/{}", order.id);
    let details = match reread {
        Ok(details) => details,
        Err(e) => {
            tracing::warn!(order_id = %order.id, error = %e, "placed order could not be re-read");
            OrderDetails::new(order, &HashMap::new())
        }
    };

    (
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(OrderResponse::from(details)),
    )
        .into_response()
}

/// GET /orders/{id}, also served as the delete confirmation.
#[tracing::instrument(skip(state))]
pub async fn get<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let details = state.order_service.get_details(order_id).await?;
    Ok(Json(details.into()))
}

/// GET /orders/{id}/edit
#[tracing::instrument(skip(state))]
pub async fn edit_form<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<EditFormResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let form = state.order_service.get_for_edit(order_id).await?;
    Ok(Json(form.into()))
}

/// POST /orders/{id}/edit
#[tracing::instrument(skip(state, req))]
pub async fn edit<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<EditOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let edits: Vec<LineEdit> = req
        .items
        .iter()
        .map(|item| {
            LineEdit::new(
                item.order_item_id,
                item.quantity,
                Money::from_cents(item.unit_price_cents),
            )
        })
        .collect();

    let details = state
        .order_service
        .edit(order_id, req.version, &edits)
        .await?;
    Ok(Json(details.into()))
}

/// POST /orders/{id}/delete: succeeds whether or not the order existed.
#[tracing::instrument(skip(state))]
pub async fn delete<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_order_id(&id)?;
    state.order_service.delete(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse::<i64>()
        .map(OrderId::new)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}

#[cfg(test)]
mod tests {
    use store::{OrderItem, StoreError};

    use super::*;

    fn placed_order() -> Order {
        let order_id = OrderId::new(7);
        Order {
            id: order_id,
            order_date: Utc::now(),
            version: 1,
            items: vec![OrderItem {
                id: OrderItemId::new(1),
                order_id,
                product_id: ProductId::new(3),
                quantity: 3,
                unit_price: Money::from_cents(4999),
            }],
        }
    }

    #[tokio::test]
    async fn test_failed_reread_still_reports_created() {
        let response = created_response(
            placed_order(),
            Err(DomainError::Store(StoreError::Unavailable(
                "connection reset".to_string(),
            ))),
        );

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[LOCATION], "/orders/7");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["total_cents"], 14997);
        assert_eq!(json["items"][0]["product_name"], "");
    }
}
