use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CountResponse, ExportResponse};
use crate::domain::order::{Order, OrderItemInput, OrderStatus};
use crate::errors::AppError;
use crate::Orders;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemDto {
    pub product_id: String,
    pub quantity: i32,
    /// Unit price captured when the order is placed.
    pub price_per_item: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub user_id: String,
    #[serde(default)]
    pub items: Vec<OrderItemDto>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub new_status: OrderStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub order_id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub items: Vec<OrderItemDto>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            order_id: o.order_id,
            user_id: o.user_id,
            status: o.status,
            total_amount: o.total_amount,
            items: o
                .items
                .into_iter()
                .map(|i| OrderItemDto {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    price_per_item: i.price_per_item,
                })
                .collect(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Creates an order and all of its items in a single transaction. The
/// total is fixed here from the supplied quantities and unit prices.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid order"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    orders: web::Data<Orders>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let items: Vec<OrderItemInput> = body
        .items
        .into_iter()
        .map(|i| OrderItemInput::new(i.product_id, i.quantity, i.price_per_item))
        .collect();

    let order = web::block(move || orders.create_order(&body.user_id, items)).await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{order_id}
///
/// Returns the order together with its items.
#[utoipa::path(
    get,
    path = "/orders/{order_id}",
    params(("order_id" = String, Path, description = "Order identifier")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    orders: web::Data<Orders>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || orders.get_order(&order_id)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PUT /orders/{order_id}/status
///
/// Statuses outside the known set are rejected with 400.
#[utoipa::path(
    put,
    path = "/orders/{order_id}/status",
    params(("order_id" = String, Path, description = "Order identifier")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    orders: web::Data<Orders>,
    path: web::Path<String>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let new_status = body.into_inner().new_status;

    let order =
        web::block(move || orders.update_order_status(&order_id, new_status)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders/count
#[utoipa::path(
    get,
    path = "/orders/count",
    responses(
        (status = 200, description = "Number of stored orders", body = CountResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn count_orders(orders: web::Data<Orders>) -> Result<HttpResponse, AppError> {
    let count = web::block(move || orders.count_orders()).await??;
    Ok(HttpResponse::Ok().json(CountResponse { count }))
}

/// GET /orders/export
///
/// Every order with its items nested under `items`; `status` is the stored
/// integer code.
#[utoipa::path(
    get,
    path = "/orders/export",
    responses(
        (status = 200, description = "Snapshot of orders and their items", body = ExportResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn export_orders(orders: web::Data<Orders>) -> Result<HttpResponse, AppError> {
    let json_data = web::block(move || orders.export_orders()).await??;
    Ok(HttpResponse::Ok().json(ExportResponse { json_data }))
}
