use utoipa::OpenApi;

use crate::domain::order::OrderStatus;
use crate::handlers::orders::{
    CreateOrderRequest, OrderItemDto, OrderResponse, UpdateOrderStatusRequest,
};
use crate::handlers::products::{
    CreateProductRequest, DeleteProductResponse, ImportProductsRequest, ProductResponse,
    UpdateProductRequest,
};
use crate::handlers::{CountResponse, ExportResponse, HealthResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::list_products,
        crate::handlers::products::count_products,
        crate::handlers::products::export_products,
        crate::handlers::products::import_products,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::count_orders,
        crate::handlers::orders::export_orders,
    ),
    components(
        schemas(
            HealthResponse,
            CountResponse,
            ExportResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductResponse,
            DeleteProductResponse,
            ImportProductsRequest,
            OrderStatus,
            OrderItemDto,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            OrderResponse,
        )
    ),
    tags(
        (name = "health"),
        (name = "products", description = "Product catalog"),
        (name = "orders", description = "Orders and their items"),
    )
)]
pub struct ApiDoc;
