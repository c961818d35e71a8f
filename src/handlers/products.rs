use std::ops::ControlFlow;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use utoipa::ToSchema;

use super::{CountResponse, ExportResponse};
use crate::domain::product::{Product, ProductInput};
use crate::errors::AppError;
use crate::Products;

/// Products buffered between the storage scan and the response body.
const STREAM_BUFFER: usize = 32;

/// Body limit for `POST /products/import`. Export documents grow with the
/// catalog, so this route does not use the default 2 MiB JSON limit.
pub const IMPORT_BODY_LIMIT: usize = 256 * 1024 * 1024;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            product_id: p.product_id,
            name: p.name,
            description: p.description,
            price: p.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteProductResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportProductsRequest {
    /// A document in the shape produced by `GET /products/export`.
    pub json_data: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /products
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product fields"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn create_product(
    products: web::Data<Products>,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let input = ProductInput::new(body.name, body.description, body.price);

    let product = web::block(move || products.create_product(input)).await??;

    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// GET /products/{product_id}
#[utoipa::path(
    get,
    path = "/products/{product_id}",
    params(("product_id" = String, Path, description = "Product identifier")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn get_product(
    products: web::Data<Products>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    let product = web::block(move || products.get_product(&product_id)).await??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// PUT /products/{product_id}
///
/// Overwrites name, description and price.
#[utoipa::path(
    put,
    path = "/products/{product_id}",
    params(("product_id" = String, Path, description = "Product identifier")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid product fields"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn update_product(
    products: web::Data<Products>,
    path: web::Path<String>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let body = body.into_inner();
    let input = ProductInput::new(body.name, body.description, body.price);

    let product = web::block(move || products.update_product(&product_id, input)).await??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// DELETE /products/{product_id}
///
/// A missing product is `success: false`, not an error.
#[utoipa::path(
    delete,
    path = "/products/{product_id}",
    params(("product_id" = String, Path, description = "Product identifier")),
    responses(
        (status = 200, description = "Whether a product was removed", body = DeleteProductResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn delete_product(
    products: web::Data<Products>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    let success = web::block(move || products.delete_product(&product_id)).await??;

    Ok(HttpResponse::Ok().json(DeleteProductResponse { success }))
}

/// GET /products
///
/// Streams every product as newline-delimited JSON while the table is being
/// scanned. A storage fault part-way through aborts the response.
#[utoipa::path(
    get,
    path = "/products",
    responses(
        (status = 200, description = "One product per line", content_type = "application/x-ndjson", body = [ProductResponse]),
    ),
    tag = "products"
)]
pub async fn list_products(products: web::Data<Products>) -> HttpResponse {
    let (tx, rx) = mpsc::channel::<Result<web::Bytes, AppError>>(STREAM_BUFFER);

    actix_web::rt::spawn(async move {
        let scan_tx = tx.clone();
        let outcome = web::block(move || {
            products.stream_products(|product| {
                let line = serde_json::to_vec(&ProductResponse::from(product))
                    .map(|mut line| {
                        line.push(b'\n');
                        web::Bytes::from(line)
                    })
                    .map_err(|e| AppError::Internal(e.to_string()));
                let failed = line.is_err();
                // A closed channel means the client went away.
                if scan_tx.blocking_send(line).is_err() || failed {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
        })
        .await;

        let err = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => AppError::from(e),
            Err(e) => AppError::from(e),
        };
        log::error!("product stream aborted: {}", err);
        let _ = tx.send(Err(err)).await;
    });

    let body = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });

    HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .streaming(body)
}

/// GET /products/count
#[utoipa::path(
    get,
    path = "/products/count",
    responses(
        (status = 200, description = "Number of stored products", body = CountResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn count_products(products: web::Data<Products>) -> Result<HttpResponse, AppError> {
    let count = web::block(move || products.count_products()).await??;
    Ok(HttpResponse::Ok().json(CountResponse { count }))
}

/// GET /products/export
#[utoipa::path(
    get,
    path = "/products/export",
    responses(
        (status = 200, description = "Snapshot of the products table", body = ExportResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn export_products(products: web::Data<Products>) -> Result<HttpResponse, AppError> {
    let json_data = web::block(move || products.export_products()).await??;
    Ok(HttpResponse::Ok().json(ExportResponse { json_data }))
}

/// POST /products/import
///
/// Creates one product per record, all or nothing. Identifiers in the
/// document are not reused.
#[utoipa::path(
    post,
    path = "/products/import",
    request_body = ImportProductsRequest,
    responses(
        (status = 201, description = "Number of products created", body = CountResponse),
        (status = 400, description = "Malformed document or invalid record"),
        (status = 413, description = "Document larger than the import limit"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn import_products(
    products: web::Data<Products>,
    body: web::Json<ImportProductsRequest>,
) -> Result<HttpResponse, AppError> {
    let document = body.into_inner().json_data;

    let imported = web::block(move || products.import_products(&document)).await??;

    Ok(HttpResponse::Created().json(CountResponse {
        count: imported as i64,
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use actix_web::body::MessageBody;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::configure;
    use crate::handlers::test_support::app_state;
    use crate::infrastructure::test_support::TempDb;

    macro_rules! init_app {
        ($db:expr) => {{
            let (products, orders) = app_state(&$db);
            test::init_service(
                App::new()
                    .app_data(products)
                    .app_data(orders)
                    .configure(configure),
            )
            .await
        }};
    }

    fn create(name: &str, description: &str, price: f64) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/products")
            .set_json(json!({ "name": name, "description": description, "price": price }))
    }

    #[actix_web::test]
    async fn create_then_get_returns_the_same_product() {
        let db = TempDb::new();
        let app = init_app!(db);

        let resp = test::call_service(&app, create("Lamp", "Desk lamp", 24.5).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: ProductResponse = test::read_body_json(resp).await;
        assert!(created.product_id.starts_with("prod-"));

        let req = test::TestRequest::get()
            .uri(&format!("/products/{}", created.product_id))
            .to_request();
        let fetched: ProductResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(fetched, created);
    }

    #[actix_web::test]
    async fn description_defaults_to_empty() {
        let db = TempDb::new();
        let app = init_app!(db);

        let req = test::TestRequest::post()
            .uri("/products")
            .set_json(json!({ "name": "Plain", "price": 1.0 }))
            .to_request();
        let created: ProductResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(created.description, "");
    }

    #[actix_web::test]
    async fn unknown_product_is_404_with_message() {
        let db = TempDb::new();
        let app = init_app!(db);

        let req = test::TestRequest::get().uri("/products/prod-missing").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Product not found.");

        let req = test::TestRequest::put()
            .uri("/products/prod-missing")
            .set_json(json!({ "name": "X", "description": "", "price": 1.0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Product not found to update.");
    }

    #[actix_web::test]
    async fn update_overwrites_fields() {
        let db = TempDb::new();
        let app = init_app!(db);
        let created: ProductResponse =
            test::call_and_read_body_json(&app, create("Lamp", "Desk lamp", 24.5).to_request())
                .await;

        let req = test::TestRequest::put()
            .uri(&format!("/products/{}", created.product_id))
            .set_json(json!({ "name": "Floor lamp", "description": "Tall", "price": 80.0 }))
            .to_request();
        let updated: ProductResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(
            updated,
            ProductResponse {
                product_id: created.product_id,
                name: "Floor lamp".to_string(),
                description: "Tall".to_string(),
                price: 80.0,
            }
        );
    }

    #[actix_web::test]
    async fn delete_reports_success_flag() {
        let db = TempDb::new();
        let app = init_app!(db);
        let created: ProductResponse =
            test::call_and_read_body_json(&app, create("Lamp", "", 1.0).to_request()).await;
        let uri = format!("/products/{}", created.product_id);

        let first: DeleteProductResponse = test::call_and_read_body_json(
            &app,
            test::TestRequest::delete().uri(&uri).to_request(),
        )
        .await;
        let second: DeleteProductResponse = test::call_and_read_body_json(
            &app,
            test::TestRequest::delete().uri(&uri).to_request(),
        )
        .await;

        assert!(first.success);
        assert!(!second.success);
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn invalid_fields_and_malformed_bodies_are_400() {
        let db = TempDb::new();
        let app = init_app!(db);

        let resp = test::call_service(&app, create("Lamp", "", -3.0).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/products")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"name\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn list_streams_one_product_per_line() {
        let db = TempDb::new();
        let app = init_app!(db);
        let mut expected = HashSet::new();
        for name in ["A", "B", "C"] {
            let created: ProductResponse =
                test::call_and_read_body_json(&app, create(name, "", 1.0).to_request()).await;
            expected.insert(created.product_id);
        }

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/products").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/x-ndjson"
        );
        let body = test::read_body(resp).await;
        let listed: HashSet<String> = std::str::from_utf8(&body)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str::<ProductResponse>(line).unwrap().product_id)
            .collect();

        assert_eq!(listed, expected);
    }

    #[actix_web::test]
    async fn list_of_empty_catalog_is_an_empty_body() {
        let db = TempDb::new();
        let app = init_app!(db);

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/products").to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(test::read_body(resp).await.is_empty());
    }

    #[actix_web::test]
    async fn count_export_and_import() {
        let db = TempDb::new();
        let app = init_app!(db);
        for (name, price) in [("A", 1.0), ("B", 2.5)] {
            test::call_service(&app, create(name, "x", price).to_request()).await;
        }

        let count: CountResponse = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/products/count").to_request(),
        )
        .await;
        assert_eq!(count.count, 2);

        let export: ExportResponse = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/products/export").to_request(),
        )
        .await;
        let records: Vec<Value> = serde_json::from_str(&export.json_data).unwrap();
        assert_eq!(records.len(), 2);

        let req = test::TestRequest::post()
            .uri("/products/import")
            .set_json(json!({ "json_data": export.json_data }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let imported: CountResponse = test::read_body_json(resp).await;
        assert_eq!(imported.count, 2);

        let count: CountResponse = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/products/count").to_request(),
        )
        .await;
        assert_eq!(count.count, 4);
    }

    #[actix_web::test]
    async fn malformed_import_document_is_400() {
        let db = TempDb::new();
        let app = init_app!(db);

        let req = test::TestRequest::post()
            .uri("/products/import")
            .set_json(json!({ "json_data": "[{\"name\": \"A\"" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn import_accepts_documents_over_the_default_json_limit() {
        let db = TempDb::new();
        let app = init_app!(db);

        let description = "d".repeat(1024);
        let records: Vec<Value> = (0..3000)
            .map(|i| json!({ "product_id": format!("prod-{i:08x}"), "name": format!("P{i}"), "description": description, "price": 1.5 }))
            .collect();
        let document = serde_json::to_string(&records).unwrap();
        assert!(document.len() > 2 * 1024 * 1024);

        let req = test::TestRequest::post()
            .uri("/products/import")
            .set_json(json!({ "json_data": document }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let imported: CountResponse = test::read_body_json(resp).await;
        assert_eq!(imported.count, 3000);
    }

    #[actix_web::test]
    async fn oversized_body_on_other_routes_is_413() {
        let db = TempDb::new();
        let app = init_app!(db);

        let description = "d".repeat(3 * 1024 * 1024);
        let resp = test::call_service(&app, create("Huge", &description, 1.0).to_request()).await;

        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("2097152"));
    }

    #[actix_web::test]
    async fn list_delivers_rows_before_the_scan_ends_and_stops_when_dropped() {
        let db = TempDb::new();
        let app = init_app!(db);
        let rows = STREAM_BUFFER * 8;
        let records: Vec<Value> = (0..rows)
            .map(|i| json!({ "name": format!("P{i}"), "price": 1.0 }))
            .collect();
        let req = test::TestRequest::post()
            .uri("/products/import")
            .set_json(json!({ "json_data": serde_json::to_string(&records).unwrap() }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let in_use = |db: &TempDb| {
            let state = db.pool.state();
            state.connections - state.idle_connections
        };

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/products").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let mut body = Box::pin(resp.into_body());
        let first = futures::future::poll_fn(|cx| body.as_mut().poll_next(cx))
            .await
            .expect("stream ended before the first row")
            .expect("first chunk failed");
        let first = std::str::from_utf8(&first).unwrap();
        serde_json::from_str::<ProductResponse>(first.trim_end()).unwrap();

        // The channel holds far fewer rows than the table, so the scan is
        // still parked on its connection.
        assert_eq!(in_use(&db), 1);

        drop(body);
        let mut waited = Duration::ZERO;
        while in_use(&db) != 0 {
            assert!(waited < Duration::from_secs(5), "scan kept running after the client left");
            actix_web::rt::time::sleep(Duration::from_millis(20)).await;
            waited += Duration::from_millis(20);
        }
    }
}
