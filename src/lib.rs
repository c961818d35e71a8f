pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod openapi;
pub mod schema;

use std::net::TcpListener;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel::connection::SimpleConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::order_service::OrderService;
use application::product_service::ProductService;
use domain::errors::DomainError;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::product_repo::DieselProductRepository;

pub use config::Config;
pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type Products = ProductService<DieselProductRepository>;
pub type Orders = OrderService<DieselOrderRepository>;

/// Prepare the database behind `pool`: create any missing tables and switch
/// to WAL journaling so readers do not block the writer.
pub fn init_storage(pool: &DbPool) -> Result<(), DomainError> {
    let mut conn = pool.get()?;
    conn.batch_execute("PRAGMA journal_mode = WAL;")?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DomainError::Internal(format!("Failed to run database migrations: {e}")))?;
    Ok(())
}

/// Route table shared by the server and the handler tests. Expects
/// `web::Data<Products>` and `web::Data<Orders>` to be registered.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(errors::json_error))
    .route("/health", web::get().to(handlers::health))
    .service(
        web::scope("/products")
            .service(
                web::resource("")
                    .route(web::get().to(handlers::products::list_products))
                    .route(web::post().to(handlers::products::create_product)),
            )
            .route("/count", web::get().to(handlers::products::count_products))
            .route("/export", web::get().to(handlers::products::export_products))
            .service(
                web::resource("/import")
                    .app_data(
                        web::JsonConfig::default()
                            .limit(handlers::products::IMPORT_BODY_LIMIT)
                            .error_handler(errors::json_error),
                    )
                    .route(web::post().to(handlers::products::import_products)),
            )
            .service(
                web::resource("/{product_id}")
                    .route(web::get().to(handlers::products::get_product))
                    .route(web::put().to(handlers::products::update_product))
                    .route(web::delete().to(handlers::products::delete_product)),
            ),
    )
    .service(
        web::scope("/orders")
            .route("", web::post().to(handlers::orders::create_order))
            .route("/count", web::get().to(handlers::orders::count_orders))
            .route("/export", web::get().to(handlers::orders::export_orders))
            .route("/{order_id}", web::get().to(handlers::orders::get_order))
            .route(
                "/{order_id}/status",
                web::put().to(handlers::orders::update_order_status),
            ),
    )
    .service(
        SwaggerUi::new("/swagger-ui/{_:.*}")
            .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
    );
}

/// Build and return an actix-web `Server` serving on `listener` with
/// `workers` worker threads.
///
/// The caller is responsible for `.await`-ing (or spawning) the returned
/// server.
pub fn build_server(
    pool: DbPool,
    listener: TcpListener,
    workers: usize,
) -> std::io::Result<actix_web::dev::Server> {
    let products = web::Data::new(ProductService::new(DieselProductRepository::new(
        pool.clone(),
    )));
    let orders = web::Data::new(OrderService::new(DieselOrderRepository::new(pool)));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(products.clone())
            .app_data(orders.clone())
            .wrap(Logger::default())
            .configure(configure)
    })
    .workers(workers)
    .listen(listener)?
    .run())
}
