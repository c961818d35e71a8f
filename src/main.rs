use std::net::TcpListener;

use catalog_service::{build_server, create_pool, init_storage, Config};
use dotenvy::dotenv;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(std::io::Error::other)?;

    let pool = create_pool(&config.database_url, config.pool_size)
        .map_err(std::io::Error::other)?;
    init_storage(&pool).map_err(std::io::Error::other)?;

    let listener = TcpListener::bind((config.host.as_str(), config.port))?;
    log::info!(
        "Starting server at http://{} ({} workers, database {})",
        listener.local_addr()?,
        config.workers,
        config.database_url
    );

    build_server(pool, listener, config.workers)?.await?;

    log::info!("Server stopped");
    Ok(())
}
