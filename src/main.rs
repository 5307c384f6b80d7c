use actix_web::{App, HttpServer, middleware, web};

use quorum::db;
use quorum::handlers;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    // Ensure data directory exists for the default database location
    std::fs::create_dir_all("data").expect("Failed to create data directory");

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:data/quorum.db".to_string());
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let pool = db::init_pool(&database_url)
        .await
        .expect("Failed to open database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .configure(handlers::configure)
            // Default 404 handler (must be registered last)
            .default_service(web::to(|| async {
                actix_web::HttpResponse::NotFound()
                    .json(serde_json::json!({ "error": "Not found" }))
            }))
    })
    .bind(bind_addr)?
    .run()
    .await
}
