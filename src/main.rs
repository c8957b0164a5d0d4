mod controllers {
    pub mod basket;
    pub mod orders;
    pub mod products;
    pub mod profile;
    pub mod reviews;
    pub mod wishlist;

    #[cfg(test)]
    pub mod test_support;
}
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use controllers::basket;
use controllers::orders;
use controllers::products;
use controllers::profile;
use controllers::reviews;
use controllers::wishlist;
use dotenvy::dotenv;
use std::io;
use std::sync::Arc;
use storefront_api::auth::{initialize_redis_pool, IdentityProvider, RedisSessions};
use storefront_api::config::AppConfig;
use storefront_api::store::{initialize_db_pool, PgStore, Store};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))
        .map_err(io::Error::other)?;
    let db_pool = initialize_db_pool(&config.database_url)
        .inspect_err(|e| error!("Failed to initialize database pool: {}", e))
        .map_err(io::Error::other)?;
    let redis_pool = initialize_redis_pool(&config.redis_url)
        .inspect_err(|e| error!("Failed to initialize session store: {}", e))
        .map_err(io::Error::other)?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(db_pool));
    let identities: Arc<dyn IdentityProvider> =
        Arc::new(RedisSessions::new(redis_pool, Arc::clone(&store)));

    info!("Listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::from(Arc::clone(&store)))
            .app_data(web::Data::from(Arc::clone(&identities)))
            .configure(routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

pub(crate) fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(products::get_products)
        .service(products::get_product)
        .service(products::delete_product)
        .service(basket::get_basket)
        .service(basket::add_to_basket)
        .service(basket::remove_from_basket)
        .service(basket::update_basket)
        .service(basket::checkout)
        .service(orders::get_orders)
        .service(orders::create_order)
        .service(orders::get_order)
        .service(orders::update_order)
        .service(orders::delete_order)
        .service(reviews::get_reviews)
        .service(reviews::create_review)
        .service(reviews::get_review)
        .service(reviews::update_review)
        .service(reviews::delete_review)
        .service(wishlist::get_wishlist)
        .service(wishlist::toggle_wishlist)
        .service(profile::get_counts);
}
