use actix_web::{get, web, HttpResponse, Responder, Result};
use storefront_api::auth::Identity;
use storefront_api::services;
use storefront_api::store::Store;

#[get("/api/profile/counts")]
async fn get_counts(store: web::Data<dyn Store>, identity: Identity) -> Result<impl Responder> {
    let counts =
        web::block(move || services::profile_counts(store.get_ref(), &identity)).await??;
    Ok(HttpResponse::Ok().json(counts))
}
