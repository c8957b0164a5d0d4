use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder, Result};
use serde_json::json;
use storefront_api::auth::Identity;
use storefront_api::errors::AppError;
use storefront_api::services::wishlist;
use storefront_api::store::Store;

fn is_ajax(req: &HttpRequest) -> bool {
    req.headers()
        .get("X-Requested-With")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == "XMLHttpRequest")
}

#[get("/api/wishlist")]
async fn get_wishlist(store: web::Data<dyn Store>, identity: Identity) -> Result<impl Responder> {
    let (items, count) = web::block(move || {
        let items = wishlist::entries(store.get_ref(), &identity)?;
        let count = wishlist::count(store.get_ref(), identity.user_id)?;
        Ok::<_, AppError>((items, count))
    })
    .await??;
    Ok(HttpResponse::Ok().json(json!({ "items": items, "count": count })))
}

/// Scripted callers get the new state as JSON; plain form posts are sent
/// back to the wishlist page.
#[post("/api/wishlist/toggle/{product_id}")]
async fn toggle_wishlist(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    identity: Identity,
    product_id: web::Path<i32>,
) -> Result<impl Responder> {
    let outcome =
        web::block(move || wishlist::toggle(store.get_ref(), &identity, *product_id)).await??;
    if is_ajax(&req) {
        return Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "action": outcome.action,
            "count": outcome.count,
        })));
    }
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/wishlist"))
        .finish())
}
