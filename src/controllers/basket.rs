use actix_web::{get, post, web, HttpResponse, Responder, Result};
use serde::Deserialize;
use serde_json::json;
use storefront_api::auth::Identity;
use storefront_api::errors::AppError;
use storefront_api::services::{basket, orders};
use storefront_api::store::Store;

/// Forms post the quantity as text, scripts as a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Quantity {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
struct UpdateBasketBody {
    quantity: Option<Quantity>,
}

impl UpdateBasketBody {
    fn quantity(&self) -> std::result::Result<i64, AppError> {
        match &self.quantity {
            None => Ok(1),
            Some(Quantity::Number(n)) => Ok(*n),
            Some(Quantity::Text(raw)) => Ok(i64::from(basket::parse_quantity(raw)?)),
        }
    }
}

fn basket_changed(count: i64) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "basket_items_count": count }))
}

#[get("/api/basket")]
async fn get_basket(store: web::Data<dyn Store>, identity: Identity) -> Result<impl Responder> {
    let (items, summary) = web::block(move || {
        let items = basket::lines(store.get_ref(), &identity)?;
        let summary = basket::summary(store.get_ref(), identity.user_id)?;
        Ok::<_, AppError>((items, summary))
    })
    .await??;
    Ok(HttpResponse::Ok().json(json!({
        "items": items,
        "total": summary.total,
        "basket_items_count": summary.count,
    })))
}

#[post("/api/basket/add/{product_id}")]
async fn add_to_basket(
    store: web::Data<dyn Store>,
    identity: Identity,
    product_id: web::Path<i32>,
) -> Result<impl Responder> {
    let count = web::block(move || {
        basket::add(store.get_ref(), &identity, *product_id)?;
        basket::count(store.get_ref(), identity.user_id)
    })
    .await??;
    Ok(basket_changed(count))
}

#[post("/api/basket/remove/{entry_id}")]
async fn remove_from_basket(
    store: web::Data<dyn Store>,
    identity: Identity,
    entry_id: web::Path<i32>,
) -> Result<impl Responder> {
    let count = web::block(move || {
        basket::remove(store.get_ref(), &identity, *entry_id)?;
        basket::count(store.get_ref(), identity.user_id)
    })
    .await??;
    Ok(basket_changed(count))
}

#[post("/api/basket/update/{entry_id}")]
async fn update_basket(
    store: web::Data<dyn Store>,
    identity: Identity,
    entry_id: web::Path<i32>,
    body: web::Json<UpdateBasketBody>,
) -> Result<impl Responder> {
    let quantity = body.quantity()?;
    let count = web::block(move || {
        basket::set_quantity(store.get_ref(), &identity, *entry_id, quantity)?;
        basket::count(store.get_ref(), identity.user_id)
    })
    .await??;
    Ok(basket_changed(count))
}

#[post("/api/basket/checkout")]
async fn checkout(store: web::Data<dyn Store>, identity: Identity) -> Result<impl Responder> {
    let order = web::block(move || orders::checkout(store.get_ref(), &identity)).await??;
    Ok(HttpResponse::Created().json(order))
}
