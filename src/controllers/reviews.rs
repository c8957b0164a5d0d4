use actix_web::{delete, get, post, route, web, HttpResponse, Responder, Result};
use serde::Deserialize;
use storefront_api::auth::Identity;
use storefront_api::services::reviews;
use storefront_api::store::Store;

#[derive(Deserialize)]
struct ReviewQuery {
    product: Option<i32>,
}

/// Any `user` field a client sends is ignored; the author is the caller.
#[derive(Deserialize)]
struct ReviewDto {
    product_id: i32,
    rating: i64,
    comment: String,
}

#[derive(Deserialize)]
struct ReviewChangesDto {
    rating: Option<i64>,
    comment: Option<String>,
}

#[get("/api/reviews")]
async fn get_reviews(
    store: web::Data<dyn Store>,
    query: web::Query<ReviewQuery>,
) -> Result<impl Responder> {
    let product_id = query.product;
    let all_reviews = web::block(move || reviews::list(store.get_ref(), product_id)).await??;
    Ok(HttpResponse::Ok().json(all_reviews))
}

#[post("/api/reviews")]
async fn create_review(
    store: web::Data<dyn Store>,
    identity: Identity,
    dto: web::Json<ReviewDto>,
) -> Result<impl Responder> {
    let review = web::block(move || {
        reviews::submit(
            store.get_ref(),
            &identity,
            dto.product_id,
            dto.rating,
            &dto.comment,
        )
    })
    .await??;
    Ok(HttpResponse::Created().json(review))
}

#[get("/api/reviews/{review_id}")]
async fn get_review(
    store: web::Data<dyn Store>,
    review_id: web::Path<i32>,
) -> Result<impl Responder> {
    let review = web::block(move || reviews::get(store.get_ref(), *review_id)).await??;
    Ok(HttpResponse::Ok().json(review))
}

#[route("/api/reviews/{review_id}", method = "PUT", method = "PATCH")]
async fn update_review(
    store: web::Data<dyn Store>,
    identity: Identity,
    review_id: web::Path<i32>,
    dto: web::Json<ReviewChangesDto>,
) -> Result<impl Responder> {
    let review = web::block(move || {
        reviews::update(
            store.get_ref(),
            &identity,
            *review_id,
            dto.rating,
            dto.comment.as_deref(),
        )
    })
    .await??;
    Ok(HttpResponse::Ok().json(review))
}

#[delete("/api/reviews/{review_id}")]
async fn delete_review(
    store: web::Data<dyn Store>,
    identity: Identity,
    review_id: web::Path<i32>,
) -> Result<impl Responder> {
    web::block(move || reviews::delete(store.get_ref(), &identity, *review_id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
