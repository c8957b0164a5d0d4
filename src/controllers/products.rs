use actix_web::{delete, get, web, HttpResponse, Responder, Result};
use serde::Deserialize;
use storefront_api::auth::Identity;
use storefront_api::services::catalog;
use storefront_api::store::{ProductFilter, Store};

#[derive(Deserialize)]
struct ProductQuery {
    game: Option<String>,
    category: Option<String>,
    min_price: Option<String>,
    max_price: Option<String>,
    sort: Option<String>,
}

impl ProductQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter::from_params(
            self.game.as_deref(),
            self.category.as_deref(),
            self.min_price.as_deref(),
            self.max_price.as_deref(),
            self.sort.as_deref(),
        )
    }
}

#[get("/api/products")]
async fn get_products(
    store: web::Data<dyn Store>,
    query: web::Query<ProductQuery>,
) -> Result<impl Responder> {
    let filter = query.filter();
    let all_products =
        web::block(move || catalog::list_products(store.get_ref(), &filter)).await??;
    Ok(HttpResponse::Ok().json(all_products))
}

#[get("/api/products/{product_id}")]
async fn get_product(
    store: web::Data<dyn Store>,
    product_id: web::Path<i32>,
) -> Result<impl Responder> {
    let product =
        web::block(move || catalog::get_product(store.get_ref(), *product_id)).await??;
    Ok(HttpResponse::Ok().json(product))
}

#[delete("/api/products/{product_id}")]
async fn delete_product(
    store: web::Data<dyn Store>,
    identity: Identity,
    product_id: web::Path<i32>,
) -> Result<impl Responder> {
    web::block(move || catalog::delete_product(store.get_ref(), &identity, *product_id))
        .await??;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use crate::controllers::test_support::{bearer, init_app, TestApp};
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_web::test]
    async fn catalog_is_public_and_filterable() {
        let app = TestApp::new();
        let service = init_app!(app);

        let req = test::TestRequest::get()
            .uri("/api/products?sort=price_desc&min_price=oops")
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["id"], app.p1.id);

        let req = test::TestRequest::get().uri("/api/products/9999").to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn product_deletion_requires_staff() {
        let app = TestApp::new();
        let service = init_app!(app);
        let uri = format!("/api/products/{}", app.p2.id);

        let req = test::TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer("alice"))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete().uri(&uri).to_request();
        assert_eq!(
            test::call_service(&service, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::delete()
            .uri(&uri)
            .insert_header(bearer("admin"))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NO_CONTENT);
    }
}
