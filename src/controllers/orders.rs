use actix_web::{delete, get, post, route, web, HttpResponse, Responder, Result};
use serde::Deserialize;
use storefront_api::auth::Identity;
use storefront_api::errors::AppError;
use storefront_api::services::orders;
use storefront_api::store::Store;

#[derive(Deserialize)]
struct StatusDto {
    status: String,
}

#[get("/api/orders")]
async fn get_orders(store: web::Data<dyn Store>, identity: Identity) -> Result<impl Responder> {
    let all_orders = web::block(move || orders::list(store.get_ref(), &identity)).await??;
    Ok(HttpResponse::Ok().json(all_orders))
}

/// Orders only come from a basket checkout.
#[post("/api/orders")]
async fn create_order(_identity: Identity) -> Result<HttpResponse> {
    Err(AppError::OrdersOnlyFromBasket.into())
}

#[get("/api/orders/{order_id}")]
async fn get_order(
    store: web::Data<dyn Store>,
    identity: Identity,
    order_id: web::Path<i32>,
) -> Result<impl Responder> {
    let order =
        web::block(move || orders::get(store.get_ref(), &identity, *order_id)).await??;
    Ok(HttpResponse::Ok().json(order))
}

#[route("/api/orders/{order_id}", method = "PUT", method = "PATCH")]
async fn update_order(
    store: web::Data<dyn Store>,
    identity: Identity,
    order_id: web::Path<i32>,
    dto: web::Json<StatusDto>,
) -> Result<impl Responder> {
    let order = web::block(move || {
        orders::update_status(store.get_ref(), &identity, *order_id, &dto.status)
    })
    .await??;
    Ok(HttpResponse::Ok().json(order))
}

#[delete("/api/orders/{order_id}")]
async fn delete_order(
    store: web::Data<dyn Store>,
    identity: Identity,
    order_id: web::Path<i32>,
) -> Result<impl Responder> {
    web::block(move || orders::delete(store.get_ref(), &identity, *order_id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use crate::controllers::test_support::{bearer, init_app, TestApp};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};
    use storefront_api::services::{basket, orders};

    fn place_order(app: &TestApp) -> i32 {
        basket::add(app.store.as_ref(), &app.alice, app.p1.id).unwrap();
        orders::checkout(app.store.as_ref(), &app.alice).unwrap().order.id
    }

    #[actix_web::test]
    async fn direct_order_creation_is_not_allowed() {
        let app = TestApp::new();
        let service = init_app!(app);

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer("alice"))
            .set_json(json!({ "total_price": "1.00" }))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);

        let req = test::TestRequest::post().uri("/api/orders").to_request();
        assert_eq!(
            test::call_service(&service, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn orders_are_visible_to_owner_and_staff_only() {
        let app = TestApp::new();
        let service = init_app!(app);
        let order_id = place_order(&app);
        let uri = format!("/api/orders/{order_id}");

        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer("alice"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&service, req).await;
        assert_eq!(body["id"], order_id);
        assert_eq!(body["total_price"], "10.00");

        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer("bob"))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/orders")
            .insert_header(bearer("bob"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&service, req).await;
        assert!(body.as_array().unwrap().is_empty());

        let req = test::TestRequest::get()
            .uri("/api/orders")
            .insert_header(bearer("admin"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&service, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn only_staff_change_status() {
        let app = TestApp::new();
        let service = init_app!(app);
        let order_id = place_order(&app);
        let uri = format!("/api/orders/{order_id}");

        let req = test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer("alice"))
            .set_json(json!({ "status": "shipped" }))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer("admin"))
            .set_json(json!({ "status": "   " }))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer("admin"))
            .set_json(json!({ "status": "shipped" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&service, req).await;
        assert_eq!(body["status"], "shipped");
    }

    #[actix_web::test]
    async fn owner_deletes_only_pending_orders() {
        let app = TestApp::new();
        let service = init_app!(app);
        let pending = place_order(&app);
        let shipped = place_order(&app);
        orders::update_status(app.store.as_ref(), &app.staff, shipped, "shipped").unwrap();

        let req = test::TestRequest::delete()
            .uri(&format!("/api/orders/{pending}"))
            .insert_header(bearer("bob"))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/orders/{shipped}"))
            .insert_header(bearer("alice"))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/orders/{pending}"))
            .insert_header(bearer("alice"))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/orders/{shipped}"))
            .insert_header(bearer("admin"))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NO_CONTENT);
    }
}
