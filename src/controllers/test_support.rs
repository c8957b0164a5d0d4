use std::str::FromStr;
use std::sync::Arc;

use actix_web::http::header::{self, HeaderName};
use actix_web::web;
use bigdecimal::BigDecimal;
use storefront_api::auth::{Identity, IdentityProvider, StaticIdentities};
use storefront_api::models::Product;
use storefront_api::store::{MemoryStore, Store};

/// In-memory backend with users `alice`, `bob` and staff `admin`, whose
/// bearer tokens are their names, and products priced 10.00 and 5.50.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub alice: Identity,
    pub bob: Identity,
    pub staff: Identity,
    pub p1: Product,
    pub p2: Product,
    identities: Arc<StaticIdentities>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let mut identities = StaticIdentities::new();
        let mut user = |name: &str, is_staff: bool| {
            let user = store.insert_user(name, is_staff).unwrap();
            let identity = Identity {
                user_id: user.id,
                is_staff,
            };
            identities = std::mem::take(&mut identities).with_token(name, identity);
            identity
        };
        let alice = user("alice", false);
        let bob = user("bob", false);
        let staff = user("admin", true);
        let p1 = store
            .insert_product("Arcana", BigDecimal::from_str("10.00").unwrap(), 1, 1)
            .unwrap();
        let p2 = store
            .insert_product("Courier", BigDecimal::from_str("5.50").unwrap(), 2, 1)
            .unwrap();
        TestApp {
            store,
            alice,
            bob,
            staff,
            p1,
            p2,
            identities: Arc::new(identities),
        }
    }

    pub fn store_data(&self) -> web::Data<dyn Store> {
        let store: Arc<dyn Store> = self.store.clone();
        web::Data::from(store)
    }

    pub fn identity_data(&self) -> web::Data<dyn IdentityProvider> {
        let identities: Arc<dyn IdentityProvider> = self.identities.clone();
        web::Data::from(identities)
    }
}

pub fn bearer(token: &str) -> (HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

/// Builds the full route table over a `TestApp`.
macro_rules! init_app {
    ($app:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($app.store_data())
                .app_data($app.identity_data())
                .configure(crate::routes),
        )
        .await
    };
}

pub(crate) use init_app;
