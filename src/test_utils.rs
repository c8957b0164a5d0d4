use std::str::FromStr;

use bigdecimal::BigDecimal;
use tracing_subscriber::EnvFilter;

use crate::auth::Identity;
use crate::models::Product;
use crate::store::MemoryStore;

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub(crate) fn dec(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

/// A store with two shoppers, one staff member and two products priced
/// 10.00 and 5.50.
pub(crate) struct Fixture {
    pub store: MemoryStore,
    pub alice: Identity,
    pub bob: Identity,
    pub staff: Identity,
    pub p1: Product,
    pub p2: Product,
}

pub(crate) fn fixture() -> Fixture {
    fixture_with(MemoryStore::new())
}

pub(crate) fn fixture_with(store: MemoryStore) -> Fixture {
    init_test_tracing();
    let identity = |username: &str, is_staff: bool| {
        let user = store.insert_user(username, is_staff).unwrap();
        Identity {
            user_id: user.id,
            is_staff: user.is_staff,
        }
    };
    let alice = identity("alice", false);
    let bob = identity("bob", false);
    let staff = identity("admin", true);
    let p1 = store.insert_product("Arcana", dec("10.00"), 1, 1).unwrap();
    let p2 = store.insert_product("Courier", dec("5.50"), 2, 1).unwrap();
    Fixture {
        store,
        alice,
        bob,
        staff,
        p1,
        p2,
    }
}
