use serde::Serialize;
use tracing::{instrument, warn};

use crate::auth::Identity;
use crate::errors::{AppError, Result};
use crate::models::WishlistEntry;
use crate::store::{Store, WishlistToggle};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub action: WishlistToggle,
    pub count: i64,
}

pub fn entries(store: &dyn Store, identity: &Identity) -> Result<Vec<WishlistEntry>> {
    store.wishlist(identity.user_id)
}

/// Entry count from the store's aggregate, or from the rows if that fails.
pub fn count(store: &dyn Store, user_id: i32) -> Result<i64> {
    match store.wishlist_count(user_id) {
        Ok(count) => Ok(count),
        Err(err) => {
            warn!(user_id, error = %err, "wishlist count failed, counting rows");
            Ok(store.wishlist(user_id)?.len() as i64)
        }
    }
}

#[instrument(skip(store))]
pub fn toggle(store: &dyn Store, identity: &Identity, product_id: i32) -> Result<ToggleOutcome> {
    store.find_product(product_id)?.ok_or(AppError::NotFound)?;
    let action = store.toggle_wishlist(identity.user_id, product_id)?;
    Ok(ToggleOutcome {
        action,
        count: count(store, identity.user_id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_utils::{fixture, fixture_with};

    #[test]
    fn toggling_twice_restores_membership() {
        let f = fixture();
        let first = toggle(&f.store, &f.alice, f.p1.id).unwrap();
        assert_eq!(first, ToggleOutcome { action: WishlistToggle::Added, count: 1 });
        assert_eq!(entries(&f.store, &f.alice).unwrap()[0].product_id, f.p1.id);

        let second = toggle(&f.store, &f.alice, f.p1.id).unwrap();
        assert_eq!(second, ToggleOutcome { action: WishlistToggle::Removed, count: 0 });
        assert!(entries(&f.store, &f.alice).unwrap().is_empty());
    }

    #[test]
    fn wishlists_are_per_user() {
        let f = fixture();
        toggle(&f.store, &f.alice, f.p1.id).unwrap();
        toggle(&f.store, &f.alice, f.p2.id).unwrap();
        let bob = toggle(&f.store, &f.bob, f.p1.id).unwrap();
        assert_eq!(bob.action, WishlistToggle::Added);
        assert_eq!(bob.count, 1);
        assert_eq!(count(&f.store, f.alice.user_id).unwrap(), 2);
    }

    #[test]
    fn concurrent_toggles_never_duplicate() {
        let f = fixture();
        std::thread::scope(|scope| {
            for _ in 0..6 {
                scope.spawn(|| toggle(&f.store, &f.alice, f.p1.id).unwrap());
            }
        });
        // An even number of toggles lands back on "absent".
        assert_eq!(count(&f.store, f.alice.user_id).unwrap(), 0);
    }

    #[test]
    fn unknown_product_is_not_found() {
        let f = fixture();
        assert!(matches!(toggle(&f.store, &f.alice, 9999), Err(AppError::NotFound)));
    }

    #[test]
    fn count_falls_back_to_rows() {
        let f = fixture_with(MemoryStore::without_aggregates());
        let outcome = toggle(&f.store, &f.alice, f.p2.id).unwrap();
        assert_eq!(outcome.count, 1);
    }
}
