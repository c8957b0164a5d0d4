pub mod basket;
pub mod catalog;
pub mod orders;
pub mod reviews;
pub mod wishlist;

use serde::Serialize;

use crate::auth::Identity;
use crate::errors::Result;
use crate::store::Store;

/// Header counters shown on every page for a signed-in user.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileCounts {
    pub basket_items_count: i64,
    pub wishlist_count: i64,
}

pub fn profile_counts(store: &dyn Store, identity: &Identity) -> Result<ProfileCounts> {
    Ok(ProfileCounts {
        basket_items_count: basket::count(store, identity.user_id)?,
        wishlist_count: wishlist::count(store, identity.user_id)?,
    })
}
