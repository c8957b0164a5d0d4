use crate::auth::Identity;
use crate::models::{BasketEntry, Order, Product, Review, WishlistEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

pub trait Resource {
    /// `None` for records nobody owns, such as catalog entries.
    fn owner_id(&self) -> Option<i32>;

    fn visibility(&self) -> Visibility {
        Visibility::Private
    }
}

impl Resource for Product {
    fn owner_id(&self) -> Option<i32> {
        None
    }

    fn visibility(&self) -> Visibility {
        Visibility::Public
    }
}

impl Resource for Review {
    fn owner_id(&self) -> Option<i32> {
        Some(self.user_id)
    }

    fn visibility(&self) -> Visibility {
        Visibility::Public
    }
}

impl Resource for Order {
    fn owner_id(&self) -> Option<i32> {
        Some(self.user_id)
    }
}

impl Resource for BasketEntry {
    fn owner_id(&self) -> Option<i32> {
        Some(self.user_id)
    }
}

impl Resource for WishlistEntry {
    fn owner_id(&self) -> Option<i32> {
        Some(self.user_id)
    }
}

pub fn is_owner<R: Resource + ?Sized>(identity: &Identity, resource: &R) -> bool {
    resource.owner_id() == Some(identity.user_id)
}

pub fn read_allowed<R: Resource + ?Sized>(identity: Option<&Identity>, resource: &R) -> bool {
    if resource.visibility() == Visibility::Public {
        return true;
    }
    identity.is_some_and(|identity| is_owner(identity, resource) || identity.is_staff)
}

pub fn write_allowed<R: Resource + ?Sized>(identity: &Identity, resource: &R) -> bool {
    is_owner(identity, resource) || identity.is_staff
}

pub fn can_change_order_status(identity: &Identity) -> bool {
    identity.is_staff
}

pub fn can_delete_order(identity: &Identity, order: &Order) -> bool {
    identity.is_staff || (is_owner(identity, order) && order.is_pending())
}
