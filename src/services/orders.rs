use tracing::{error, info, instrument};

use crate::access;
use crate::auth::Identity;
use crate::errors::{AppError, InvalidInput, Result};
use crate::pricing;
use crate::services::basket;
use crate::store::{BasketLine, CheckoutPlan, OrderDetail, PlannedItem, Store};

/// Column width of `orders.status`.
pub const MAX_STATUS_LEN: usize = 50;

/// Snapshots each basket line's live unit price into an order item and
/// totals them. An empty basket cannot be checked out.
pub fn plan_checkout(lines: &[BasketLine]) -> Result<CheckoutPlan> {
    if lines.is_empty() {
        return Err(InvalidInput::EmptyBasket.into());
    }
    let items: Vec<PlannedItem> = lines
        .iter()
        .map(|line| PlannedItem {
            product_id: line.entry.product_id,
            quantity: line.entry.quantity,
            price: pricing::to_currency(line.unit_price.clone()),
        })
        .collect();
    let total_price = pricing::total(items.iter().map(|item| (&item.price, item.quantity)));
    Ok(CheckoutPlan { total_price, items })
}

/// Order statuses are free-form: any non-blank string that fits the column.
pub fn validate_status(raw: &str) -> std::result::Result<String, InvalidInput> {
    let status = raw.trim();
    if status.is_empty() || status.chars().count() > MAX_STATUS_LEN {
        return Err(InvalidInput::InvalidStatus);
    }
    Ok(status.to_string())
}

#[instrument(skip(store))]
pub fn checkout(store: &dyn Store, identity: &Identity) -> Result<OrderDetail> {
    if basket::count(store, identity.user_id)? == 0 {
        return Err(InvalidInput::EmptyBasket.into());
    }
    let detail = store
        .create_order_from_basket(identity.user_id, &plan_checkout)
        .map_err(|err| match err {
            err @ (AppError::InvalidInput(_) | AppError::NotFound) => err,
            other => {
                error!(user_id = identity.user_id, error = %other, "checkout rolled back");
                AppError::OrderCreationFailed(other.to_string())
            }
        })?;
    info!(
        order_id = detail.order.id,
        total = %detail.order.total_price,
        "checkout complete"
    );
    Ok(detail)
}

pub fn list(store: &dyn Store, identity: &Identity) -> Result<Vec<OrderDetail>> {
    let owner = (!identity.is_staff).then_some(identity.user_id);
    store.list_orders(owner)
}

/// Orders the caller may not read are reported as missing.
pub fn get(store: &dyn Store, identity: &Identity, order_id: i32) -> Result<OrderDetail> {
    store
        .find_order(order_id)?
        .filter(|detail| access::read_allowed(Some(identity), &detail.order))
        .ok_or(AppError::NotFound)
}

#[instrument(skip(store))]
pub fn update_status(
    store: &dyn Store,
    identity: &Identity,
    order_id: i32,
    status: &str,
) -> Result<OrderDetail> {
    if !access::can_change_order_status(identity) {
        return Err(AppError::Forbidden);
    }
    let status = validate_status(status)?;
    let order = store.set_order_status(order_id, &status)?;
    info!(order_id, status = %order.status, "order status changed");
    store.find_order(order.id)?.ok_or(AppError::NotFound)
}

#[instrument(skip(store))]
pub fn delete(store: &dyn Store, identity: &Identity, order_id: i32) -> Result<()> {
    let detail = store.find_order(order_id)?.ok_or(AppError::NotFound)?;
    if !access::can_delete_order(identity, &detail.order) {
        return Err(AppError::Forbidden);
    }
    store.delete_order(order_id)?;
    info!(order_id, "order deleted");
    Ok(())
}
