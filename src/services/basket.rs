use tracing::{info, instrument, warn};

use crate::auth::Identity;
use crate::errors::{AppError, InvalidInput, Result};
use crate::models::{BasketEntry, MAX_BASKET_QUANTITY};
use crate::pricing;
use crate::store::{BasketLine, BasketSummary, Store};

/// Accepts `1..=MAX_BASKET_QUANTITY`; zero means "remove", which is a separate call.
pub fn validate_quantity(quantity: i64) -> std::result::Result<i32, InvalidInput> {
    if !(1..=i64::from(MAX_BASKET_QUANTITY)).contains(&quantity) {
        return Err(InvalidInput::InvalidQuantity);
    }
    Ok(quantity as i32)
}

pub fn parse_quantity(raw: &str) -> std::result::Result<i32, InvalidInput> {
    let quantity = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| InvalidInput::InvalidQuantity)?;
    validate_quantity(quantity)
}

/// Local recomputation of count and total from basket lines.
pub fn summarize(lines: &[BasketLine]) -> BasketSummary {
    BasketSummary {
        count: lines.iter().map(|line| i64::from(line.entry.quantity)).sum(),
        total: pricing::total(
            lines
                .iter()
                .map(|line| (&line.unit_price, line.entry.quantity)),
        ),
    }
}

/// Count and total from the store's aggregate query, recomputed from the
/// basket rows when the aggregate is unavailable.
pub fn summary(store: &dyn Store, user_id: i32) -> Result<BasketSummary> {
    match store.basket_summary(user_id) {
        Ok(summary) => Ok(summary),
        Err(err) => {
            warn!(user_id, error = %err, "basket aggregate failed, recomputing from rows");
            Ok(summarize(&store.basket_lines(user_id)?))
        }
    }
}

pub fn count(store: &dyn Store, user_id: i32) -> Result<i64> {
    Ok(summary(store, user_id)?.count)
}

pub fn lines(store: &dyn Store, identity: &Identity) -> Result<Vec<BasketLine>> {
    store.basket_lines(identity.user_id)
}

#[instrument(skip(store))]
pub fn add(store: &dyn Store, identity: &Identity, product_id: i32) -> Result<BasketEntry> {
    store.find_product(product_id)?.ok_or(AppError::NotFound)?;
    let entry = store.add_to_basket(identity.user_id, product_id)?;
    info!(entry_id = entry.id, quantity = entry.quantity, "basket entry added");
    Ok(entry)
}

fn owned_entry(store: &dyn Store, identity: &Identity, entry_id: i32) -> Result<BasketEntry> {
    store
        .find_basket_entry(entry_id)?
        .filter(|entry| identity.owns(entry))
        .ok_or(AppError::NotFound)
}

#[instrument(skip(store))]
pub fn remove(store: &dyn Store, identity: &Identity, entry_id: i32) -> Result<()> {
    let entry = owned_entry(store, identity, entry_id)?;
    store.remove_basket_entry(entry.id)
}

#[instrument(skip(store))]
pub fn set_quantity(
    store: &dyn Store,
    identity: &Identity,
    entry_id: i32,
    quantity: i64,
) -> Result<BasketEntry> {
    let quantity = validate_quantity(quantity)?;
    let entry = owned_entry(store, identity, entry_id)?;
    store.set_basket_quantity(entry.id, quantity)
}
