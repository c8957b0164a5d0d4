use std::str::FromStr;

use bigdecimal::BigDecimal;
use tracing::{error, info, instrument};

use crate::auth::Identity;
use crate::errors::{AppError, Result};
use crate::models::Product;
use crate::store::{ProductFilter, ProductSort, Store};

impl ProductFilter {
    /// Unparsable values are ignored, not rejected.
    pub fn from_params(
        game: Option<&str>,
        categories: Option<&str>,
        min_price: Option<&str>,
        max_price: Option<&str>,
        sort: Option<&str>,
    ) -> Self {
        let price = |raw: Option<&str>| raw.and_then(|v| BigDecimal::from_str(v.trim()).ok());
        ProductFilter {
            game_id: game.and_then(|v| v.trim().parse().ok()),
            category_ids: categories
                .map(|list| {
                    list.split(',')
                        .filter_map(|id| id.trim().parse().ok())
                        .collect()
                })
                .unwrap_or_default(),
            min_price: price(min_price),
            max_price: price(max_price),
            sort: match sort {
                Some("price_asc") => ProductSort::PriceAsc,
                Some("price_desc") => ProductSort::PriceDesc,
                _ => ProductSort::Default,
            },
        }
    }
}

pub fn list_products(store: &dyn Store, filter: &ProductFilter) -> Result<Vec<Product>> {
    store.list_products(filter)
}

pub fn get_product(store: &dyn Store, product_id: i32) -> Result<Product> {
    store.find_product(product_id)?.ok_or(AppError::NotFound)
}

/// Staff-only. Orphan cleanup afterwards is best effort: its failure is
/// logged and the deletion still stands.
#[instrument(skip(store))]
pub fn delete_product(store: &dyn Store, identity: &Identity, product_id: i32) -> Result<()> {
    if !identity.is_staff {
        return Err(AppError::Forbidden);
    }
    if !store.delete_product(product_id)? {
        return Err(AppError::NotFound);
    }
    info!(product_id, "product deleted");
    match store.cleanup_orphaned_items() {
        Ok(removed) => info!(removed, "orphaned basket and wishlist rows removed"),
        Err(err) => error!(error = %err, "cleanup after product deletion failed"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{basket, orders, wishlist};
    use crate::test_utils::{dec, fixture};

    #[test]
    fn filter_ignores_unparsable_values() {
        let filter = ProductFilter::from_params(
            Some("2"),
            Some("1, x,3"),
            Some("abc"),
            Some("20.5"),
            Some("price_desc"),
        );
        assert_eq!(filter.game_id, Some(2));
        assert_eq!(filter.category_ids, vec![1, 3]);
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, Some(dec("20.5")));
        assert_eq!(filter.sort, ProductSort::PriceDesc);
    }

    #[test]
    fn lists_products_by_price_range_and_order() {
        let f = fixture();
        let cheap_first = ProductFilter::from_params(None, None, None, None, Some("price_asc"));
        let names: Vec<String> = list_products(&f.store, &cheap_first)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Courier", "Arcana"]);

        let pricey = ProductFilter::from_params(None, None, Some("6"), None, None);
        let found = list_products(&f.store, &pricey).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, f.p1.id);

        let by_category = ProductFilter::from_params(None, Some("2"), None, None, None);
        assert_eq!(list_products(&f.store, &by_category).unwrap()[0].id, f.p2.id);
    }

    #[test]
    fn only_staff_delete_products() {
        let f = fixture();
        let err = delete_product(&f.store, &f.alice, f.p1.id).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        assert!(get_product(&f.store, f.p1.id).is_ok());
    }

    #[test]
    fn deleting_a_product_cleans_baskets_and_wishlists() {
        let f = fixture();
        basket::add(&f.store, &f.alice, f.p1.id).unwrap();
        basket::add(&f.store, &f.alice, f.p2.id).unwrap();
        wishlist::toggle(&f.store, &f.bob, f.p1.id).unwrap();

        delete_product(&f.store, &f.staff, f.p1.id).unwrap();

        let lines = basket::lines(&f.store, &f.alice).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].entry.product_id, f.p2.id);
        assert_eq!(wishlist::count(&f.store, f.bob.user_id).unwrap(), 0);
        assert!(matches!(get_product(&f.store, f.p1.id), Err(AppError::NotFound)));
        assert!(matches!(
            delete_product(&f.store, &f.staff, f.p1.id),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn deleting_a_product_cascades_to_order_items() {
        let f = fixture();
        basket::add(&f.store, &f.alice, f.p1.id).unwrap();
        basket::add(&f.store, &f.alice, f.p2.id).unwrap();
        let placed = orders::checkout(&f.store, &f.alice).unwrap();

        delete_product(&f.store, &f.staff, f.p1.id).unwrap();

        let detail = orders::get(&f.store, &f.alice, placed.order.id).unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].product_id, f.p2.id);
        assert_eq!(detail.order.total_price, dec("15.50"));
    }
}
