use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use bigdecimal::BigDecimal;
use chrono::Utc;

use crate::errors::{AppError, InvalidInput, Result};
use crate::insertables::{NewReview, ReviewChanges};
use crate::models::{
    BasketEntry, Order, OrderItem, Product, Review, User, WishlistEntry, MAX_BASKET_QUANTITY,
    ORDER_STATUS_PENDING,
};
use crate::pricing;

use super::{
    BasketLine, BasketSummary, OrderDetail, Planner, ProductFilter, ProductSort, Store,
    WishlistToggle,
};

#[derive(Default)]
struct Tables {
    next_id: i32,
    users: BTreeMap<i32, User>,
    products: BTreeMap<i32, Product>,
    basket: BTreeMap<i32, BasketEntry>,
    orders: BTreeMap<i32, Order>,
    order_items: BTreeMap<i32, OrderItem>,
    reviews: BTreeMap<i32, Review>,
    wishlist: BTreeMap<i32, WishlistEntry>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn basket_lines(&self, user_id: i32) -> Vec<BasketLine> {
        self.basket
            .values()
            .filter(|entry| entry.user_id == user_id)
            .filter_map(|entry| {
                self.products.get(&entry.product_id).map(|product| BasketLine {
                    entry: entry.clone(),
                    unit_price: product.price.clone(),
                })
            })
            .collect()
    }

    fn order_detail(&self, order: &Order) -> OrderDetail {
        OrderDetail {
            order: order.clone(),
            items: self
                .order_items
                .values()
                .filter(|item| item.order_id == order.id)
                .cloned()
                .collect(),
        }
    }
}

/// One mutex over every table, so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    aggregates_unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose aggregate queries always fail, as when the database
    /// side aggregation is missing. Row-level reads keep working.
    pub fn without_aggregates() -> Self {
        MemoryStore {
            aggregates_unavailable: true,
            ..Self::default()
        }
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Database("memory store lock poisoned".to_string()))
    }

    fn aggregates(&self) -> Result<()> {
        if self.aggregates_unavailable {
            return Err(AppError::Database("aggregate functions are unavailable".to_string()));
        }
        Ok(())
    }

    pub fn insert_user(&self, username: &str, is_staff: bool) -> Result<User> {
        let mut tables = self.tables()?;
        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            is_staff,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn insert_product(
        &self,
        name: &str,
        price: BigDecimal,
        category_id: i32,
        game_id: i32,
    ) -> Result<Product> {
        let mut tables = self.tables()?;
        let product = Product {
            id: tables.next_id(),
            name: name.to_string(),
            description: String::new(),
            price: pricing::to_currency(price),
            old_price: None,
            discount: None,
            average_rating: pricing::average_rating(0, 0),
            category_id,
            game_id,
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    pub fn set_product_price(&self, product_id: i32, price: BigDecimal) -> Result<()> {
        let mut tables = self.tables()?;
        let product = tables.products.get_mut(&product_id).ok_or(AppError::NotFound)?;
        product.price = pricing::to_currency(price);
        Ok(())
    }
}

impl Store for MemoryStore {
    fn find_user(&self, user_id: i32) -> Result<Option<User>> {
        Ok(self.tables()?.users.get(&user_id).cloned())
    }

    fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let tables = self.tables()?;
        let mut found: Vec<Product> = tables
            .products
            .values()
            .filter(|product| filter.matches(product))
            .cloned()
            .collect();
        match filter.sort {
            ProductSort::PriceAsc => found.sort_by(|a, b| a.price.cmp(&b.price)),
            ProductSort::PriceDesc => found.sort_by(|a, b| b.price.cmp(&a.price)),
            ProductSort::Default => {}
        }
        Ok(found)
    }

    fn find_product(&self, product_id: i32) -> Result<Option<Product>> {
        Ok(self.tables()?.products.get(&product_id).cloned())
    }

    fn delete_product(&self, product_id: i32) -> Result<bool> {
        let mut tables = self.tables()?;
        let removed = tables.products.remove(&product_id).is_some();
        // Same cascade as the foreign keys; basket and wishlist rows wait
        // for `cleanup_orphaned_items`.
        if removed {
            tables.reviews.retain(|_, review| review.product_id != product_id);
            tables.order_items.retain(|_, item| item.product_id != product_id);
        }
        Ok(removed)
    }

    fn cleanup_orphaned_items(&self) -> Result<usize> {
        let mut tables = self.tables()?;
        let Tables {
            products,
            basket,
            wishlist,
            ..
        } = &mut *tables;
        let before = basket.len() + wishlist.len();
        basket.retain(|_, entry| products.contains_key(&entry.product_id));
        wishlist.retain(|_, entry| products.contains_key(&entry.product_id));
        Ok(before - basket.len() - wishlist.len())
    }

    fn basket_lines(&self, user_id: i32) -> Result<Vec<BasketLine>> {
        Ok(self.tables()?.basket_lines(user_id))
    }

    fn basket_summary(&self, user_id: i32) -> Result<BasketSummary> {
        self.aggregates()?;
        let tables = self.tables()?;
        let mut count = 0i64;
        let mut total = BigDecimal::from(0);
        for entry in tables.basket.values().filter(|entry| entry.user_id == user_id) {
            if let Some(product) = tables.products.get(&entry.product_id) {
                count += i64::from(entry.quantity);
                total += pricing::line_total(&product.price, entry.quantity);
            }
        }
        Ok(BasketSummary {
            count,
            total: pricing::to_currency(total),
        })
    }

    fn find_basket_entry(&self, entry_id: i32) -> Result<Option<BasketEntry>> {
        Ok(self.tables()?.basket.get(&entry_id).cloned())
    }

    fn add_to_basket(&self, user_id: i32, product_id: i32) -> Result<BasketEntry> {
        let mut tables = self.tables()?;
        if let Some(entry) = tables
            .basket
            .values_mut()
            .find(|entry| entry.user_id == user_id && entry.product_id == product_id)
        {
            if entry.quantity >= MAX_BASKET_QUANTITY {
                return Err(InvalidInput::InvalidQuantity.into());
            }
            entry.quantity += 1;
            return Ok(entry.clone());
        }
        let entry = BasketEntry {
            id: tables.next_id(),
            user_id,
            product_id,
            quantity: 1,
            created_at: Utc::now(),
        };
        tables.basket.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn set_basket_quantity(&self, entry_id: i32, quantity: i32) -> Result<BasketEntry> {
        let mut tables = self.tables()?;
        let entry = tables.basket.get_mut(&entry_id).ok_or(AppError::NotFound)?;
        entry.quantity = quantity;
        Ok(entry.clone())
    }

    fn remove_basket_entry(&self, entry_id: i32) -> Result<()> {
        self.tables()?
            .basket
            .remove(&entry_id)
            .map(|_| ())
            .ok_or(AppError::NotFound)
    }

    fn create_order_from_basket(&self, user_id: i32, plan: Planner<'_>) -> Result<OrderDetail> {
        let mut tables = self.tables()?;
        let lines = tables.basket_lines(user_id);
        let planned = plan(lines.as_slice())?;

        let order = Order {
            id: tables.next_id(),
            user_id,
            total_price: planned.total_price,
            status: ORDER_STATUS_PENDING.to_string(),
            created_at: Utc::now(),
        };
        let mut items = Vec::with_capacity(planned.items.len());
        for item in planned.items {
            items.push(OrderItem {
                id: tables.next_id(),
                order_id: order.id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
            });
        }

        tables.orders.insert(order.id, order.clone());
        for item in &items {
            tables.order_items.insert(item.id, item.clone());
        }
        for line in &lines {
            tables.basket.remove(&line.entry.id);
        }
        Ok(OrderDetail { order, items })
    }

    fn list_orders(&self, owner: Option<i32>) -> Result<Vec<OrderDetail>> {
        let tables = self.tables()?;
        Ok(tables
            .orders
            .values()
            .rev()
            .filter(|order| owner.map_or(true, |user_id| order.user_id == user_id))
            .map(|order| tables.order_detail(order))
            .collect())
    }

    fn find_order(&self, order_id: i32) -> Result<Option<OrderDetail>> {
        let tables = self.tables()?;
        Ok(tables.orders.get(&order_id).map(|order| tables.order_detail(order)))
    }

    fn set_order_status(&self, order_id: i32, status: &str) -> Result<Order> {
        let mut tables = self.tables()?;
        let order = tables.orders.get_mut(&order_id).ok_or(AppError::NotFound)?;
        order.status = status.to_string();
        Ok(order.clone())
    }

    fn delete_order(&self, order_id: i32) -> Result<()> {
        let mut tables = self.tables()?;
        tables.orders.remove(&order_id).ok_or(AppError::NotFound)?;
        tables.order_items.retain(|_, item| item.order_id != order_id);
        Ok(())
    }

    fn list_reviews(&self, product_id: Option<i32>) -> Result<Vec<Review>> {
        let tables = self.tables()?;
        Ok(tables
            .reviews
            .values()
            .rev()
            .filter(|review| product_id.map_or(true, |product| review.product_id == product))
            .cloned()
            .collect())
    }

    fn find_review(&self, review_id: i32) -> Result<Option<Review>> {
        Ok(self.tables()?.reviews.get(&review_id).cloned())
    }

    fn insert_review(&self, review: NewReview) -> Result<Review> {
        let mut tables = self.tables()?;
        let review = Review {
            id: tables.next_id(),
            product_id: review.product_id,
            user_id: review.user_id,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
        };
        tables.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    fn update_review(&self, review_id: i32, changes: &ReviewChanges) -> Result<Review> {
        let mut tables = self.tables()?;
        let review = tables.reviews.get_mut(&review_id).ok_or(AppError::NotFound)?;
        if let Some(rating) = changes.rating {
            review.rating = rating;
        }
        if let Some(comment) = &changes.comment {
            review.comment = comment.clone();
        }
        Ok(review.clone())
    }

    fn delete_review(&self, review_id: i32) -> Result<()> {
        self.tables()?
            .reviews
            .remove(&review_id)
            .map(|_| ())
            .ok_or(AppError::NotFound)
    }

    fn recalculate_product_rating(&self, product_id: i32) -> Result<BigDecimal> {
        let mut tables = self.tables()?;
        let (count, rating_sum) = tables
            .reviews
            .values()
            .filter(|review| review.product_id == product_id)
            .fold((0i64, 0i64), |(count, sum), review| {
                (count + 1, sum + i64::from(review.rating))
            });
        let average = pricing::average_rating(rating_sum, count);
        let product = tables.products.get_mut(&product_id).ok_or(AppError::NotFound)?;
        product.average_rating = average.clone();
        Ok(average)
    }

    fn wishlist(&self, user_id: i32) -> Result<Vec<WishlistEntry>> {
        Ok(self
            .tables()?
            .wishlist
            .values()
            .rev()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect())
    }

    fn wishlist_count(&self, user_id: i32) -> Result<i64> {
        self.aggregates()?;
        let tables = self.tables()?;
        Ok(tables
            .wishlist
            .values()
            .filter(|entry| entry.user_id == user_id)
            .count() as i64)
    }

    fn toggle_wishlist(&self, user_id: i32, product_id: i32) -> Result<WishlistToggle> {
        let mut tables = self.tables()?;
        let existing = tables
            .wishlist
            .values()
            .find(|entry| entry.user_id == user_id && entry.product_id == product_id)
            .map(|entry| entry.id);
        match existing {
            Some(id) => {
                tables.wishlist.remove(&id);
                Ok(WishlistToggle::Removed)
            }
            None => {
                let entry = WishlistEntry {
                    id: tables.next_id(),
                    user_id,
                    product_id,
                    created_at: Utc::now(),
                };
                tables.wishlist.insert(entry.id, entry);
                Ok(WishlistToggle::Added)
            }
        }
    }
}
