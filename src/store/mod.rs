pub mod memory;
pub mod postgres;

use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::errors::Result;
use crate::insertables::{NewReview, ReviewChanges};
use crate::models::{BasketEntry, Order, OrderItem, Product, Review, User, WishlistEntry};

pub use memory::MemoryStore;
pub use postgres::{initialize_db_pool, DbPool, PgStore};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BasketLine {
    #[serde(flatten)]
    pub entry: BasketEntry,
    pub unit_price: BigDecimal,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BasketSummary {
    pub count: i64,
    pub total: BigDecimal,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutPlan {
    pub total_price: BigDecimal,
    pub items: Vec<PlannedItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem {
    pub product_id: i32,
    pub quantity: i32,
    pub price: BigDecimal,
}

/// Turns the locked basket snapshot into a plan; an error aborts checkout.
pub type Planner<'a> = &'a (dyn Fn(&[BasketLine]) -> Result<CheckoutPlan> + Sync);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Default,
    PriceAsc,
    PriceDesc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub game_id: Option<i32>,
    pub category_ids: Vec<i32>,
    pub min_price: Option<BigDecimal>,
    pub max_price: Option<BigDecimal>,
    pub sort: ProductSort,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        self.game_id.map_or(true, |game| product.game_id == game)
            && (self.category_ids.is_empty() || self.category_ids.contains(&product.category_id))
            && self.min_price.as_ref().map_or(true, |min| &product.price >= min)
            && self.max_price.as_ref().map_or(true, |max| &product.price <= max)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WishlistToggle {
    Added,
    Removed,
}

pub trait Store: Send + Sync {
    fn find_user(&self, user_id: i32) -> Result<Option<User>>;

    fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;
    fn find_product(&self, product_id: i32) -> Result<Option<Product>>;
    fn delete_product(&self, product_id: i32) -> Result<bool>;
    /// Drops basket and wishlist rows that point at products which no longer exist.
    fn cleanup_orphaned_items(&self) -> Result<usize>;

    fn basket_lines(&self, user_id: i32) -> Result<Vec<BasketLine>>;
    fn basket_summary(&self, user_id: i32) -> Result<BasketSummary>;
    fn find_basket_entry(&self, entry_id: i32) -> Result<Option<BasketEntry>>;
    /// Creates the entry with quantity 1 or increments an existing one, atomically.
    fn add_to_basket(&self, user_id: i32, product_id: i32) -> Result<BasketEntry>;
    fn set_basket_quantity(&self, entry_id: i32, quantity: i32) -> Result<BasketEntry>;
    fn remove_basket_entry(&self, entry_id: i32) -> Result<()>;

    /// Atomically snapshots the user's basket, writes the order produced by
    /// `plan` and clears the snapshotted entries. Nothing is written when
    /// `plan` or any write fails.
    fn create_order_from_basket(&self, user_id: i32, plan: Planner<'_>) -> Result<OrderDetail>;
    fn list_orders(&self, owner: Option<i32>) -> Result<Vec<OrderDetail>>;
    fn find_order(&self, order_id: i32) -> Result<Option<OrderDetail>>;
    fn set_order_status(&self, order_id: i32, status: &str) -> Result<Order>;
    fn delete_order(&self, order_id: i32) -> Result<()>;

    fn list_reviews(&self, product_id: Option<i32>) -> Result<Vec<Review>>;
    fn find_review(&self, review_id: i32) -> Result<Option<Review>>;
    fn insert_review(&self, review: NewReview) -> Result<Review>;
    fn update_review(&self, review_id: i32, changes: &ReviewChanges) -> Result<Review>;
    fn delete_review(&self, review_id: i32) -> Result<()>;
    fn recalculate_product_rating(&self, product_id: i32) -> Result<BigDecimal>;

    fn wishlist(&self, user_id: i32) -> Result<Vec<WishlistEntry>>;
    fn wishlist_count(&self, user_id: i32) -> Result<i64>;
    /// Removes the entry if present, otherwise adds it, atomically per user.
    fn toggle_wishlist(&self, user_id: i32, product_id: i32) -> Result<WishlistToggle>;
}
