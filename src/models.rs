use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{
    basket_entries, categories, games, order_items, orders, products, reviews, users,
    wishlist_entries,
};

/// Status every order starts in. Owners may only delete orders in this state.
pub const ORDER_STATUS_PENDING: &str = "pending";

/// Upper bound of a basket line quantity, enforced by a column CHECK as well.
pub const MAX_BASKET_QUANTITY: i32 = 9_999;

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub is_staff: bool,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = games)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Game {
    pub id: i32,
    pub name: String,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Game))]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub game_id: i32,
}

/// Catalog row. `average_rating` is derived from reviews and only ever
/// written by rating recalculation.
#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Category))]
#[diesel(belongs_to(Game))]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub old_price: Option<BigDecimal>,
    pub discount: Option<i32>,
    pub average_rating: BigDecimal,
    pub category_id: i32,
    pub game_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Product))]
#[diesel(table_name = basket_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BasketEntry {
    pub id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq)]
#[diesel(belongs_to(User))]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub total_price: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.status == ORDER_STATUS_PENDING
    }
}

/// A line of a placed order. `price` is the unit price captured at checkout.
#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Order))]
#[diesel(belongs_to(Product))]
#[diesel(table_name = order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Product))]
#[diesel(belongs_to(User))]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Review {
    pub id: i32,
    pub product_id: i32,
    pub user_id: i32,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Product))]
#[diesel(table_name = wishlist_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WishlistEntry {
    pub id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub created_at: DateTime<Utc>,
}
