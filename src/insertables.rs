use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Insertable};
use serde::{Deserialize, Serialize};

use crate::schema::{
    basket_entries, categories, games, order_items, orders, products, reviews, users,
    wishlist_entries,
};

#[derive(Insertable, Serialize, Deserialize, Clone)]
#[diesel(table_name=users)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Insertable, Serialize, Deserialize, Clone)]
#[diesel(table_name=games)]
pub struct NewGame {
    pub name: String,
}

#[derive(Insertable, Serialize, Deserialize, Clone)]
#[diesel(table_name=categories)]
pub struct NewCategory {
    pub name: String,
    pub game_id: i32,
}

#[derive(Insertable, Serialize, Deserialize, Clone)]
#[diesel(table_name=products)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub old_price: Option<BigDecimal>,
    pub discount: Option<i32>,
    pub category_id: i32,
    pub game_id: i32,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name=basket_entries)]
pub struct NewBasketEntry {
    pub user_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name=orders)]
pub struct NewOrder {
    pub user_id: i32,
    pub total_price: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name=order_items)]
pub struct NewOrderItem {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name=reviews)]
pub struct NewReview {
    pub product_id: i32,
    pub user_id: i32,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Validated edits to an existing review; `None` leaves the column as is.
#[derive(AsChangeset, Debug, Clone, Default, PartialEq)]
#[diesel(table_name=reviews)]
pub struct ReviewChanges {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

impl ReviewChanges {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.comment.is_none()
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name=wishlist_entries)]
pub struct NewWishlistEntry {
    pub user_id: i32,
    pub product_id: i32,
    pub created_at: DateTime<Utc>,
}
