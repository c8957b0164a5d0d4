use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::dsl::{count_star, sum};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Integer, Numeric};
use diesel::{prelude::*, r2d2};
use tracing::{debug, info};

use crate::errors::{AppError, InvalidInput, Result};
use crate::insertables::{
    NewBasketEntry, NewOrder, NewOrderItem, NewReview, NewWishlistEntry, ReviewChanges,
};
use crate::models::{
    BasketEntry, Order, OrderItem, Product, Review, User, WishlistEntry, ORDER_STATUS_PENDING,
};
use crate::pricing;
use crate::schema::{basket_entries, order_items, orders, products, reviews, users, wishlist_entries};

use super::{
    BasketLine, BasketSummary, OrderDetail, Planner, ProductFilter, ProductSort, Store,
    WishlistToggle,
};

pub type DbPool = r2d2::Pool<r2d2::ConnectionManager<PgConnection>>;

pub fn initialize_db_pool(database_url: &str) -> Result<DbPool> {
    let manager = r2d2::ConnectionManager::<PgConnection>::new(database_url);
    Ok(r2d2::Pool::builder().build(manager)?)
}

#[derive(QueryableByName)]
struct BasketTotals {
    #[diesel(sql_type = BigInt)]
    count: i64,
    #[diesel(sql_type = Numeric)]
    total: BigDecimal,
}

const BASKET_TOTALS_SQL: &str = "SELECT COALESCE(SUM(b.quantity), 0)::int8 AS count, \
     COALESCE(SUM(p.price * b.quantity), 0)::numeric(12, 2) AS total \
     FROM basket_entries b JOIN products p ON p.id = b.product_id \
     WHERE b.user_id = $1";

const CLEANUP_BASKET_SQL: &str =
    "DELETE FROM basket_entries WHERE product_id NOT IN (SELECT id FROM products)";
const CLEANUP_WISHLIST_SQL: &str =
    "DELETE FROM wishlist_entries WHERE product_id NOT IN (SELECT id FROM products)";

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        PgStore { pool }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut PgConnection) -> Result<T>) -> Result<T> {
        let mut conn = self.pool.get()?;
        f(&mut conn)
    }
}

fn lock_user(conn: &mut PgConnection, user_id: i32) -> Result<()> {
    users::table
        .find(user_id)
        .select(users::id)
        .for_update()
        .first::<i32>(conn)?;
    Ok(())
}

/// An add past `MAX_BASKET_QUANTITY` trips the column CHECK.
fn quantity_error(err: DieselError) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, _) => {
            InvalidInput::InvalidQuantity.into()
        }
        other => other.into(),
    }
}

fn load_basket_lines(conn: &mut PgConnection, user_id: i32) -> Result<Vec<BasketLine>> {
    let rows = basket_entries::table
        .inner_join(products::table)
        .filter(basket_entries::user_id.eq(user_id))
        .order((basket_entries::created_at.asc(), basket_entries::id.asc()))
        .select((BasketEntry::as_select(), products::price))
        .load::<(BasketEntry, BigDecimal)>(conn)?;
    Ok(rows
        .into_iter()
        .map(|(entry, unit_price)| BasketLine { entry, unit_price })
        .collect())
}

fn load_order_items(conn: &mut PgConnection, order: &Order) -> Result<Vec<OrderItem>> {
    Ok(OrderItem::belonging_to(order)
        .select(OrderItem::as_select())
        .order(order_items::id.asc())
        .load(conn)?)
}

impl Store for PgStore {
    fn find_user(&self, user_id: i32) -> Result<Option<User>> {
        self.with_conn(|conn| {
            Ok(users::table
                .find(user_id)
                .select(User::as_select())
                .first(conn)
                .optional()?)
        })
    }

    fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        self.with_conn(|conn| {
            let mut query = products::table.select(Product::as_select()).into_boxed();
            if let Some(game) = filter.game_id {
                query = query.filter(products::game_id.eq(game));
            }
            if !filter.category_ids.is_empty() {
                query = query.filter(products::category_id.eq_any(filter.category_ids.clone()));
            }
            if let Some(min) = &filter.min_price {
                query = query.filter(products::price.ge(min.clone()));
            }
            if let Some(max) = &filter.max_price {
                query = query.filter(products::price.le(max.clone()));
            }
            query = match filter.sort {
                ProductSort::PriceAsc => query.order((products::price.asc(), products::id.asc())),
                ProductSort::PriceDesc => {
                    query.order((products::price.desc(), products::id.asc()))
                }
                ProductSort::Default => query.order(products::id.asc()),
            };
            Ok(query.load::<Product>(conn)?)
        })
    }

    fn find_product(&self, product_id: i32) -> Result<Option<Product>> {
        self.with_conn(|conn| {
            Ok(products::table
                .find(product_id)
                .select(Product::as_select())
                .first(conn)
                .optional()?)
        })
    }

    fn delete_product(&self, product_id: i32) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = diesel::delete(products::table.find(product_id)).execute(conn)?;
            Ok(deleted > 0)
        })
    }

    fn cleanup_orphaned_items(&self) -> Result<usize> {
        self.with_conn(|conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                let baskets = diesel::sql_query(CLEANUP_BASKET_SQL).execute(conn)?;
                let wishlists = diesel::sql_query(CLEANUP_WISHLIST_SQL).execute(conn)?;
                debug!(baskets, wishlists, "removed orphaned rows");
                Ok(baskets + wishlists)
            })
        })
    }

    fn basket_lines(&self, user_id: i32) -> Result<Vec<BasketLine>> {
        self.with_conn(|conn| load_basket_lines(conn, user_id))
    }

    fn basket_summary(&self, user_id: i32) -> Result<BasketSummary> {
        self.with_conn(|conn| {
            let totals = diesel::sql_query(BASKET_TOTALS_SQL)
                .bind::<Integer, _>(user_id)
                .get_result::<BasketTotals>(conn)?;
            Ok(BasketSummary {
                count: totals.count,
                total: pricing::to_currency(totals.total),
            })
        })
    }

    fn find_basket_entry(&self, entry_id: i32) -> Result<Option<BasketEntry>> {
        self.with_conn(|conn| {
            Ok(basket_entries::table
                .find(entry_id)
                .select(BasketEntry::as_select())
                .first(conn)
                .optional()?)
        })
    }

    fn add_to_basket(&self, user_id: i32, product_id: i32) -> Result<BasketEntry> {
        self.with_conn(|conn| {
            let entry = NewBasketEntry {
                user_id,
                product_id,
                quantity: 1,
                created_at: Utc::now(),
            };
            Ok(diesel::insert_into(basket_entries::table)
                .values(&entry)
                .on_conflict((basket_entries::user_id, basket_entries::product_id))
                .do_update()
                .set(basket_entries::quantity.eq(basket_entries::quantity + 1))
                .get_result::<BasketEntry>(conn)
                .map_err(quantity_error)?)
        })
    }

    fn set_basket_quantity(&self, entry_id: i32, quantity: i32) -> Result<BasketEntry> {
        self.with_conn(|conn| {
            Ok(diesel::update(basket_entries::table.find(entry_id))
                .set(basket_entries::quantity.eq(quantity))
                .get_result::<BasketEntry>(conn)
                .map_err(quantity_error)?)
        })
    }

    fn remove_basket_entry(&self, entry_id: i32) -> Result<()> {
        self.with_conn(|conn| {
            match diesel::delete(basket_entries::table.find(entry_id)).execute(conn)? {
                0 => Err(AppError::NotFound),
                _ => Ok(()),
            }
        })
    }

    fn create_order_from_basket(&self, user_id: i32, plan: Planner<'_>) -> Result<OrderDetail> {
        self.with_conn(|conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                // Serializes checkouts of the same user and pins the basket rows.
                lock_user(conn, user_id)?;
                basket_entries::table
                    .filter(basket_entries::user_id.eq(user_id))
                    .select(basket_entries::id)
                    .for_update()
                    .load::<i32>(conn)?;

                let lines = load_basket_lines(conn, user_id)?;
                let planned = plan(lines.as_slice())?;

                let order = diesel::insert_into(orders::table)
                    .values(&NewOrder {
                        user_id,
                        total_price: planned.total_price.clone(),
                        status: ORDER_STATUS_PENDING.to_string(),
                        created_at: Utc::now(),
                    })
                    .get_result::<Order>(conn)?;

                let new_items: Vec<NewOrderItem> = planned
                    .items
                    .iter()
                    .map(|item| NewOrderItem {
                        order_id: order.id,
                        product_id: item.product_id,
                        quantity: item.quantity,
                        price: item.price.clone(),
                    })
                    .collect();
                let items = diesel::insert_into(order_items::table)
                    .values(&new_items)
                    .get_results::<OrderItem>(conn)?;

                let snapshot: Vec<i32> = lines.iter().map(|line| line.entry.id).collect();
                diesel::delete(basket_entries::table.filter(basket_entries::id.eq_any(snapshot)))
                    .execute(conn)?;

                info!(order_id = order.id, user_id, items = items.len(), "order created from basket");
                Ok(OrderDetail { order, items })
            })
        })
    }

    fn list_orders(&self, owner: Option<i32>) -> Result<Vec<OrderDetail>> {
        self.with_conn(|conn| {
            let mut query = orders::table
                .select(Order::as_select())
                .order((orders::created_at.desc(), orders::id.desc()))
                .into_boxed();
            if let Some(user_id) = owner {
                query = query.filter(orders::user_id.eq(user_id));
            }
            let found = query.load::<Order>(conn)?;
            let items = OrderItem::belonging_to(&found)
                .select(OrderItem::as_select())
                .order(order_items::id.asc())
                .load::<OrderItem>(conn)?;
            Ok(items
                .grouped_by(&found)
                .into_iter()
                .zip(found)
                .map(|(items, order)| OrderDetail { order, items })
                .collect())
        })
    }

    fn find_order(&self, order_id: i32) -> Result<Option<OrderDetail>> {
        self.with_conn(|conn| {
            let order = orders::table
                .find(order_id)
                .select(Order::as_select())
                .first::<Order>(conn)
                .optional()?;
            match order {
                Some(order) => {
                    let items = load_order_items(conn, &order)?;
                    Ok(Some(OrderDetail { order, items }))
                }
                None => Ok(None),
            }
        })
    }

    fn set_order_status(&self, order_id: i32, status: &str) -> Result<Order> {
        self.with_conn(|conn| {
            Ok(diesel::update(orders::table.find(order_id))
                .set(orders::status.eq(status))
                .get_result::<Order>(conn)?)
        })
    }

    fn delete_order(&self, order_id: i32) -> Result<()> {
        self.with_conn(|conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                diesel::delete(order_items::table.filter(order_items::order_id.eq(order_id)))
                    .execute(conn)?;
                match diesel::delete(orders::table.find(order_id)).execute(conn)? {
                    0 => Err(AppError::NotFound),
                    _ => Ok(()),
                }
            })
        })
    }

    fn list_reviews(&self, product_id: Option<i32>) -> Result<Vec<Review>> {
        self.with_conn(|conn| {
            let mut query = reviews::table
                .select(Review::as_select())
                .order((reviews::created_at.desc(), reviews::id.desc()))
                .into_boxed();
            if let Some(product) = product_id {
                query = query.filter(reviews::product_id.eq(product));
            }
            Ok(query.load::<Review>(conn)?)
        })
    }

    fn find_review(&self, review_id: i32) -> Result<Option<Review>> {
        self.with_conn(|conn| {
            Ok(reviews::table
                .find(review_id)
                .select(Review::as_select())
                .first(conn)
                .optional()?)
        })
    }

    fn insert_review(&self, review: NewReview) -> Result<Review> {
        self.with_conn(|conn| {
            Ok(diesel::insert_into(reviews::table)
                .values(&review)
                .get_result::<Review>(conn)?)
        })
    }

    fn update_review(&self, review_id: i32, changes: &ReviewChanges) -> Result<Review> {
        self.with_conn(|conn| {
            Ok(diesel::update(reviews::table.find(review_id))
                .set(changes)
                .get_result::<Review>(conn)?)
        })
    }

    fn delete_review(&self, review_id: i32) -> Result<()> {
        self.with_conn(|conn| {
            match diesel::delete(reviews::table.find(review_id)).execute(conn)? {
                0 => Err(AppError::NotFound),
                _ => Ok(()),
            }
        })
    }

    fn recalculate_product_rating(&self, product_id: i32) -> Result<BigDecimal> {
        self.with_conn(|conn| {
            let (count, rating_sum) = reviews::table
                .filter(reviews::product_id.eq(product_id))
                .select((count_star(), sum(reviews::rating)))
                .first::<(i64, Option<i64>)>(conn)?;
            let average = pricing::average_rating(rating_sum.unwrap_or(0), count);
            diesel::update(products::table.find(product_id))
                .set(products::average_rating.eq(average.clone()))
                .execute(conn)?;
            Ok(average)
        })
    }

    fn wishlist(&self, user_id: i32) -> Result<Vec<WishlistEntry>> {
        self.with_conn(|conn| {
            Ok(wishlist_entries::table
                .filter(wishlist_entries::user_id.eq(user_id))
                .select(WishlistEntry::as_select())
                .order((wishlist_entries::created_at.desc(), wishlist_entries::id.desc()))
                .load(conn)?)
        })
    }

    fn wishlist_count(&self, user_id: i32) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(wishlist_entries::table
                .filter(wishlist_entries::user_id.eq(user_id))
                .count()
                .get_result::<i64>(conn)?)
        })
    }

    fn toggle_wishlist(&self, user_id: i32, product_id: i32) -> Result<WishlistToggle> {
        self.with_conn(|conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                lock_user(conn, user_id)?;
                let removed = diesel::delete(
                    wishlist_entries::table
                        .filter(wishlist_entries::user_id.eq(user_id))
                        .filter(wishlist_entries::product_id.eq(product_id)),
                )
                .execute(conn)?;
                if removed > 0 {
                    return Ok(WishlistToggle::Removed);
                }
                diesel::insert_into(wishlist_entries::table)
                    .values(&NewWishlistEntry {
                        user_id,
                        product_id,
                        created_at: Utc::now(),
                    })
                    .on_conflict_do_nothing()
                    .execute(conn)?;
                Ok(WishlistToggle::Added)
            })
        })
    }
}

// These run against the database named by `DATABASE_URL` with migrations
// applied: `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::auth::Identity;
    use crate::errors::InvalidInput;
    use crate::insertables::{NewCategory, NewGame, NewProduct, NewUser};
    use crate::models::{Game, MAX_BASKET_QUANTITY};
    use crate::schema::{categories, games};
    use crate::services::{basket, orders, wishlist};
    use crate::test_utils::{dec, init_test_tracing};

    static SEQ: AtomicUsize = AtomicUsize::new(0);

    /// Scratch users and catalog rows, removed again on drop.
    struct PgFixture {
        store: PgStore,
        game_id: i32,
        alice: Identity,
        bob: Identity,
        p1: Product,
        p2: Product,
    }

    impl Drop for PgFixture {
        fn drop(&mut self) {
            if let Ok(mut conn) = self.store.pool.get() {
                let ids = vec![self.alice.user_id, self.bob.user_id];
                let _ = diesel::delete(users::table.filter(users::id.eq_any(ids))).execute(&mut conn);
                let _ = diesel::delete(games::table.find(self.game_id)).execute(&mut conn);
            }
        }
    }

    fn pg_fixture() -> PgFixture {
        init_test_tracing();
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must name a migrated database");
        let store = PgStore::new(initialize_db_pool(&url).unwrap());
        let tag = format!(
            "{}-{}-{}",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::SeqCst),
            Utc::now().timestamp_micros()
        );

        let mut pooled = store.pool.get().unwrap();
        let conn: &mut PgConnection = &mut pooled;
        let mut shopper = |name: &str| {
            let user = diesel::insert_into(users::table)
                .values(&NewUser {
                    username: format!("{name}-{tag}"),
                    is_staff: false,
                })
                .get_result::<User>(conn)
                .unwrap();
            Identity {
                user_id: user.id,
                is_staff: false,
            }
        };
        let alice = shopper("alice");
        let bob = shopper("bob");

        let game = diesel::insert_into(games::table)
            .values(&NewGame {
                name: format!("game-{tag}"),
            })
            .get_result::<Game>(conn)
            .unwrap();
        let category_id = diesel::insert_into(categories::table)
            .values(&NewCategory {
                name: "Skins".to_string(),
                game_id: game.id,
            })
            .returning(categories::id)
            .get_result::<i32>(conn)
            .unwrap();
        let mut product = |name: &str, price: &str| {
            diesel::insert_into(products::table)
                .values(&NewProduct {
                    name: name.to_string(),
                    description: String::new(),
                    price: dec(price),
                    old_price: None,
                    discount: None,
                    category_id,
                    game_id: game.id,
                })
                .get_result::<Product>(conn)
                .unwrap()
        };
        let p1 = product("Arcana", "10.00");
        let p2 = product("Courier", "5.50");
        drop(pooled);

        PgFixture {
            store,
            game_id: game.id,
            alice,
            bob,
            p1,
            p2,
        }
    }

    fn fill_basket(f: &PgFixture) {
        basket::add(&f.store, &f.alice, f.p1.id).unwrap();
        basket::add(&f.store, &f.alice, f.p1.id).unwrap();
        basket::add(&f.store, &f.alice, f.p2.id).unwrap();
    }

    #[test]
    #[ignore = "needs a migrated PostgreSQL database in DATABASE_URL"]
    fn checkout_snapshots_prices_and_empties_basket() {
        let f = pg_fixture();
        fill_basket(&f);

        let placed = orders::checkout(&f.store, &f.alice).unwrap();
        assert_eq!(placed.order.total_price, dec("25.50"));
        assert_eq!(placed.order.status, ORDER_STATUS_PENDING);
        let items: Vec<(i32, i32, BigDecimal)> = placed
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity, item.price.clone()))
            .collect();
        assert_eq!(
            items,
            vec![(f.p1.id, 2, dec("10.00")), (f.p2.id, 1, dec("5.50"))]
        );
        assert!(f.store.basket_lines(f.alice.user_id).unwrap().is_empty());

        let mut conn = f.store.pool.get().unwrap();
        diesel::update(products::table.find(f.p1.id))
            .set(products::price.eq(dec("99.00")))
            .execute(&mut conn)
            .unwrap();
        let stored = f.store.find_order(placed.order.id).unwrap().unwrap();
        assert_eq!(stored, placed);
    }

    #[test]
    #[ignore = "needs a migrated PostgreSQL database in DATABASE_URL"]
    fn concurrent_checkouts_create_one_order() {
        let f = pg_fixture();
        fill_basket(&f);

        let results: Vec<Result<OrderDetail>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| orders::checkout(&f.store, &f.alice)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let created: Vec<&OrderDetail> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].order.total_price, dec("25.50"));
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(err, AppError::InvalidInput(InvalidInput::EmptyBasket)));
        }
        assert_eq!(f.store.list_orders(Some(f.alice.user_id)).unwrap().len(), 1);
        assert!(f.store.basket_lines(f.alice.user_id).unwrap().is_empty());
    }

    #[test]
    #[ignore = "needs a migrated PostgreSQL database in DATABASE_URL"]
    fn basket_aggregate_matches_row_summary() {
        let f = pg_fixture();
        fill_basket(&f);

        for user in [f.alice, f.bob] {
            let primary = f.store.basket_summary(user.user_id).unwrap();
            let local = basket::summarize(&f.store.basket_lines(user.user_id).unwrap());
            assert_eq!(primary, local);
        }
        let alice = f.store.basket_summary(f.alice.user_id).unwrap();
        assert_eq!(alice.count, 3);
        assert_eq!(alice.total, dec("25.50"));
    }

    #[test]
    #[ignore = "needs a migrated PostgreSQL database in DATABASE_URL"]
    fn add_upserts_and_stops_at_the_quantity_cap() {
        let f = pg_fixture();
        basket::add(&f.store, &f.alice, f.p1.id).unwrap();
        let entry = basket::add(&f.store, &f.alice, f.p1.id).unwrap();
        assert_eq!(entry.quantity, 2);
        assert_eq!(f.store.basket_lines(f.alice.user_id).unwrap().len(), 1);

        f.store.set_basket_quantity(entry.id, MAX_BASKET_QUANTITY).unwrap();
        let err = basket::add(&f.store, &f.alice, f.p1.id).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidInput(InvalidInput::InvalidQuantity)
        ));
        let line = f.store.find_basket_entry(entry.id).unwrap().unwrap();
        assert_eq!(line.quantity, MAX_BASKET_QUANTITY);
    }

    #[test]
    #[ignore = "needs a migrated PostgreSQL database in DATABASE_URL"]
    fn concurrent_wishlist_toggles_serialize() {
        let f = pg_fixture();

        std::thread::scope(|scope| {
            for _ in 0..6 {
                scope.spawn(|| wishlist::toggle(&f.store, &f.bob, f.p2.id).unwrap());
            }
        });

        assert_eq!(f.store.wishlist_count(f.bob.user_id).unwrap(), 0);
        assert!(f.store.wishlist(f.bob.user_id).unwrap().is_empty());
    }
}
