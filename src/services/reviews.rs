use chrono::Utc;
use tracing::{error, info, instrument};

use crate::access;
use crate::auth::Identity;
use crate::errors::{AppError, InvalidInput, Result};
use crate::insertables::{NewReview, ReviewChanges};
use crate::models::Review;
use crate::store::Store;

pub fn validate_rating(rating: i64) -> std::result::Result<i32, InvalidInput> {
    match rating {
        1..=5 => Ok(rating as i32),
        _ => Err(InvalidInput::InvalidRating),
    }
}

pub fn validate_comment(comment: &str) -> std::result::Result<String, InvalidInput> {
    let comment = comment.trim();
    if comment.is_empty() {
        return Err(InvalidInput::EmptyComment);
    }
    Ok(comment.to_string())
}

/// Recomputes the product's average rating. Failures are logged and do not
/// undo the review write that triggered them.
fn refresh_rating(store: &dyn Store, product_id: i32) {
    match store.recalculate_product_rating(product_id) {
        Ok(average) => info!(product_id, average = %average, "average rating updated"),
        Err(err) => error!(product_id, error = %err, "failed to recalculate product rating"),
    }
}

/// Stores a review authored by `identity`, whatever user the client claimed.
#[instrument(skip(store, comment))]
pub fn submit(
    store: &dyn Store,
    identity: &Identity,
    product_id: i32,
    rating: i64,
    comment: &str,
) -> Result<Review> {
    let rating = validate_rating(rating)?;
    let comment = validate_comment(comment)?;
    store.find_product(product_id)?.ok_or(AppError::NotFound)?;

    let review = store.insert_review(NewReview {
        product_id,
        user_id: identity.user_id,
        rating,
        comment,
        created_at: Utc::now(),
    })?;
    refresh_rating(store, product_id);
    Ok(review)
}

pub fn list(store: &dyn Store, product_id: Option<i32>) -> Result<Vec<Review>> {
    store.list_reviews(product_id)
}

pub fn get(store: &dyn Store, review_id: i32) -> Result<Review> {
    store.find_review(review_id)?.ok_or(AppError::NotFound)
}

fn writable_review(store: &dyn Store, identity: &Identity, review_id: i32) -> Result<Review> {
    let review = get(store, review_id)?;
    if !access::write_allowed(identity, &review) {
        return Err(AppError::Forbidden);
    }
    Ok(review)
}

#[instrument(skip(store, comment))]
pub fn update(
    store: &dyn Store,
    identity: &Identity,
    review_id: i32,
    rating: Option<i64>,
    comment: Option<&str>,
) -> Result<Review> {
    let review = writable_review(store, identity, review_id)?;
    let changes = ReviewChanges {
        rating: rating.map(validate_rating).transpose()?,
        comment: comment.map(validate_comment).transpose()?,
    };
    if changes.is_empty() {
        return Ok(review);
    }
    let updated = store.update_review(review.id, &changes)?;
    refresh_rating(store, updated.product_id);
    Ok(updated)
}

#[instrument(skip(store))]
pub fn delete(store: &dyn Store, identity: &Identity, review_id: i32) -> Result<()> {
    let review = writable_review(store, identity, review_id)?;
    store.delete_review(review.id)?;
    refresh_rating(store, review.product_id);
    Ok(())
}
