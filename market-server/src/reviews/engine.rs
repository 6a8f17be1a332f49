use shared::error::{AppError, ErrorCode};
use shared::models::{MAX_COMMENT_LEN, Review, ReviewCreate, ReviewEligibility, User, clamp_rating};
use shared::util::{new_id, now_millis};
use thiserror::Error;

use super::eligibility::{self, IneligibleReason};
use crate::store::{MarketStore, StorageError};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{0}")]
    Ineligible(IneligibleReason),

    #[error("Comment is too long ({len} characters, max {MAX_COMMENT_LEN})")]
    CommentTooLong { len: usize },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("You are not part of this order")]
    NotParty,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ReviewResult<T> = Result<T, ReviewError>;

impl From<redb::CommitError> for ReviewError {
    fn from(err: redb::CommitError) -> Self {
        Self::Storage(err.into())
    }
}

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        let message = err.to_string();
        match err {
            ReviewError::Ineligible(reason) => AppError::with_message(reason.code(), message),
            ReviewError::CommentTooLong { len } => {
                AppError::with_message(ErrorCode::ReviewCommentTooLong, message)
                    .with_detail("length", len)
                    .with_detail("max", MAX_COMMENT_LEN)
            }
            ReviewError::UserNotFound(id) => {
                AppError::with_message(ErrorCode::UserNotFound, message).with_detail("id", id)
            }
            ReviewError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("id", id)
            }
            ReviewError::NotParty => AppError::with_message(ErrorCode::NotOrderParty, message),
            ReviewError::Storage(e) => e.into(),
        }
    }
}

/// Review Engine
///
/// A review and the rating it folds into the reviewed user's aggregate are
/// written in the same transaction.
#[derive(Clone)]
pub struct ReviewEngine {
    store: MarketStore,
}

impl ReviewEngine {
    pub fn new(store: MarketStore) -> Self {
        Self { store }
    }

    pub fn check_eligibility(
        &self,
        order_id: &str,
        reviewer_id: &str,
        reviewed_id: &str,
    ) -> ReviewResult<ReviewEligibility> {
        let order = self.store.get_order(order_id)?;
        let result = eligibility::evaluate(order.as_ref(), reviewer_id, reviewed_id, || {
            self.store.review_exists(order_id, reviewer_id, reviewed_id)
        })?;
        Ok(eligibility::to_response(result))
    }

    /// Submit a review.
    ///
    /// Eligibility is re-evaluated here regardless of any earlier check.
    /// The rating is clamped into 1..=5; an overlong comment is rejected.
    pub fn submit_review(&self, reviewer_id: &str, req: &ReviewCreate) -> ReviewResult<Review> {
        let txn = self.store.begin_write()?;

        let order = self.store.get_order_txn(&txn, &req.order_id)?;
        eligibility::evaluate(order.as_ref(), reviewer_id, &req.reviewed_user_id, || {
            self.store
                .review_exists_txn(&txn, &req.order_id, reviewer_id, &req.reviewed_user_id)
        })?
        .map_err(ReviewError::Ineligible)?;

        let rating = clamp_rating(req.rating);
        let len = req.comment.chars().count();
        if len > MAX_COMMENT_LEN {
            return Err(ReviewError::CommentTooLong { len });
        }

        let mut reviewed = self
            .store
            .get_user_txn(&txn, &req.reviewed_user_id)?
            .ok_or_else(|| ReviewError::UserNotFound(req.reviewed_user_id.clone()))?;

        let review = Review {
            id: new_id(),
            rating,
            comment: req.comment.clone(),
            reviewer_id: reviewer_id.to_string(),
            reviewer_name: self.store.display_name_txn(&txn, reviewer_id)?,
            reviewed_user_id: req.reviewed_user_id.clone(),
            order_id: req.order_id.clone(),
            created_at: now_millis(),
        };

        if !self.store.insert_review_if_absent_txn(&txn, &review)? {
            return Err(ReviewError::Ineligible(IneligibleReason::AlreadyReviewed));
        }

        reviewed.user.apply_rating(rating);
        self.store.put_user_txn(&txn, &reviewed)?;
        txn.commit()?;

        tracing::info!(
            review_id = %review.id,
            order_id = %review.order_id,
            reviewed = %review.reviewed_user_id,
            rating,
            new_average = reviewed.user.rating,
            "Review submitted"
        );
        Ok(review)
    }

    /// Reviews received by a user, most recent first
    pub fn list_for_user(&self, user_id: &str) -> ReviewResult<Vec<Review>> {
        Ok(self.store.list_reviews_for_user(user_id)?)
    }

    /// Reviews attached to an order, visible to its parties
    pub fn list_for_order(
        &self,
        order_id: &str,
        viewer: &str,
        is_operator: bool,
    ) -> ReviewResult<Vec<Review>> {
        let order = self
            .store
            .get_order(order_id)?
            .ok_or_else(|| ReviewError::OrderNotFound(order_id.to_string()))?;
        if !is_operator && !order.is_party(viewer) {
            return Err(ReviewError::NotParty);
        }
        Ok(self.store.list_reviews_for_order(order_id)?)
    }

    /// Rebuild a user's aggregate from every review they received
    pub fn recompute_rating(&self, user_id: &str) -> ReviewResult<User> {
        let txn = self.store.begin_write()?;
        let mut record = self
            .store
            .get_user_txn(&txn, user_id)?
            .ok_or_else(|| ReviewError::UserNotFound(user_id.to_string()))?;

        let reviews = self.store.list_reviews_for_user_txn(&txn, user_id)?;
        let count = reviews.len() as u32;
        let sum: f64 = reviews.iter().map(|r| r.rating as f64).sum();
        let previous = record.user.rating;

        record.user.total_ratings = count;
        record.user.rating = if count == 0 { 0.0 } else { sum / count as f64 };
        self.store.put_user_txn(&txn, &record)?;
        txn.commit()?;

        if (previous - record.user.rating).abs() > 1e-9 {
            tracing::warn!(user_id, previous, recomputed = record.user.rating, "Rating drift corrected");
        }
        Ok(record.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UserRecord;
    use rust_decimal::Decimal;
    use shared::models::{LineItem, Order, OrderStatus, ProductCategory, ProductCondition, ProductSnapshot};

    fn put_user(store: &MarketStore, id: &str, name: &str) {
        let txn = store.begin_write().unwrap();
        store
            .put_user_txn(
                &txn,
                &UserRecord {
                    user: User {
                        id: id.to_string(),
                        username: name.to_lowercase(),
                        full_name: name.to_string(),
                        is_email_verified: true,
                        rating: 0.0,
                        total_ratings: 0,
                        created_at: 0,
                    },
                    password_hash: String::new(),
                    verification_code: None,
                    password_reset: None,
                },
            )
            .unwrap();
        txn.commit().unwrap();
    }

    fn put_order(store: &MarketStore, id: &str, buyer: &str, seller: &str, status: OrderStatus) {
        let snapshot = ProductSnapshot {
            product_id: format!("p-{id}"),
            title: "Chair".into(),
            description: String::new(),
            price: Decimal::from(15),
            category: ProductCategory::Furniture,
            condition: ProductCondition::Fair,
            images: vec![],
            seller_id: seller.to_string(),
            location: "Quad".into(),
        };
        let order = Order {
            id: id.to_string(),
            items: vec![LineItem::new(snapshot, 1).unwrap()],
            buyer_id: buyer.to_string(),
            buyer_name: buyer.to_string(),
            seller_id: seller.to_string(),
            seller_name: seller.to_string(),
            total_amount: Decimal::from(15),
            status,
            payment_intent_id: None,
            created_at: 0,
            updated_at: 0,
            meeting_location: None,
            meeting_time: None,
        };
        let txn = store.begin_write().unwrap();
        store.put_order_txn(&txn, &order).unwrap();
        txn.commit().unwrap();
    }

    fn review(order: &str, reviewed: &str, rating: i64, comment: &str) -> ReviewCreate {
        ReviewCreate {
            order_id: order.to_string(),
            reviewed_user_id: reviewed.to_string(),
            rating,
            comment: comment.to_string(),
        }
    }

    fn setup() -> (MarketStore, ReviewEngine) {
        let store = MarketStore::open_in_memory().unwrap();
        put_user(&store, "b", "Buyer Bee");
        put_user(&store, "s", "Seller Sam");
        (store.clone(), ReviewEngine::new(store))
    }

    #[test]
    fn test_submit_updates_aggregate_once() {
        let (store, engine) = setup();
        put_order(&store, "o1", "b", "s", OrderStatus::Completed);

        let r = engine.submit_review("b", &review("o1", "s", 5, "Great!")).unwrap();
        assert_eq!(r.reviewer_name, "Buyer Bee");
        let seller = store.get_user("s").unwrap().unwrap().user;
        assert_eq!(seller.rating, 5.0);
        assert_eq!(seller.total_ratings, 1);

        let err = engine
            .submit_review("b", &review("o1", "s", 1, "changed my mind"))
            .unwrap_err();
        assert!(matches!(err, ReviewError::Ineligible(IneligibleReason::AlreadyReviewed)));
        assert_eq!(store.get_user("s").unwrap().unwrap().user.total_ratings, 1);

        // The counterparty may still review in the other direction
        engine.submit_review("s", &review("o1", "b", 4, "")).unwrap();
        assert_eq!(store.get_user("b").unwrap().unwrap().user.rating, 4.0);
    }

    #[test]
    fn test_rating_is_clamped() {
        let (store, engine) = setup();
        put_order(&store, "o1", "b", "s", OrderStatus::Completed);
        put_order(&store, "o2", "b", "s", OrderStatus::Completed);

        assert_eq!(engine.submit_review("b", &review("o1", "s", 0, "")).unwrap().rating, 1);
        assert_eq!(engine.submit_review("b", &review("o2", "s", 6, "")).unwrap().rating, 5);
        let seller = store.get_user("s").unwrap().unwrap().user;
        assert_eq!(seller.rating, 3.0);
    }

    #[test]
    fn test_comment_length_boundary() {
        let (store, engine) = setup();
        put_order(&store, "o1", "b", "s", OrderStatus::Completed);
        put_order(&store, "o2", "b", "s", OrderStatus::Completed);

        let err = engine
            .submit_review("b", &review("o1", "s", 3, &"a".repeat(501)))
            .unwrap_err();
        assert!(matches!(err, ReviewError::CommentTooLong { len: 501 }));
        assert!(store.list_all_reviews().unwrap().is_empty());

        engine
            .submit_review("b", &review("o2", "s", 3, &"ü".repeat(500)))
            .unwrap();
    }

    #[test]
    fn test_submit_rejects_with_eligibility_taxonomy() {
        let (store, engine) = setup();
        put_order(&store, "o1", "b", "s", OrderStatus::Confirmed);

        let err = engine.submit_review("b", &review("o1", "s", 5, "")).unwrap_err();
        assert!(matches!(err, ReviewError::Ineligible(IneligibleReason::OrderNotCompleted)));
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::ReviewOrderNotCompleted);
        assert_eq!(app.message, "Order must be completed before leaving a review");

        let err = engine.submit_review("b", &review("ghost", "s", 5, "")).unwrap_err();
        assert!(matches!(err, ReviewError::Ineligible(IneligibleReason::OrderNotFound)));
    }

    #[test]
    fn test_check_eligibility() {
        let (store, engine) = setup();
        put_order(&store, "o1", "b", "s", OrderStatus::Completed);
        assert!(engine.check_eligibility("o1", "b", "s").unwrap().eligible);

        let answer = engine.check_eligibility("o1", "x", "s").unwrap();
        assert_eq!(answer.reason.as_deref(), Some("You are not part of this order"));
        let answer = engine.check_eligibility("o1", "b", "b").unwrap();
        assert_eq!(
            answer.reason.as_deref(),
            Some("You can only review the other party in the transaction")
        );
    }

    #[test]
    fn test_aggregate_matches_full_recompute() {
        let (store, engine) = setup();
        let ratings = [5, 3, 4, 1, 2, 5, 4];
        for (i, rating) in ratings.iter().enumerate() {
            let buyer = format!("b{i}");
            put_user(&store, &buyer, &buyer);
            let order_id = format!("o{i}");
            put_order(&store, &order_id, &buyer, "s", OrderStatus::Completed);
            engine.submit_review(&buyer, &review(&order_id, "s", *rating, "")).unwrap();
        }

        let incremental = store.get_user("s").unwrap().unwrap().user;
        let mean = ratings.iter().sum::<i64>() as f64 / ratings.len() as f64;
        assert_eq!(incremental.total_ratings, ratings.len() as u32);
        assert!((incremental.rating - mean).abs() < 1e-9);

        let recomputed = engine.recompute_rating("s").unwrap();
        assert!((recomputed.rating - incremental.rating).abs() < 1e-9);
        assert_eq!(engine.list_for_user("s").unwrap().len(), ratings.len());
    }

    #[test]
    fn test_list_for_order_restricted_to_parties() {
        let (store, engine) = setup();
        put_order(&store, "o1", "b", "s", OrderStatus::Completed);
        engine.submit_review("b", &review("o1", "s", 5, "")).unwrap();

        assert_eq!(engine.list_for_order("o1", "s", false).unwrap().len(), 1);
        assert!(matches!(
            engine.list_for_order("o1", "x", false),
            Err(ReviewError::NotParty)
        ));
        assert_eq!(engine.list_for_order("o1", "x", true).unwrap().len(), 1);
    }
}
