use super::{
    MarketStore, REVIEW_KEYS_TABLE, REVIEWS_BY_ORDER_TABLE, REVIEWS_BY_USER_TABLE, REVIEWS_TABLE,
    StorageResult,
};
use redb::{ReadableTable, WriteTransaction};
use shared::models::Review;

impl MarketStore {
    // ========== Review Operations ==========

    pub fn review_exists(
        &self,
        order_id: &str,
        reviewer_id: &str,
        reviewed_id: &str,
    ) -> StorageResult<bool> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(REVIEW_KEYS_TABLE)?;
        Ok(table.get((order_id, reviewer_id, reviewed_id))?.is_some())
    }

    pub fn review_exists_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        reviewer_id: &str,
        reviewed_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(REVIEW_KEYS_TABLE)?;
        Ok(table.get((order_id, reviewer_id, reviewed_id))?.is_some())
    }

    /// Insert a review unless its (order, reviewer, reviewed) key exists.
    ///
    /// Returns `false` without writing when the key is already taken.
    pub fn insert_review_if_absent_txn(
        &self,
        txn: &WriteTransaction,
        review: &Review,
    ) -> StorageResult<bool> {
        let key = (
            review.order_id.as_str(),
            review.reviewer_id.as_str(),
            review.reviewed_user_id.as_str(),
        );
        {
            let mut keys = txn.open_table(REVIEW_KEYS_TABLE)?;
            if keys.get(key)?.is_some() {
                return Ok(false);
            }
            keys.insert(key, review.id.as_str())?;
        }

        let mut table = txn.open_table(REVIEWS_TABLE)?;
        let value = serde_json::to_vec(review)?;
        table.insert(review.id.as_str(), value.as_slice())?;

        let mut by_user = txn.open_table(REVIEWS_BY_USER_TABLE)?;
        by_user.insert(
            (
                review.reviewed_user_id.as_str(),
                review.created_at,
                review.id.as_str(),
            ),
            (),
        )?;

        let mut by_order = txn.open_table(REVIEWS_BY_ORDER_TABLE)?;
        by_order.insert((review.order_id.as_str(), review.id.as_str()), ())?;
        Ok(true)
    }

    /// Reviews received by a user, most recent first
    pub fn list_reviews_for_user(&self, user_id: &str) -> StorageResult<Vec<Review>> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(REVIEWS_BY_USER_TABLE)?;
        let reviews = read_txn.open_table(REVIEWS_TABLE)?;

        let mut result = Vec::new();
        for entry in index.range((user_id, i64::MIN, "")..)? {
            let (key, _) = entry?;
            let (reviewed, _created_at, review_id) = key.value();
            if reviewed != user_id {
                break;
            }
            if let Some(value) = reviews.get(review_id)? {
                result.push(serde_json::from_slice(value.value())?);
            }
        }
        result.reverse();
        Ok(result)
    }

    /// [`list_reviews_for_user`](Self::list_reviews_for_user) inside a write transaction
    pub fn list_reviews_for_user_txn(
        &self,
        txn: &WriteTransaction,
        user_id: &str,
    ) -> StorageResult<Vec<Review>> {
        let index = txn.open_table(REVIEWS_BY_USER_TABLE)?;
        let reviews = txn.open_table(REVIEWS_TABLE)?;

        let mut result = Vec::new();
        for entry in index.range((user_id, i64::MIN, "")..)? {
            let (key, _) = entry?;
            let (reviewed, _created_at, review_id) = key.value();
            if reviewed != user_id {
                break;
            }
            if let Some(value) = reviews.get(review_id)? {
                result.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(result)
    }

    pub fn list_reviews_for_order(&self, order_id: &str) -> StorageResult<Vec<Review>> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(REVIEWS_BY_ORDER_TABLE)?;
        let reviews = read_txn.open_table(REVIEWS_TABLE)?;

        let mut result: Vec<Review> = Vec::new();
        for entry in index.range((order_id, "")..)? {
            let (key, _) = entry?;
            let (order, review_id) = key.value();
            if order != order_id {
                break;
            }
            if let Some(value) = reviews.get(review_id)? {
                result.push(serde_json::from_slice(value.value())?);
            }
        }
        result.sort_by_key(|r| r.created_at);
        Ok(result)
    }

    /// Every review, for aggregate verification
    pub fn list_all_reviews(&self) -> StorageResult<Vec<Review>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(REVIEWS_TABLE)?;

        let mut reviews = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            reviews.push(serde_json::from_slice(value.value())?);
        }
        Ok(reviews)
    }
}
