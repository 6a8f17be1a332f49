//! Order Engine
//!
//! Every mutation runs inside a single redb write transaction. Because redb
//! serializes writers, the availability check in [`OrderEngine::create_order`]
//! and the flip that follows it are one conditional update: two buyers racing
//! for the same listing cannot both win.

use std::collections::HashSet;

use redb::WriteTransaction;
use shared::models::{
    LineItem, MeetupRequest, Order, OrderItemRequest, OrderStatus, Product, ProductSnapshot,
};
use shared::money;
use shared::util::{new_id, now_millis};

use super::{OrderError, OrderResult};
use crate::store::MarketStore;
use crate::utils::validation::{MAX_LOCATION_LEN, validate_required_text};

/// Who is driving a status change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionCause {
    /// Verified gateway settlement carrying the intent id
    PaymentSettled { intent_id: String },
    /// Buyer or seller acting on their own order
    Party { user_id: String },
    /// Configured operator override
    Operator { user_id: String },
}

#[derive(Clone)]
pub struct OrderEngine {
    store: MarketStore,
}

fn validate_items(items: &[OrderItemRequest]) -> OrderResult<()> {
    if items.is_empty() {
        return Err(OrderError::Empty);
    }
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if item.quantity < 1 {
            return Err(OrderError::InvalidQuantity(item.product_id.clone()));
        }
        if !seen.insert(item.product_id.as_str()) {
            return Err(OrderError::DuplicateItem(item.product_id.clone()));
        }
    }
    Ok(())
}

/// Which causes may request which targets
fn check_cause(order: &Order, next: OrderStatus, cause: &TransitionCause) -> OrderResult<()> {
    match cause {
        TransitionCause::Operator { .. } => Ok(()),
        TransitionCause::PaymentSettled { .. } => match next {
            OrderStatus::Completed => Ok(()),
            other => Err(OrderError::CauseNotPermitted(other)),
        },
        TransitionCause::Party { user_id } => match next {
            OrderStatus::Confirmed if order.seller_id == *user_id => Ok(()),
            OrderStatus::Confirmed => Err(OrderError::SellerOnly),
            OrderStatus::MeetingScheduled | OrderStatus::Cancelled => Ok(()),
            other => Err(OrderError::CauseNotPermitted(other)),
        },
    }
}

impl OrderEngine {
    pub fn new(store: MarketStore) -> Self {
        Self { store }
    }

    /// Create a pending order and withdraw its products from the market.
    ///
    /// Checks run in a fixed order: item shape, product existence, own
    /// listing, single seller, availability. Nothing is written unless every
    /// check passes.
    pub fn create_order(&self, buyer_id: &str, items: &[OrderItemRequest]) -> OrderResult<Order> {
        validate_items(items)?;

        let txn = self.store.begin_write()?;

        let mut products: Vec<(Product, u32)> = Vec::with_capacity(items.len());
        for item in items {
            let product = self
                .store
                .get_product_txn(&txn, &item.product_id)?
                .ok_or_else(|| OrderError::ProductNotFound(item.product_id.clone()))?;
            products.push((product, item.quantity));
        }

        if let Some((own, _)) = products.iter().find(|(p, _)| p.seller_id == buyer_id) {
            return Err(OrderError::OwnListing(own.id.clone()));
        }

        let mut sellers: Vec<String> = products.iter().map(|(p, _)| p.seller_id.clone()).collect();
        sellers.sort();
        sellers.dedup();
        if sellers.len() > 1 {
            return Err(OrderError::MultiSeller { sellers });
        }
        let seller_id = sellers.pop().ok_or(OrderError::Empty)?;

        let unavailable: Vec<String> = products
            .iter()
            .filter(|(p, _)| !p.is_available)
            .map(|(p, _)| p.id.clone())
            .collect();
        if !unavailable.is_empty() {
            return Err(OrderError::ProductUnavailable(unavailable));
        }

        let line_items = products
            .iter()
            .map(|(p, qty)| LineItem::new(ProductSnapshot::from(p), *qty))
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount = money::sum_totals(line_items.iter().map(|i| i.line_total))?;

        let now = now_millis();
        let order = Order {
            id: new_id(),
            items: line_items,
            buyer_id: buyer_id.to_string(),
            buyer_name: self.store.display_name_txn(&txn, buyer_id)?,
            seller_name: self.store.display_name_txn(&txn, &seller_id)?,
            seller_id,
            total_amount,
            status: OrderStatus::Pending,
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
            meeting_location: None,
            meeting_time: None,
        };
        self.store.put_order_txn(&txn, &order)?;

        // Guarded flip: only a product that was still available counts
        let mut failed = Vec::new();
        for (product, _) in &products {
            if self.store.set_availability_txn(&txn, &product.id, false)? != Some(true) {
                failed.push(product.id.clone());
            }
        }
        if !failed.is_empty() {
            // Dropping the transaction discards the order as well
            return Err(OrderError::ProductUnavailable(failed));
        }

        txn.commit()?;

        tracing::info!(
            order_id = %order.id,
            buyer_id = %order.buyer_id,
            seller_id = %order.seller_id,
            total = %order.total_amount,
            "Order created"
        );
        Ok(order)
    }

    /// Move an order to `next` on behalf of `cause`.
    pub fn advance_status(
        &self,
        order_id: &str,
        next: OrderStatus,
        cause: &TransitionCause,
    ) -> OrderResult<Order> {
        let txn = self.store.begin_write()?;
        let order = self.advance_status_txn(&txn, order_id, next, cause)?;
        txn.commit()?;
        log_transition(&order, cause);
        Ok(order)
    }

    /// [`advance_status`](Self::advance_status) inside a caller-owned transaction
    pub fn advance_status_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        next: OrderStatus,
        cause: &TransitionCause,
    ) -> OrderResult<Order> {
        self.transition_txn(txn, order_id, next, cause, |_| {})
    }

    fn transition_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        next: OrderStatus,
        cause: &TransitionCause,
        edit: impl FnOnce(&mut Order),
    ) -> OrderResult<Order> {
        let mut order = self
            .store
            .get_order_txn(txn, order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        if let TransitionCause::Party { user_id } = cause
            && !order.is_party(user_id)
        {
            return Err(OrderError::NotParty);
        }
        if !order.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }
        check_cause(&order, next, cause)?;

        order.status = next;
        order.updated_at = now_millis();
        if let TransitionCause::PaymentSettled { intent_id } = cause {
            order.payment_intent_id = Some(intent_id.clone());
        }
        edit(&mut order);

        if !next.holds_inventory() {
            for product_id in order.product_ids() {
                // A product removed from the catalog has nothing to release
                self.store.set_availability_txn(txn, product_id, true)?;
            }
        }

        self.store.put_order_txn(txn, &order)?;
        Ok(order)
    }

    /// Seller accepts the order
    pub fn confirm(&self, order_id: &str, user_id: &str) -> OrderResult<Order> {
        let cause = TransitionCause::Party {
            user_id: user_id.to_string(),
        };
        self.advance_status(order_id, OrderStatus::Confirmed, &cause)
    }

    /// Either party cancels; products return to the market
    pub fn cancel(&self, order_id: &str, user_id: &str) -> OrderResult<Order> {
        let cause = TransitionCause::Party {
            user_id: user_id.to_string(),
        };
        self.advance_status(order_id, OrderStatus::Cancelled, &cause)
    }

    /// Either party fixes where and when to exchange
    pub fn schedule_meetup(
        &self,
        order_id: &str,
        user_id: &str,
        meetup: &MeetupRequest,
    ) -> OrderResult<Order> {
        validate_required_text(&meetup.location, "location", MAX_LOCATION_LEN)
            .map_err(|e| OrderError::Validation(e.message))?;
        if meetup.time <= 0 {
            return Err(OrderError::Validation(
                "time must be a positive unix timestamp in milliseconds".to_string(),
            ));
        }

        let cause = TransitionCause::Party {
            user_id: user_id.to_string(),
        };
        let location = meetup.location.trim().to_string();
        let time = meetup.time;

        let txn = self.store.begin_write()?;
        let order = self.transition_txn(
            &txn,
            order_id,
            OrderStatus::MeetingScheduled,
            &cause,
            |order| {
                order.meeting_location = Some(location);
                order.meeting_time = Some(time);
            },
        )?;
        txn.commit()?;
        log_transition(&order, &cause);
        Ok(order)
    }

    /// Fetch an order visible to `viewer`
    pub fn get_order_for(
        &self,
        order_id: &str,
        viewer: &str,
        is_operator: bool,
    ) -> OrderResult<Order> {
        let order = self
            .store
            .get_order(order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;
        if !is_operator && !order.is_party(viewer) {
            return Err(OrderError::NotParty);
        }
        Ok(order)
    }

    /// Orders where `user_id` is buyer or seller, most recent first
    pub fn list_orders(&self, user_id: &str) -> OrderResult<Vec<Order>> {
        let mut orders = self.store.list_orders_for_party(user_id)?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(orders)
    }
}

fn log_transition(order: &Order, cause: &TransitionCause) {
    tracing::info!(
        order_id = %order.id,
        status = %order.status,
        cause = ?cause,
        "Order status changed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{ProductCategory, ProductCondition};
    use std::str::FromStr;

    const BUYER: &str = "buyer@csu.fullerton.edu";
    const SELLER: &str = "seller@csu.fullerton.edu";

    fn setup() -> (MarketStore, OrderEngine) {
        let store = MarketStore::open_in_memory().unwrap();
        (store.clone(), OrderEngine::new(store))
    }

    fn add_product(store: &MarketStore, id: &str, seller: &str, price: &str) {
        let product = Product {
            id: id.to_string(),
            title: format!("Item {id}"),
            description: String::new(),
            price: Decimal::from_str(price).unwrap(),
            category: ProductCategory::Books,
            condition: ProductCondition::Good,
            images: vec![],
            seller_id: seller.to_string(),
            is_available: true,
            created_at: 1,
            location: "Library".to_string(),
        };
        let txn = store.begin_write().unwrap();
        store.put_product_txn(&txn, &product).unwrap();
        txn.commit().unwrap();
    }

    fn item(id: &str, quantity: u32) -> OrderItemRequest {
        OrderItemRequest {
            product_id: id.to_string(),
            quantity,
        }
    }

    fn party(id: &str) -> TransitionCause {
        TransitionCause::Party {
            user_id: id.to_string(),
        }
    }

    fn available(store: &MarketStore, id: &str) -> bool {
        store.get_product(id).unwrap().unwrap().is_available
    }

    #[test]
    fn test_create_order_totals_and_withdraws_products() {
        let (store, engine) = setup();
        add_product(&store, "p1", SELLER, "45.00");
        add_product(&store, "p2", SELLER, "0.10");

        let order = engine
            .create_order(BUYER, &[item("p1", 1), item("p2", 3)])
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Decimal::from_str("45.30").unwrap());
        assert_eq!(Ok(order.total_amount), order.computed_total());
        assert_eq!(order.seller_id, SELLER);
        assert!(!available(&store, "p1"));
        assert!(!available(&store, "p2"));
    }

    #[test]
    fn test_total_overflow_is_rejected_without_writing() {
        let (store, engine) = setup();
        let half = (Decimal::MAX / Decimal::TWO).round_dp(0).to_string();
        add_product(&store, "p1", SELLER, &half);

        let err = engine.create_order(BUYER, &[item("p1", 3)]).unwrap_err();
        assert!(matches!(err, OrderError::Amount(_)));
        let app: shared::error::AppError = err.into();
        assert_eq!(app.code, shared::error::ErrorCode::AmountInvalid);
        assert_eq!(app.http_status(), http::StatusCode::BAD_REQUEST);

        assert!(available(&store, "p1"));
        assert!(store.list_all_orders().unwrap().is_empty());
    }

    #[test]
    fn test_max_price_with_large_quantity_is_accepted() {
        let (store, engine) = setup();
        add_product(&store, "p1", SELLER, &money::MAX_PRICE.to_string());

        let order = engine.create_order(BUYER, &[item("p1", u32::MAX)]).unwrap();
        assert_eq!(
            order.total_amount,
            money::MAX_PRICE * Decimal::from(u32::MAX)
        );
        assert!(money::to_minor_units(order.total_amount).is_ok());
    }

    #[test]
    fn test_multi_seller_creates_nothing() {
        let (store, engine) = setup();
        add_product(&store, "p1", SELLER, "5");
        add_product(&store, "p2", "other@csu.fullerton.edu", "5");

        let err = engine
            .create_order(BUYER, &[item("p1", 1), item("p2", 1)])
            .unwrap_err();
        assert!(matches!(err, OrderError::MultiSeller { ref sellers } if sellers.len() == 2));
        assert!(available(&store, "p1"));
        assert!(store.list_all_orders().unwrap().is_empty());
    }

    #[test]
    fn test_unavailable_product_rejected() {
        let (store, engine) = setup();
        add_product(&store, "p1", SELLER, "5");
        engine.create_order(BUYER, &[item("p1", 1)]).unwrap();

        let err = engine
            .create_order("late@csu.fullerton.edu", &[item("p1", 1)])
            .unwrap_err();
        assert!(matches!(err, OrderError::ProductUnavailable(ref ids) if ids == &["p1"]));
        assert_eq!(store.list_all_orders().unwrap().len(), 1);
    }

    #[test]
    fn test_item_validation() {
        let (store, engine) = setup();
        add_product(&store, "p1", SELLER, "5");

        assert!(matches!(engine.create_order(BUYER, &[]), Err(OrderError::Empty)));
        assert!(matches!(
            engine.create_order(BUYER, &[item("p1", 0)]),
            Err(OrderError::InvalidQuantity(_))
        ));
        assert!(matches!(
            engine.create_order(BUYER, &[item("p1", 1), item("p1", 2)]),
            Err(OrderError::DuplicateItem(_))
        ));
        assert!(matches!(
            engine.create_order(BUYER, &[item("ghost", 1)]),
            Err(OrderError::ProductNotFound(_))
        ));
        assert!(matches!(
            engine.create_order(SELLER, &[item("p1", 1)]),
            Err(OrderError::OwnListing(_))
        ));
    }

    #[test]
    fn test_snapshot_survives_catalog_edit() {
        let (store, engine) = setup();
        add_product(&store, "p1", SELLER, "20");
        let order = engine.create_order(BUYER, &[item("p1", 1)]).unwrap();

        add_product(&store, "p1", SELLER, "99");
        let stored = store.get_order(&order.id).unwrap().unwrap();
        assert_eq!(stored.items[0].product.price, Decimal::from(20));
        assert_eq!(stored.total_amount, Decimal::from(20));
    }

    #[test]
    fn test_party_actions() {
        let (store, engine) = setup();
        add_product(&store, "p1", SELLER, "5");
        let order = engine.create_order(BUYER, &[item("p1", 1)]).unwrap();

        assert!(matches!(engine.confirm(&order.id, BUYER), Err(OrderError::SellerOnly)));
        assert!(matches!(
            engine.confirm(&order.id, "stranger"),
            Err(OrderError::NotParty)
        ));
        let confirmed = engine.confirm(&order.id, SELLER).unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);

        let meetup = MeetupRequest {
            location: "Titan Student Union".into(),
            time: 1_700_000_000_000,
        };
        let scheduled = engine.schedule_meetup(&order.id, BUYER, &meetup).unwrap();
        assert_eq!(scheduled.status, OrderStatus::MeetingScheduled);
        assert_eq!(scheduled.meeting_location.as_deref(), Some("Titan Student Union"));

        // Parties may not complete an order themselves
        assert!(matches!(
            engine.advance_status(&order.id, OrderStatus::Completed, &party(SELLER)),
            Err(OrderError::CauseNotPermitted(OrderStatus::Completed))
        ));
    }

    #[test]
    fn test_cancel_releases_products_and_is_terminal() {
        let (store, engine) = setup();
        add_product(&store, "p1", SELLER, "5");
        let order = engine.create_order(BUYER, &[item("p1", 1)]).unwrap();

        let cancelled = engine.cancel(&order.id, BUYER).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(available(&store, "p1"));

        let err = engine.confirm(&order.id, SELLER).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Confirmed
            }
        ));
    }

    #[test]
    fn test_invalid_transition_leaves_state() {
        let (store, engine) = setup();
        add_product(&store, "p1", SELLER, "5");
        let order = engine.create_order(BUYER, &[item("p1", 1)]).unwrap();
        let op = TransitionCause::Operator {
            user_id: "ops".into(),
        };
        engine
            .advance_status(&order.id, OrderStatus::Confirmed, &op)
            .unwrap();

        let err = engine
            .advance_status(&order.id, OrderStatus::PaymentProcessing, &op)
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
        assert_eq!(
            store.get_order(&order.id).unwrap().unwrap().status,
            OrderStatus::Confirmed
        );
    }

    #[test]
    fn test_settlement_attaches_intent() {
        let (store, engine) = setup();
        add_product(&store, "p1", SELLER, "5");
        let order = engine.create_order(BUYER, &[item("p1", 1)]).unwrap();
        let cause = TransitionCause::PaymentSettled {
            intent_id: "pi_123".into(),
        };
        assert!(matches!(
            engine.advance_status(&order.id, OrderStatus::Confirmed, &cause),
            Err(OrderError::CauseNotPermitted(_))
        ));
        let done = engine
            .advance_status(&order.id, OrderStatus::Completed, &cause)
            .unwrap();
        assert_eq!(done.payment_intent_id.as_deref(), Some("pi_123"));
        assert!(!available(&store, "p1"));
    }

    #[test]
    fn test_visibility_and_listing_order() {
        let (store, engine) = setup();
        add_product(&store, "p1", SELLER, "5");
        add_product(&store, "p2", SELLER, "5");
        let first = engine.create_order(BUYER, &[item("p1", 1)]).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = engine.create_order(BUYER, &[item("p2", 1)]).unwrap();

        let ids: Vec<String> = engine
            .list_orders(SELLER)
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, [second.id.clone(), first.id.clone()]);

        assert!(engine.get_order_for(&first.id, BUYER, false).is_ok());
        assert!(matches!(
            engine.get_order_for(&first.id, "stranger", false),
            Err(OrderError::NotParty)
        ));
        assert!(engine.get_order_for(&first.id, "stranger", true).is_ok());
        assert!(matches!(
            engine.get_order_for("ghost", BUYER, false),
            Err(OrderError::NotFound(_))
        ));
    }
}
