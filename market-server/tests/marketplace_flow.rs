//! End-to-end marketplace flow and write races
//!
//! Engines are synchronous; concurrent callers run on the blocking pool so
//! redb sees genuinely overlapping write transactions.

mod common;

use std::str::FromStr;
use std::sync::{Arc, Barrier};

use rust_decimal::Decimal;

use common::{Harness, deliver, succeeded_event};
use market_server::orders::OrderError;
use market_server::reviews::{IneligibleReason, ReviewError};
use market_server::store::SettlementOutcome;
use shared::models::{OrderItemRequest, OrderStatus, ReviewCreate};

fn one(product_id: &str) -> Vec<OrderItemRequest> {
    vec![OrderItemRequest {
        product_id: product_id.to_string(),
        quantity: 1,
    }]
}

#[tokio::test]
async fn test_purchase_settle_review() {
    let h = Harness::new();
    let seller = h.verified_user("sam", "Sam Seller").await;
    let buyer = h.verified_user("bea", "Bea Buyer").await;
    let product = h.listing(&seller, "Calculus textbook", "45.00");

    // Order
    let order = h.state.orders.create_order(&buyer, &one(&product.id)).unwrap();
    assert_eq!(order.total_amount, Decimal::from_str("45.00").unwrap());
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.seller_id, seller);
    assert_eq!(order.buyer_name, "Bea Buyer");
    assert!(!h.state.catalog.get(&product.id).unwrap().is_available);

    // Intent
    let intent = h.state.payments.create_intent(&order.id, &buyer).await.unwrap();
    let sent = h.gateway.requests.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].amount_minor, 4500);
    assert_eq!(sent[0].order_id, order.id);

    // Settlement
    let payload = succeeded_event("evt_1", &intent.intent_id, &order.id);
    let ack = deliver(&h.state, &payload).unwrap();
    assert!(ack.received);
    assert_eq!(ack.outcome, Some(SettlementOutcome::Applied));
    let settled = h.state.store.get_order(&order.id).unwrap().unwrap();
    assert_eq!(settled.status, OrderStatus::Completed);
    assert_eq!(settled.payment_intent_id.as_deref(), Some(intent.intent_id.as_str()));

    // Review
    let eligibility = h.state.reviews.check_eligibility(&order.id, &buyer, &seller).unwrap();
    assert!(eligibility.eligible);
    assert!(eligibility.reason.is_none());

    let review = h
        .state
        .reviews
        .submit_review(
            &buyer,
            &ReviewCreate {
                order_id: order.id.clone(),
                reviewed_user_id: seller.clone(),
                rating: 5,
                comment: "Great!".into(),
            },
        )
        .unwrap();
    assert_eq!(review.reviewer_name, "Bea Buyer");

    let profile = h.state.users.profile(&seller).unwrap();
    assert_eq!(profile.rating, 5.0);
    assert_eq!(profile.total_ratings, 1);

    let again = h.state.reviews.submit_review(
        &buyer,
        &ReviewCreate {
            order_id: order.id.clone(),
            reviewed_user_id: seller.clone(),
            rating: 1,
            comment: "Changed my mind".into(),
        },
    );
    let err = again.unwrap_err();
    assert!(matches!(
        err,
        ReviewError::Ineligible(IneligibleReason::AlreadyReviewed)
    ));
    assert_eq!(err.to_string(), "You have already reviewed this user for this order");
    assert_eq!(h.state.users.profile(&seller).unwrap().total_ratings, 1);
}

#[tokio::test]
async fn test_cancelled_order_returns_listing() {
    let h = Harness::new();
    let seller = h.verified_user("sam", "Sam").await;
    let buyer = h.verified_user("bea", "Bea").await;
    let other = h.verified_user("cal", "Cal").await;
    let product = h.listing(&seller, "Desk lamp", "12.50");

    let order = h.state.orders.create_order(&buyer, &one(&product.id)).unwrap();
    assert!(matches!(
        h.state.orders.create_order(&other, &one(&product.id)),
        Err(OrderError::ProductUnavailable(_))
    ));

    h.state.orders.cancel(&order.id, &buyer).unwrap();
    assert!(h.state.catalog.get(&product.id).unwrap().is_available);
    h.state.orders.create_order(&other, &one(&product.id)).unwrap();
}

#[tokio::test]
async fn test_two_sellers_never_share_an_order() {
    let h = Harness::new();
    let s1 = h.verified_user("sam", "Sam").await;
    let s2 = h.verified_user("sue", "Sue").await;
    let buyer = h.verified_user("bea", "Bea").await;
    let a = h.listing(&s1, "Lab coat", "20");
    let b = h.listing(&s2, "Goggles", "8");

    let items = vec![
        OrderItemRequest { product_id: a.id.clone(), quantity: 1 },
        OrderItemRequest { product_id: b.id.clone(), quantity: 1 },
    ];
    assert!(matches!(
        h.state.orders.create_order(&buyer, &items),
        Err(OrderError::MultiSeller { .. })
    ));
    assert!(h.state.orders.list_orders(&buyer).unwrap().is_empty());
    assert!(h.state.catalog.get(&a.id).unwrap().is_available);
    assert!(h.state.catalog.get(&b.id).unwrap().is_available);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkout_sells_once() {
    const BUYERS: usize = 8;
    let h = Harness::new();
    let seller = h.verified_user("sam", "Sam").await;
    let product = h.listing(&seller, "Last mini fridge", "60");

    let mut buyers = Vec::new();
    for i in 0..BUYERS {
        buyers.push(h.verified_user(&format!("buyer{i}"), "Buyer").await);
    }

    let barrier = Arc::new(Barrier::new(BUYERS));
    let handles: Vec<_> = buyers
        .into_iter()
        .map(|buyer| {
            let orders = h.state.orders.clone();
            let barrier = barrier.clone();
            let items = one(&product.id);
            tokio::task::spawn_blocking(move || {
                barrier.wait();
                orders.create_order(&buyer, &items)
            })
        })
        .collect();

    let mut won = 0;
    let mut lost = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(OrderError::ProductUnavailable(ids)) => {
                assert_eq!(ids, [product.id.clone()]);
                lost += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(lost, BUYERS - 1);
    assert_eq!(h.state.store.list_all_orders().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_webhook_replays_complete_once() {
    const DELIVERIES: usize = 6;
    let h = Harness::new();
    let seller = h.verified_user("sam", "Sam").await;
    let buyer = h.verified_user("bea", "Bea").await;
    let product = h.listing(&seller, "Bike lock", "15");
    let order = h.state.orders.create_order(&buyer, &one(&product.id)).unwrap();

    // Half replay the same event id, half resend it under new ids
    let barrier = Arc::new(Barrier::new(DELIVERIES));
    let handles: Vec<_> = (0..DELIVERIES)
        .map(|i| {
            let state = h.state.clone();
            let barrier = barrier.clone();
            let event_id = if i % 2 == 0 { "evt_same".to_string() } else { format!("evt_{i}") };
            let payload = succeeded_event(&event_id, "pi_once", &order.id);
            tokio::task::spawn_blocking(move || {
                barrier.wait();
                deliver(&state, &payload)
            })
        })
        .collect();

    let mut applied = 0;
    for handle in handles {
        let ack = handle.await.unwrap().unwrap();
        assert!(ack.received);
        if ack.outcome == Some(SettlementOutcome::Applied) && !ack.duplicate {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);

    let settled = h.state.store.get_order(&order.id).unwrap().unwrap();
    assert_eq!(settled.status, OrderStatus::Completed);
    // evt_same once plus three distinct ids
    assert_eq!(h.state.store.count_processed_events().unwrap(), 4);
    assert!(h.state.store.list_webhook_failures().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_reviews_count_once() {
    const ATTEMPTS: usize = 6;
    let h = Harness::new();
    let seller = h.verified_user("sam", "Sam").await;
    let buyer = h.verified_user("bea", "Bea").await;
    let product = h.listing(&seller, "Graphing calculator", "70");
    let order = h.state.orders.create_order(&buyer, &one(&product.id)).unwrap();
    deliver(&h.state, &succeeded_event("evt_1", "pi_1", &order.id)).unwrap();

    let barrier = Arc::new(Barrier::new(ATTEMPTS));
    let handles: Vec<_> = (0..ATTEMPTS)
        .map(|i| {
            let reviews = h.state.reviews.clone();
            let barrier = barrier.clone();
            let buyer = buyer.clone();
            let req = ReviewCreate {
                order_id: order.id.clone(),
                reviewed_user_id: seller.clone(),
                rating: (i % 5) as i64 + 1,
                comment: format!("attempt {i}"),
            };
            tokio::task::spawn_blocking(move || {
                barrier.wait();
                reviews.submit_review(&buyer, &req)
            })
        })
        .collect();

    let mut accepted = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(review) => accepted.push(review),
            Err(ReviewError::Ineligible(IneligibleReason::AlreadyReviewed)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(accepted.len(), 1);

    let profile = h.state.users.profile(&seller).unwrap();
    assert_eq!(profile.total_ratings, 1);
    assert_eq!(profile.rating, accepted[0].rating as f64);
    assert_eq!(h.state.reviews.list_for_user(&seller).unwrap().len(), 1);
}

#[tokio::test]
async fn test_settlement_after_cancel_is_queued_for_operator() {
    let h = Harness::new();
    let seller = h.verified_user("sam", "Sam").await;
    let buyer = h.verified_user("bea", "Bea").await;
    let product = h.listing(&seller, "Parking pass", "90");
    let order = h.state.orders.create_order(&buyer, &one(&product.id)).unwrap();
    h.state.orders.cancel(&order.id, &seller).unwrap();

    let ack = deliver(&h.state, &succeeded_event("evt_late", "pi_late", &order.id)).unwrap();
    assert_eq!(ack.outcome, Some(SettlementOutcome::RejectedCancelled));
    assert_eq!(
        h.state.store.get_order(&order.id).unwrap().unwrap().status,
        OrderStatus::Cancelled
    );

    let queue = h.state.reconciler.list().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].order_id, order.id);

    h.state.reconciler.resolve(&order.id).unwrap();
    assert!(h.state.reconciler.list().unwrap().is_empty());
}
