//! Reconciliation queue
//!
//! Operator-visible list of orders whose side effects disagree with the
//! catalog. An entry is keyed by order id, so repeated detection merges
//! rather than duplicates.

use shared::models::OrderStatus;
use shared::util::now_millis;

use super::{OrderError, OrderResult};
use crate::store::{MarketStore, ReconciliationEntry, ReconciliationReason};

#[derive(Clone)]
pub struct Reconciler {
    store: MarketStore,
}

impl Reconciler {
    pub fn new(store: MarketStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> OrderResult<Vec<ReconciliationEntry>> {
        Ok(self.store.list_reconciliation()?)
    }

    /// Flag every live order that references a product still marked available.
    ///
    /// Returns the entries written by this run.
    pub fn audit(&self) -> OrderResult<Vec<ReconciliationEntry>> {
        let orders = self.store.list_all_orders()?;
        let txn = self.store.begin_write()?;
        let mut flagged = Vec::new();

        for order in orders.iter().filter(|o| o.status.holds_inventory()) {
            let mut mismatched = Vec::new();
            for product_id in order.product_ids() {
                if let Some(product) = self.store.get_product_txn(&txn, product_id)?
                    && product.is_available
                {
                    mismatched.push(product_id.to_string());
                }
            }
            if mismatched.is_empty() {
                continue;
            }
            let entry = self.store.upsert_reconciliation_txn(
                &txn,
                ReconciliationEntry {
                    order_id: order.id.clone(),
                    product_ids: mismatched,
                    reason: ReconciliationReason::AvailabilityMismatch,
                    detail: Some(format!("order is {}", order.status)),
                    detected_at: now_millis(),
                    retry_count: 0,
                    last_error: None,
                },
            )?;
            flagged.push(entry);
        }
        txn.commit()?;

        if !flagged.is_empty() {
            tracing::warn!(count = flagged.len(), "Availability audit flagged orders");
        }
        Ok(flagged)
    }

    /// Resolve one entry.
    ///
    /// For a live order the products are withdrawn again, which is safe to
    /// repeat. When some product cannot be updated the entry stays queued
    /// with a bumped retry count and [`OrderError::PartialCreation`] is
    /// returned.
    pub fn resolve(&self, order_id: &str) -> OrderResult<()> {
        let txn = self.store.begin_write()?;
        let mut entry = self
            .store
            .get_reconciliation_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::ReconciliationNotFound(order_id.to_string()))?;

        // Refunds for payments on cancelled orders happen outside this system
        if entry.reason == ReconciliationReason::PaymentForCancelledOrder {
            self.store.remove_reconciliation_txn(&txn, order_id)?;
            txn.commit()?;
            tracing::info!(order_id, "Cancelled-order payment acknowledged");
            return Ok(());
        }

        let order = self.store.get_order_txn(&txn, order_id)?;
        let live = order
            .as_ref()
            .is_some_and(|o| o.status != OrderStatus::Cancelled);

        if live {
            let mut targets = entry.product_ids.clone();
            if let Some(order) = &order {
                for id in order.product_ids() {
                    if !targets.iter().any(|t| t == id) {
                        targets.push(id.to_string());
                    }
                }
            }

            let mut failed = Vec::new();
            for product_id in &targets {
                if self.store.set_availability_txn(&txn, product_id, false)?.is_none() {
                    failed.push(product_id.clone());
                }
            }

            if !failed.is_empty() {
                entry.retry_count += 1;
                entry.last_error = Some(format!("products missing: {}", failed.join(", ")));
                self.store.put_reconciliation_txn(&txn, &entry)?;
                txn.commit()?;
                tracing::warn!(order_id, retry_count = entry.retry_count, "Reconciliation retry failed");
                return Err(OrderError::PartialCreation {
                    order_id: order_id.to_string(),
                    failed,
                });
            }
        }

        self.store.remove_reconciliation_txn(&txn, order_id)?;
        txn.commit()?;
        tracing::info!(order_id, "Reconciliation entry resolved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::OrderEngine;
    use rust_decimal::Decimal;
    use shared::models::{OrderItemRequest, Product, ProductCategory, ProductCondition};

    fn add_product(store: &MarketStore, id: &str) {
        let product = Product {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            price: Decimal::from(10),
            category: ProductCategory::Other,
            condition: ProductCondition::Fair,
            images: vec![],
            seller_id: "seller".to_string(),
            is_available: true,
            created_at: 1,
            location: "Quad".to_string(),
        };
        let txn = store.begin_write().unwrap();
        store.put_product_txn(&txn, &product).unwrap();
        txn.commit().unwrap();
    }

    fn order_for(store: &MarketStore, product: &str) -> String {
        OrderEngine::new(store.clone())
            .create_order(
                "buyer",
                &[OrderItemRequest {
                    product_id: product.to_string(),
                    quantity: 1,
                }],
            )
            .unwrap()
            .id
    }

    fn force_available(store: &MarketStore, id: &str) {
        let txn = store.begin_write().unwrap();
        store.set_availability_txn(&txn, id, true).unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn test_audit_then_resolve() {
        let store = MarketStore::open_in_memory().unwrap();
        let reconciler = Reconciler::new(store.clone());
        add_product(&store, "p1");
        let order_id = order_for(&store, "p1");

        assert!(reconciler.audit().unwrap().is_empty());

        force_available(&store, "p1");
        let flagged = reconciler.audit().unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].product_ids, ["p1"]);
        // Second audit merges into the same entry
        reconciler.audit().unwrap();
        assert_eq!(reconciler.list().unwrap().len(), 1);

        reconciler.resolve(&order_id).unwrap();
        assert!(!store.get_product("p1").unwrap().unwrap().is_available);
        assert!(reconciler.list().unwrap().is_empty());
        // Resolving again finds nothing
        assert!(matches!(
            reconciler.resolve(&order_id),
            Err(OrderError::ReconciliationNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_with_missing_product_bumps_retry() {
        let store = MarketStore::open_in_memory().unwrap();
        let reconciler = Reconciler::new(store.clone());
        add_product(&store, "p1");
        let order_id = order_for(&store, "p1");

        let txn = store.begin_write().unwrap();
        store
            .put_reconciliation_txn(
                &txn,
                &ReconciliationEntry {
                    order_id: order_id.clone(),
                    product_ids: vec!["vanished".into()],
                    reason: ReconciliationReason::PartialCreation,
                    detail: None,
                    detected_at: 1,
                    retry_count: 0,
                    last_error: None,
                },
            )
            .unwrap();
        txn.commit().unwrap();

        let err = reconciler.resolve(&order_id).unwrap_err();
        assert!(matches!(err, OrderError::PartialCreation { ref failed, .. } if failed == &["vanished"]));
        let entry = store.get_reconciliation(&order_id).unwrap().unwrap();
        assert_eq!(entry.retry_count, 1);
        assert!(entry.last_error.unwrap().contains("vanished"));
    }
}
