//! Payment and reconciliation ledgers

use super::{
    MarketStore, PROCESSED_EVENTS_TABLE, RECONCILIATION_TABLE, SETTLED_INTENTS_TABLE,
    StorageResult, WEBHOOK_FAILURES_TABLE,
};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

/// What a verified settlement event did
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Order transitioned to completed
    Applied,
    /// Order was already completed (replay under a new event id)
    AlreadyCompleted,
    /// Payment failure recorded, order untouched
    PaymentFailed,
    /// Event type not handled
    Ignored,
    /// No order reference in metadata
    Untraceable,
    /// Payment arrived for a cancelled order; queued for an operator
    RejectedCancelled,
}

/// Dedupe ledger entry, keyed by gateway event id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedEvent {
    pub event_id: String,
    pub event_type: String,
    pub intent_id: Option<String>,
    pub order_id: Option<String>,
    pub outcome: SettlementOutcome,
    /// Failure message for `payment_failed`
    pub detail: Option<String>,
    pub processed_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationReason {
    /// A live order references a product still marked available
    AvailabilityMismatch,
    /// Availability flips could not be applied when the order was persisted
    PartialCreation,
    /// Settlement succeeded after the order was cancelled
    PaymentForCancelledOrder,
}

/// Operator-visible reconciliation entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciliationEntry {
    pub order_id: String,
    /// Products needing attention
    pub product_ids: Vec<String>,
    pub reason: ReconciliationReason,
    pub detail: Option<String>,
    pub detected_at: i64,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

/// Webhook processing failure after signature verification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookFailure {
    pub id: String,
    pub event_id: Option<String>,
    pub event_type: Option<String>,
    pub error: String,
    pub received_at: i64,
}

impl MarketStore {
    // ========== Webhook Idempotency ==========

    pub fn get_processed_event(&self, event_id: &str) -> StorageResult<Option<ProcessedEvent>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PROCESSED_EVENTS_TABLE)?;
        match table.get(event_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_processed_event_txn(
        &self,
        txn: &WriteTransaction,
        event_id: &str,
    ) -> StorageResult<Option<ProcessedEvent>> {
        let table = txn.open_table(PROCESSED_EVENTS_TABLE)?;
        match table.get(event_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn record_processed_event_txn(
        &self,
        txn: &WriteTransaction,
        entry: &ProcessedEvent,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_EVENTS_TABLE)?;
        let value = serde_json::to_vec(entry)?;
        table.insert(entry.event_id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn count_processed_events(&self) -> StorageResult<u64> {
        use redb::ReadableTableMetadata;
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PROCESSED_EVENTS_TABLE)?;
        Ok(table.len()?)
    }

    /// Order already settled by this intent, if any
    pub fn settled_intent_txn(
        &self,
        txn: &WriteTransaction,
        intent_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(SETTLED_INTENTS_TABLE)?;
        Ok(table.get(intent_id)?.map(|g| g.value().to_string()))
    }

    pub fn record_settled_intent_txn(
        &self,
        txn: &WriteTransaction,
        intent_id: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SETTLED_INTENTS_TABLE)?;
        table.insert(intent_id, order_id)?;
        Ok(())
    }

    // ========== Reconciliation Queue ==========

    pub fn get_reconciliation(&self, order_id: &str) -> StorageResult<Option<ReconciliationEntry>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(RECONCILIATION_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_reconciliation_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<ReconciliationEntry>> {
        let table = txn.open_table(RECONCILIATION_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert an entry, or merge products into an existing one for the same order
    pub fn upsert_reconciliation_txn(
        &self,
        txn: &WriteTransaction,
        entry: ReconciliationEntry,
    ) -> StorageResult<ReconciliationEntry> {
        let merged = match self.get_reconciliation_txn(txn, &entry.order_id)? {
            Some(mut existing) => {
                for id in entry.product_ids {
                    if !existing.product_ids.contains(&id) {
                        existing.product_ids.push(id);
                    }
                }
                if entry.detail.is_some() {
                    existing.detail = entry.detail;
                }
                existing
            }
            None => entry,
        };
        self.put_reconciliation_txn(txn, &merged)?;
        Ok(merged)
    }

    pub fn put_reconciliation_txn(
        &self,
        txn: &WriteTransaction,
        entry: &ReconciliationEntry,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(RECONCILIATION_TABLE)?;
        let value = serde_json::to_vec(entry)?;
        table.insert(entry.order_id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn remove_reconciliation_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(RECONCILIATION_TABLE)?;
        table.remove(order_id)?;
        Ok(())
    }

    /// Entries ordered by detection time
    pub fn list_reconciliation(&self) -> StorageResult<Vec<ReconciliationEntry>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(RECONCILIATION_TABLE)?;

        let mut entries: Vec<ReconciliationEntry> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        entries.sort_by_key(|e| e.detected_at);
        Ok(entries)
    }

    // ========== Webhook Failures ==========

    /// Record a failure in its own transaction
    pub fn record_webhook_failure(&self, failure: &WebhookFailure) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(WEBHOOK_FAILURES_TABLE)?;
            let value = serde_json::to_vec(failure)?;
            table.insert(failure.id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn list_webhook_failures(&self) -> StorageResult<Vec<WebhookFailure>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(WEBHOOK_FAILURES_TABLE)?;

        let mut failures: Vec<WebhookFailure> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            failures.push(serde_json::from_slice(value.value())?);
        }
        failures.sort_by_key(|f| f.received_at);
        Ok(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(order_id: &str, products: &[&str]) -> ReconciliationEntry {
        ReconciliationEntry {
            order_id: order_id.to_string(),
            product_ids: products.iter().map(|p| p.to_string()).collect(),
            reason: ReconciliationReason::AvailabilityMismatch,
            detail: None,
            detected_at: 1,
            retry_count: 0,
            last_error: None,
        }
    }

    #[test]
    fn test_processed_event_round_trip() {
        let store = MarketStore::open_in_memory().unwrap();
        let event = ProcessedEvent {
            event_id: "evt_1".into(),
            event_type: "payment_intent.succeeded".into(),
            intent_id: Some("pi_1".into()),
            order_id: Some("o1".into()),
            outcome: SettlementOutcome::Applied,
            detail: None,
            processed_at: 5,
        };
        let txn = store.begin_write().unwrap();
        assert!(store.get_processed_event_txn(&txn, "evt_1").unwrap().is_none());
        store.record_processed_event_txn(&txn, &event).unwrap();
        store.record_settled_intent_txn(&txn, "pi_1", "o1").unwrap();
        assert_eq!(
            store.settled_intent_txn(&txn, "pi_1").unwrap().as_deref(),
            Some("o1")
        );
        txn.commit().unwrap();

        assert_eq!(store.get_processed_event("evt_1").unwrap(), Some(event));
        assert_eq!(store.count_processed_events().unwrap(), 1);
    }

    #[test]
    fn test_outcome_wire_names() {
        let json = serde_json::to_string(&SettlementOutcome::RejectedCancelled).unwrap();
        assert_eq!(json, "\"rejected_cancelled\"");
    }

    #[test]
    fn test_upsert_merges_products() {
        let store = MarketStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        store.upsert_reconciliation_txn(&txn, entry("o1", &["p1"])).unwrap();
        let merged = store
            .upsert_reconciliation_txn(&txn, entry("o1", &["p1", "p2"]))
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(merged.product_ids, ["p1", "p2"]);
        assert_eq!(store.list_reconciliation().unwrap().len(), 1);

        let txn = store.begin_write().unwrap();
        store.remove_reconciliation_txn(&txn, "o1").unwrap();
        txn.commit().unwrap();
        assert!(store.get_reconciliation("o1").unwrap().is_none());
    }

    #[test]
    fn test_webhook_failures_are_listed() {
        let store = MarketStore::open_in_memory().unwrap();
        store
            .record_webhook_failure(&WebhookFailure {
                id: "f1".into(),
                event_id: Some("evt_9".into()),
                event_type: None,
                error: "order missing".into(),
                received_at: 3,
            })
            .unwrap();
        let failures = store.list_webhook_failures().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].event_id.as_deref(), Some("evt_9"));
    }
}
