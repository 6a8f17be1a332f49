use super::{MarketStore, ORDERS_BY_PARTY_TABLE, ORDERS_TABLE, StorageResult};
use redb::{ReadableTable, WriteTransaction};
use shared::models::Order;

impl MarketStore {
    // ========== Order Operations ==========

    pub fn get_order(&self, id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_order_txn(&self, txn: &WriteTransaction, id: &str) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite an order and index it under both parties
    pub fn put_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;

        let mut index = txn.open_table(ORDERS_BY_PARTY_TABLE)?;
        index.insert((order.buyer_id.as_str(), order.id.as_str()), ())?;
        index.insert((order.seller_id.as_str(), order.id.as_str()), ())?;
        Ok(())
    }

    /// Orders where `user_id` is buyer or seller, in storage order
    pub fn list_orders_for_party(&self, user_id: &str) -> StorageResult<Vec<Order>> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(ORDERS_BY_PARTY_TABLE)?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;

        let mut result = Vec::new();
        for entry in index.range((user_id, "")..)? {
            let (key, _) = entry?;
            let (party, order_id) = key.value();
            if party != user_id {
                break;
            }
            if let Some(value) = orders.get(order_id)? {
                result.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(result)
    }

    pub fn list_all_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::OrderStatus;

    fn order(id: &str, buyer: &str, seller: &str) -> Order {
        Order {
            id: id.to_string(),
            items: vec![],
            buyer_id: buyer.to_string(),
            buyer_name: buyer.to_string(),
            seller_id: seller.to_string(),
            seller_name: seller.to_string(),
            total_amount: Decimal::ZERO,
            status: OrderStatus::Pending,
            payment_intent_id: None,
            created_at: 0,
            updated_at: 0,
            meeting_location: None,
            meeting_time: None,
        }
    }

    #[test]
    fn test_party_index_covers_buyer_and_seller() {
        let store = MarketStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        store.put_order_txn(&txn, &order("o1", "bob", "sue")).unwrap();
        store.put_order_txn(&txn, &order("o2", "sue", "tim")).unwrap();
        store.put_order_txn(&txn, &order("o3", "bo", "tim")).unwrap();
        txn.commit().unwrap();

        let sue: Vec<String> = store
            .list_orders_for_party("sue")
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(sue, ["o1", "o2"]);

        // Prefix of another key must not leak in
        let bo = store.list_orders_for_party("bo").unwrap();
        assert_eq!(bo.len(), 1);
        assert_eq!(bo[0].id, "o3");

        assert!(store.list_orders_for_party("nobody").unwrap().is_empty());
        assert_eq!(store.list_all_orders().unwrap().len(), 3);
    }

    #[test]
    fn test_overwrite_keeps_single_index_entry() {
        let store = MarketStore::open_in_memory().unwrap();
        let mut o = order("o1", "bob", "sue");
        let txn = store.begin_write().unwrap();
        store.put_order_txn(&txn, &o).unwrap();
        o.status = OrderStatus::Completed;
        store.put_order_txn(&txn, &o).unwrap();
        txn.commit().unwrap();

        let bob = store.list_orders_for_party("bob").unwrap();
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].status, OrderStatus::Completed);
    }
}
