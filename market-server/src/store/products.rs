use super::{MarketStore, PRODUCTS_TABLE, StorageResult};
use redb::{ReadableTable, WriteTransaction};
use shared::models::{Product, ProductFilter};

impl MarketStore {
    // ========== Product Operations ==========

    pub fn get_product(&self, id: &str) -> StorageResult<Option<Product>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_product_txn(
        &self,
        txn: &WriteTransaction,
        id: &str,
    ) -> StorageResult<Option<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_product_txn(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Set the availability flag.
    ///
    /// Returns the previous value, or `None` when the product does not exist.
    pub fn set_availability_txn(
        &self,
        txn: &WriteTransaction,
        id: &str,
        available: bool,
    ) -> StorageResult<Option<bool>> {
        let Some(mut product) = self.get_product_txn(txn, id)? else {
            return Ok(None);
        };
        let previous = product.is_available;
        if previous != available {
            product.is_available = available;
            self.put_product_txn(txn, &product)?;
        }
        Ok(Some(previous))
    }

    /// Products matching `filter`, most recent first
    pub fn list_products(&self, filter: &ProductFilter) -> StorageResult<Vec<Product>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;

        let mut products = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let product: Product = serde_json::from_slice(value.value())?;
            if filter.matches(&product) {
                products.push(product);
            }
        }

        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{ProductCategory, ProductCondition};

    fn product(id: &str, created_at: i64, category: ProductCategory) -> Product {
        Product {
            id: id.to_string(),
            title: format!("Item {id}"),
            description: "desk lamp".to_string(),
            price: Decimal::new(1000, 2),
            category,
            condition: ProductCondition::Good,
            images: vec![],
            seller_id: "s@csu.fullerton.edu".to_string(),
            is_available: true,
            created_at,
            location: "CSUF Campus".to_string(),
        }
    }

    #[test]
    fn test_list_is_most_recent_first() {
        let store = MarketStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        store.put_product_txn(&txn, &product("a", 1, ProductCategory::Furniture)).unwrap();
        store.put_product_txn(&txn, &product("b", 3, ProductCategory::Books)).unwrap();
        store.put_product_txn(&txn, &product("c", 2, ProductCategory::Furniture)).unwrap();
        txn.commit().unwrap();

        let all = store.list_products(&ProductFilter::default()).unwrap();
        let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);

        let furniture = store
            .list_products(&ProductFilter {
                category: Some(ProductCategory::Furniture),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(furniture.len(), 2);
    }

    #[test]
    fn test_set_availability_reports_previous() {
        let store = MarketStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        store.put_product_txn(&txn, &product("a", 1, ProductCategory::Other)).unwrap();
        assert_eq!(store.set_availability_txn(&txn, "a", false).unwrap(), Some(true));
        assert_eq!(store.set_availability_txn(&txn, "a", false).unwrap(), Some(false));
        assert_eq!(store.set_availability_txn(&txn, "missing", false).unwrap(), None);
        txn.commit().unwrap();

        assert!(!store.get_product("a").unwrap().unwrap().is_available);
    }
}
