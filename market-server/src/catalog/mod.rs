//! Catalog Store
//!
//! Listings are written by their seller at creation and afterwards only by
//! the order engine, which toggles availability.

use shared::error::ErrorCode;
use shared::models::{DEFAULT_LOCATION, Product, ProductCreate, ProductFilter};
use shared::money;
use shared::util::{new_id, now_millis};

use crate::store::MarketStore;
use crate::utils::validation::{
    MAX_DESCRIPTION_LEN, MAX_IMAGES, MAX_LOCATION_LEN, MAX_NAME_LEN, MAX_URL_LEN,
    validate_max_len, validate_optional_text, validate_required_text,
};
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct Catalog {
    store: MarketStore,
}

impl Catalog {
    pub fn new(store: MarketStore) -> Self {
        Self { store }
    }

    /// Create a listing owned by `seller_id`
    pub fn create(&self, seller_id: &str, req: ProductCreate) -> AppResult<Product> {
        validate_required_text(&req.title, "title", MAX_NAME_LEN)?;
        validate_max_len(&req.description, "description", MAX_DESCRIPTION_LEN)?;
        validate_optional_text(&req.location, "location", MAX_LOCATION_LEN)?;
        if req.images.len() > MAX_IMAGES {
            return Err(AppError::with_message(
                ErrorCode::ProductTooManyImages,
                format!("At most {MAX_IMAGES} images per listing"),
            ));
        }
        for url in &req.images {
            validate_required_text(url, "images", MAX_URL_LEN)?;
        }
        let price = money::normalize_price(req.price)
            .map_err(|e| AppError::with_message(ErrorCode::ProductInvalidPrice, e.to_string()))?;

        let location = req
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

        let product = Product {
            id: new_id(),
            title: req.title.trim().to_string(),
            description: req.description,
            price,
            category: req.category,
            condition: req.condition,
            images: req.images,
            seller_id: seller_id.to_string(),
            is_available: true,
            created_at: now_millis(),
            location,
        };

        let txn = self.store.begin_write()?;
        self.store.put_product_txn(&txn, &product)?;
        txn.commit().map_err(crate::store::StorageError::from)?;

        tracing::info!(product_id = %product.id, seller_id, "Listing created");
        Ok(product)
    }

    pub fn get(&self, id: &str) -> AppResult<Product> {
        self.store
            .get_product(id)?
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id))
    }

    pub fn set_availability(&self, id: &str, available: bool) -> AppResult<()> {
        let txn = self.store.begin_write()?;
        if self.store.set_availability_txn(&txn, id, available)?.is_none() {
            return Err(AppError::new(ErrorCode::ProductNotFound).with_detail("id", id));
        }
        txn.commit().map_err(crate::store::StorageError::from)?;
        Ok(())
    }

    /// Filtered scan, most recent first
    pub fn query(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        Ok(self.store.list_products(filter)?)
    }

    pub fn list_by_seller(&self, seller_id: &str) -> AppResult<Vec<Product>> {
        let filter = ProductFilter {
            seller_id: Some(seller_id.to_string()),
            ..Default::default()
        };
        self.query(&filter)
    }
}
