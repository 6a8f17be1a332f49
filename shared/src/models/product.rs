//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pickup location used when a listing does not name one
pub const DEFAULT_LOCATION: &str = "CSUF Campus";

/// Listing category
///
/// Serialized with the display label; unknown labels fail to decode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProductCategory {
    Books,
    Electronics,
    Furniture,
    Clothing,
    #[serde(rename = "School Supplies")]
    SchoolSupplies,
    #[serde(rename = "Event Tickets")]
    EventTickets,
    Other,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 7] = [
        Self::Books,
        Self::Electronics,
        Self::Furniture,
        Self::Clothing,
        Self::SchoolSupplies,
        Self::EventTickets,
        Self::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Books => "Books",
            Self::Electronics => "Electronics",
            Self::Furniture => "Furniture",
            Self::Clothing => "Clothing",
            Self::SchoolSupplies => "School Supplies",
            Self::EventTickets => "Event Tickets",
            Self::Other => "Other",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

/// Item condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProductCondition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
    Poor,
}

/// Product listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Fixed-point amount, two decimal places
    pub price: Decimal,
    pub category: ProductCategory,
    pub condition: ProductCondition,
    /// Ordered image URLs
    #[serde(default)]
    pub images: Vec<String>,
    /// Seller identity (User.id)
    pub seller_id: String,
    pub is_available: bool,
    pub created_at: i64,
    pub location: String,
}

impl Product {
    /// Case-insensitive containment on title or description
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub category: ProductCategory,
    pub condition: ProductCondition,
    #[serde(default)]
    pub images: Vec<String>,
    pub location: Option<String>,
}

/// Catalog query filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category: Option<ProductCategory>,
    pub search: Option<String>,
    pub seller_id: Option<String>,
    #[serde(default)]
    pub available_only: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category
            && product.category != category
        {
            return false;
        }
        if let Some(seller) = &self.seller_id
            && &product.seller_id != seller
        {
            return false;
        }
        if self.available_only && !product.is_available {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => product.matches_search(needle),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: "p1".into(),
            title: "Calculus Textbook".into(),
            description: "Stewart 8th edition, lightly used".into(),
            price: Decimal::new(4500, 2),
            category: ProductCategory::Books,
            condition: ProductCondition::Good,
            images: vec![],
            seller_id: "seller@csu.fullerton.edu".into(),
            is_available: true,
            created_at: 0,
            location: DEFAULT_LOCATION.into(),
        }
    }

    #[test]
    fn test_category_labels_round_trip_through_serde() {
        for category in ProductCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.label()));
            assert_eq!(ProductCategory::from_label(category.label()), Some(category));
        }
    }

    #[test]
    fn test_unknown_category_is_decode_error() {
        let result: Result<ProductCategory, _> = serde_json::from_str("\"Vehicles\"");
        assert!(result.is_err());
        let result: Result<ProductCondition, _> = serde_json::from_str("\"Mint\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_condition_labels() {
        let c: ProductCondition = serde_json::from_str("\"Like New\"").unwrap();
        assert_eq!(c, ProductCondition::LikeNew);
    }

    #[test]
    fn test_filter_category_and_search() {
        let p = product();
        let filter = ProductFilter {
            category: Some(ProductCategory::Books),
            search: Some("STEWART".into()),
            ..Default::default()
        };
        assert!(filter.matches(&p));

        let filter = ProductFilter {
            category: Some(ProductCategory::Electronics),
            ..Default::default()
        };
        assert!(!filter.matches(&p));

        let filter = ProductFilter {
            search: Some("physics".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&p));
    }

    #[test]
    fn test_filter_available_only() {
        let mut p = product();
        p.is_available = false;
        let filter = ProductFilter {
            available_only: true,
            ..Default::default()
        };
        assert!(!filter.matches(&p));
        assert!(ProductFilter::default().matches(&p));
    }
}
