//! Order Model
//!
//! An order captures deep-copied product snapshots, so later catalog edits
//! never change a historical total.

use super::product::{Product, ProductCategory, ProductCondition};
use crate::money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Order status
///
/// ```text
/// pending → payment_processing → confirmed → meeting_scheduled → completed
///    └──────────────┴────────────────┴──────────────┴──→ cancelled
/// ```
///
/// Forward moves may skip states. `completed` and `cancelled` are terminal.
/// Unrecognized strings are decode errors, never a silent `pending`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PaymentProcessing,
    Confirmed,
    MeetingScheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized order status: {0}")]
pub struct UnknownOrderStatus(pub String);

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PaymentProcessing => "payment_processing",
            Self::Confirmed => "confirmed",
            Self::MeetingScheduled => "meeting_scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Position on the forward path; `None` for `cancelled`
    fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::PaymentProcessing => Some(1),
            Self::Confirmed => Some(2),
            Self::MeetingScheduled => Some(3),
            Self::Completed => Some(4),
            Self::Cancelled => None,
        }
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }

    /// Whether the order still holds its products off the market
    pub fn holds_inventory(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "payment_processing" => Ok(Self::PaymentProcessing),
            "confirmed" => Ok(Self::Confirmed),
            "meeting_scheduled" => Ok(Self::MeetingScheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownOrderStatus(other.to_string())),
        }
    }
}

/// Product state captured at purchase time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSnapshot {
    pub product_id: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category: ProductCategory,
    pub condition: ProductCondition,
    pub images: Vec<String>,
    pub seller_id: String,
    pub location: String,
}

impl From<&Product> for ProductSnapshot {
    fn from(p: &Product) -> Self {
        Self {
            product_id: p.id.clone(),
            title: p.title.clone(),
            description: p.description.clone(),
            price: p.price,
            category: p.category,
            condition: p.condition,
            images: p.images.clone(),
            seller_id: p.seller_id.clone(),
            location: p.location.clone(),
        }
    }
}

/// Order line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub product: ProductSnapshot,
    pub quantity: u32,
    /// `product.price × quantity`
    pub line_total: Decimal,
}

impl LineItem {
    pub fn new(product: ProductSnapshot, quantity: u32) -> Result<Self, money::MoneyError> {
        let line_total = money::line_total(product.price, quantity)?;
        Ok(Self {
            product,
            quantity,
            line_total,
        })
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub items: Vec<LineItem>,
    pub buyer_id: String,
    pub buyer_name: String,
    pub seller_id: String,
    pub seller_name: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    /// Attached only once settlement succeeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_time: Option<i64>,
}

impl Order {
    /// Recomputed sum of line totals
    pub fn computed_total(&self) -> Result<Decimal, money::MoneyError> {
        money::sum_totals(self.items.iter().map(|i| i.line_total))
    }

    pub fn is_party(&self, user_id: &str) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    /// The counterparty of `user_id`, if `user_id` is a party
    pub fn other_party(&self, user_id: &str) -> Option<&str> {
        if self.buyer_id == user_id {
            Some(&self.seller_id)
        } else if self.seller_id == user_id {
            Some(&self.buyer_id)
        } else {
            None
        }
    }

    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.product.product_id.as_str())
    }
}

/// Requested line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub items: Vec<OrderItemRequest>,
}

/// Meetup details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetupRequest {
    pub location: String,
    /// Unix milliseconds
    pub time: i64,
}

/// Operator status override
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}
