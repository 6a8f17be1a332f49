//! Review eligibility
//!
//! Conditions are evaluated in a fixed order and the first failure wins:
//!
//! 1. order exists
//! 2. order is completed
//! 3. reviewer is buyer or seller
//! 4. reviewed user is the other party
//! 5. no review exists for (order, reviewer, reviewed)

use shared::error::ErrorCode;
use shared::models::{Order, OrderStatus, ReviewEligibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    OrderNotFound,
    OrderNotCompleted,
    NotParty,
    NotOtherParty,
    AlreadyReviewed,
}

impl IneligibleReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::OrderNotFound => "Order not found",
            Self::OrderNotCompleted => "Order must be completed before leaving a review",
            Self::NotParty => "You are not part of this order",
            Self::NotOtherParty => "You can only review the other party in the transaction",
            Self::AlreadyReviewed => "You have already reviewed this user for this order",
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::OrderNotFound => ErrorCode::OrderNotFound,
            Self::OrderNotCompleted => ErrorCode::ReviewOrderNotCompleted,
            Self::NotParty => ErrorCode::ReviewNotParty,
            Self::NotOtherParty => ErrorCode::ReviewNotOtherParty,
            Self::AlreadyReviewed => ErrorCode::ReviewDuplicate,
        }
    }
}

impl std::fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// `Ok(())` when a review may be written
pub type Eligibility = Result<(), IneligibleReason>;

/// Evaluate eligibility.
///
/// `already_reviewed` is only consulted once conditions 1-4 hold.
pub fn evaluate<E>(
    order: Option<&Order>,
    reviewer_id: &str,
    reviewed_id: &str,
    already_reviewed: impl FnOnce() -> Result<bool, E>,
) -> Result<Eligibility, E> {
    let Some(order) = order else {
        return Ok(Err(IneligibleReason::OrderNotFound));
    };
    if order.status != OrderStatus::Completed {
        return Ok(Err(IneligibleReason::OrderNotCompleted));
    }
    let Some(other) = order.other_party(reviewer_id) else {
        return Ok(Err(IneligibleReason::NotParty));
    };
    if other != reviewed_id || reviewer_id == reviewed_id {
        return Ok(Err(IneligibleReason::NotOtherParty));
    }
    if already_reviewed()? {
        return Ok(Err(IneligibleReason::AlreadyReviewed));
    }
    Ok(Ok(()))
}

pub fn to_response(eligibility: Eligibility) -> ReviewEligibility {
    match eligibility {
        Ok(()) => ReviewEligibility {
            eligible: true,
            reason: None,
        },
        Err(reason) => ReviewEligibility {
            eligible: false,
            reason: Some(reason.message().to_string()),
        },
    }
}
