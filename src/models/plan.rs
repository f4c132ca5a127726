// Validation output (plan or rejections) and rollout results

use std::fmt;

use crate::error::TargetError;
use crate::models::{ResourceId, Target};
use crate::units::format_bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedShrink {
    pub target: Target,
    pub current_size: u64,
    pub target_size: u64,
}

/// Validated work for one session, in the order the targets were entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutPlan {
    pub resource: ResourceId,
    pub steps: Vec<PlannedShrink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    NonPositiveDelta { delta: i64 },
    BelowOwnMinimum { projected_size: i128, minimum_size: u64 },
    BelowAggregateFloor { projected_size: i128, floor: u64 },
    NotSmaller { projected_size: i128, current_size: u64 },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RejectionReason::NonPositiveDelta { delta } => {
                write!(f, "shrink amount must be positive (got {} B)", delta)
            }
            RejectionReason::BelowOwnMinimum {
                projected_size,
                minimum_size,
            } => write!(
                f,
                "target size {} is below this host's minimum {}",
                format_projected(projected_size),
                format_bytes(minimum_size)
            ),
            RejectionReason::BelowAggregateFloor {
                projected_size,
                floor,
            } => write!(
                f,
                "target size {} is below the shared floor {}",
                format_projected(projected_size),
                format_bytes(floor)
            ),
            RejectionReason::NotSmaller {
                projected_size,
                current_size,
            } => write!(
                f,
                "target size {} does not shrink current size {}",
                format_projected(projected_size),
                format_bytes(current_size)
            ),
        }
    }
}

fn format_projected(size: i128) -> String {
    match u64::try_from(size) {
        Ok(s) => format_bytes(s),
        Err(_) => format!("{} B", size),
    }
}

/// Every reason one target cannot take the requested shrink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub target: String,
    pub reasons: Vec<RejectionReason>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloutOutcome {
    Succeeded { resulting_size: u64 },
    Failed { error: TargetError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutResult {
    pub target: String,
    pub requested_size: u64,
    pub outcome: RolloutOutcome,
}

impl RolloutResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RolloutOutcome::Succeeded { .. })
    }
}
