// Feasibility of a uniform shrink across every target that answered.
//
// Each target must stay at or above its own minimum AND the shared floor (the
// largest minimum of any target). One rejected target rejects the whole session.

use crate::models::{
    AggregateConstraint, PlannedShrink, Rejection, RejectionReason, ResourceConstraint,
    ResourceId, RolloutPlan, ShrinkRequest, Target,
};
use crate::units::format_bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feasibility {
    Feasible(RolloutPlan),
    Infeasible(Vec<Rejection>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub feasibility: Feasibility,
    /// Non-fatal notes for the operator.
    pub advisories: Vec<String>,
}

impl Validation {
    pub fn is_feasible(&self) -> bool {
        matches!(self.feasibility, Feasibility::Feasible(_))
    }
}

/// Largest `minimum_size` among `constraints`; ties go to the earliest target.
pub fn aggregate_floor(constraints: &[(Target, ResourceConstraint)]) -> Option<AggregateConstraint> {
    constraints
        .iter()
        .fold(None::<(&Target, u64)>, |best, (t, c)| match best {
            Some((_, floor)) if floor >= c.minimum_size() => best,
            _ => Some((t, c.minimum_size())),
        })
        .map(|(t, floor)| AggregateConstraint {
            floor,
            set_by: t.name().to_string(),
        })
}

/// Largest delta every target could take: `min(current_size - floor)`.
pub fn max_uniform_shrink(
    constraints: &[(Target, ResourceConstraint)],
    aggregate: &AggregateConstraint,
) -> u64 {
    constraints
        .iter()
        .map(|(_, c)| c.current_size().saturating_sub(aggregate.floor))
        .min()
        .unwrap_or(0)
}

pub fn validate(
    resource: &ResourceId,
    constraints: &[(Target, ResourceConstraint)],
    aggregate: &AggregateConstraint,
    request: ShrinkRequest,
    min_granularity: u64,
) -> Validation {
    let delta = request.delta;
    let mut advisories = Vec::new();
    if delta > 0 && (delta as u64) < min_granularity {
        advisories.push(format!(
            "shrink amount {} is below {}; the storage layer may round it away",
            format_bytes(delta as u64),
            format_bytes(min_granularity)
        ));
    }

    let mut steps = Vec::with_capacity(constraints.len());
    let mut rejections = Vec::new();

    for (target, constraint) in constraints {
        let current = constraint.current_size();
        let projected = i128::from(current) - i128::from(delta);
        let mut reasons = Vec::new();

        if delta <= 0 {
            reasons.push(RejectionReason::NonPositiveDelta { delta });
        }
        if projected < i128::from(constraint.minimum_size()) {
            reasons.push(RejectionReason::BelowOwnMinimum {
                projected_size: projected,
                minimum_size: constraint.minimum_size(),
            });
        }
        if projected < i128::from(aggregate.floor) {
            reasons.push(RejectionReason::BelowAggregateFloor {
                projected_size: projected,
                floor: aggregate.floor,
            });
        }
        if projected >= i128::from(current) {
            reasons.push(RejectionReason::NotSmaller {
                projected_size: projected,
                current_size: current,
            });
        }

        if reasons.is_empty() {
            // 0 <= floor <= projected < current, so the cast is lossless.
            steps.push(PlannedShrink {
                target: target.clone(),
                current_size: current,
                target_size: projected as u64,
            });
        } else {
            tracing::debug!(host = %target, ?reasons, "target rejected");
            rejections.push(Rejection {
                target: target.name().to_string(),
                reasons,
            });
        }
    }

    let feasibility = if rejections.is_empty() {
        Feasibility::Feasible(RolloutPlan {
            resource: resource.clone(),
            steps,
        })
    } else {
        Feasibility::Infeasible(rejections)
    };
    Validation {
        feasibility,
        advisories,
    }
}
