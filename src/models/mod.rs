// Domain models for the shrink workflow

mod constraint;
mod plan;
mod target;
mod volume;

pub use constraint::{AggregateConstraint, ResourceConstraint, ShrinkRequest};
pub use plan::{PlannedShrink, Rejection, RejectionReason, RolloutOutcome, RolloutPlan, RolloutResult};
pub use target::{Reachability, ResourceId, Target};
pub use volume::{ErrorBody, ResizeRequest, VolumeInfo};
