// Operator-facing output for each session phase

use std::io::{self, Write};
use tabled::{Table, Tabled, settings::Style};

use crate::collector::Collection;
use crate::error::TargetFailure;
use crate::models::{AggregateConstraint, Rejection, RolloutOutcome, RolloutPlan, RolloutResult};
use crate::rollout::RolloutEvent;
use crate::units::format_bytes;

/// Row of the collected-constraints table
#[derive(Tabled)]
struct ConstraintRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Minimum")]
    minimum: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Row of the planned-changes table
#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "After")]
    after: String,
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn write_constraints<W: Write>(
    w: &mut W,
    collection: &Collection,
    aggregate: &AggregateConstraint,
    max_shrink: u64,
) -> io::Result<()> {
    let rows: Vec<ConstraintRow> = collection
        .entries()
        .iter()
        .map(|entry| match &entry.outcome {
            Ok(c) => ConstraintRow {
                target: entry.target.name().to_string(),
                current: format_bytes(c.current_size()),
                minimum: format_bytes(c.minimum_size()),
                status: "ok".into(),
            },
            Err(e) => ConstraintRow {
                target: entry.target.name().to_string(),
                current: "-".into(),
                minimum: "-".into(),
                status: e.to_string(),
            },
        })
        .collect();
    writeln!(w)?;
    writeln!(w, "{}", render(rows))?;
    writeln!(
        w,
        "Shared floor: {} (set by {})",
        format_bytes(aggregate.floor),
        aggregate.set_by
    )?;
    writeln!(w, "Largest shrink every target can take: {}", format_bytes(max_shrink))?;
    let failed = collection.failures();
    if !failed.is_empty() {
        writeln!(
            w,
            "{} target(s) did not answer and will be skipped.",
            failed.len()
        )?;
    }
    Ok(())
}

pub fn write_failures<W: Write>(w: &mut W, failures: &[TargetFailure]) -> io::Result<()> {
    for f in failures {
        writeln!(w, "  x {}", f)?;
    }
    Ok(())
}

pub fn write_rejections<W: Write>(w: &mut W, rejections: &[Rejection]) -> io::Result<()> {
    writeln!(w, "Shrink rejected; nothing was changed:")?;
    for r in rejections {
        for reason in &r.reasons {
            writeln!(w, "  x {}: {}", r.target, reason)?;
        }
    }
    Ok(())
}

pub fn write_plan<W: Write>(w: &mut W, plan: &RolloutPlan) -> io::Result<()> {
    let rows: Vec<PlanRow> = plan
        .steps
        .iter()
        .map(|step| PlanRow {
            target: step.target.name().to_string(),
            current: format_bytes(step.current_size),
            after: format_bytes(step.target_size),
        })
        .collect();
    writeln!(w, "Planned changes to {}:", plan.resource)?;
    writeln!(w, "{}", render(rows))?;
    Ok(())
}

pub fn write_event<W: Write>(w: &mut W, event: &RolloutEvent<'_>) -> io::Result<()> {
    match event {
        RolloutEvent::Started { index, total, step } => writeln!(
            w,
            "[{}/{}] {}: shrinking to {}...",
            index + 1,
            total,
            step.target.name(),
            format_bytes(step.target_size)
        ),
        RolloutEvent::Finished { index, total, result } => match &result.outcome {
            RolloutOutcome::Succeeded { resulting_size } => writeln!(
                w,
                "[{}/{}] {}: done, now {}",
                index + 1,
                total,
                result.target,
                format_bytes(*resulting_size)
            ),
            RolloutOutcome::Failed { error } => writeln!(
                w,
                "[{}/{}] {}: FAILED: {}",
                index + 1,
                total,
                result.target,
                error
            ),
        },
    }
}

pub fn write_summary<W: Write>(w: &mut W, results: &[RolloutResult]) -> io::Result<()> {
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let failed = results.len() - succeeded;
    writeln!(w)?;
    writeln!(w, "Rollout finished: {} succeeded, {} failed.", succeeded, failed)?;
    for r in results {
        if let RolloutOutcome::Failed { error } = &r.outcome {
            writeln!(w, "  x {}: {}", r.target, error)?;
        }
    }
    Ok(())
}
