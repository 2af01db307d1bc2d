// Infrastructure: output sink
// Renders a schedule outcome as a plain-text report or as JSON.

use anyhow::{Context, Result};
use std::io::Write;

use crate::schedule::{ScheduleOutcome, UnscheduledReason};

pub fn write_json<W: Write>(outcome: &ScheduleOutcome, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, outcome).context("failed to serialize schedule")?;
    writeln!(writer)?;
    Ok(())
}

pub fn write_text<W: Write>(outcome: &ScheduleOutcome, writer: &mut W) -> Result<()> {
    let schedule = match outcome {
        ScheduleOutcome::NoSchedule(none) => {
            writeln!(writer, "Status: {}", none.status)?;
            writeln!(writer, "No schedule: {}", none.message)?;
            if none.interrupted {
                writeln!(writer, "The solve was interrupted.")?;
            }
            if !none.structurally_infeasible.is_empty() {
                writeln!(
                    writer,
                    "KDVs without any feasible slot/resource: {}",
                    none.structurally_infeasible.join(", ")
                )?;
            }
            return Ok(());
        }
        ScheduleOutcome::Scheduled(schedule) => schedule,
    };

    writeln!(writer, "Status: {}", schedule.status)?;
    if schedule.interrupted {
        writeln!(writer, "The solve was interrupted; showing the best schedule found.")?;
    }
    write!(writer, "Objective: {:.4}", schedule.objective_value)?;
    if let Some(gap) = schedule.gap {
        write!(writer, " (gap {:.2}%)", gap * 100.0)?;
    }
    writeln!(
        writer,
        " in {:.1} ms",
        schedule.statistics.solve_time_ms
    )?;

    let kdv_width = column_width("KDV", schedule.assignments.iter().map(|a| a.kdv.as_str()));
    let slot_width = column_width("Slot", schedule.assignments.iter().map(|a| a.slot.as_str()));
    let resource_width = column_width(
        "Resource",
        schedule.assignments.iter().map(|a| a.resource.as_str()),
    );

    writeln!(writer)?;
    writeln!(
        writer,
        "{:<kdv_width$}  {:<slot_width$}  {:<resource_width$}  {:>8}  Covers",
        "KDV", "Slot", "Resource", "Weight"
    )?;
    for a in &schedule.assignments {
        writeln!(
            writer,
            "{:<kdv_width$}  {:<slot_width$}  {:<resource_width$}  {:>8.3}  {}",
            a.kdv,
            a.slot,
            a.resource,
            a.weight,
            a.covered_slots.join(" ")
        )?;
    }

    if schedule.is_complete() {
        writeln!(writer)?;
        writeln!(writer, "All {} KDV(s) scheduled.", schedule.scheduled_count())?;
    } else {
        writeln!(writer)?;
        writeln!(writer, "Unscheduled ({}):", schedule.unscheduled.len())?;
        for u in &schedule.unscheduled {
            let reason = match u.reason {
                UnscheduledReason::StructurallyInfeasible => "no feasible slot/resource",
                UnscheduledReason::NotSelected => "not selected",
            };
            writeln!(writer, "  {} ({reason})", u.kdv)?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "Slot usage:")?;
    for s in &schedule.diagnostics.slots {
        writeln!(
            writer,
            "  {:<slot_width$}  {}/{}  experienced {}  desirability {:.2}",
            s.slot, s.occupancy, s.capacity, s.experienced, s.desirability
        )?;
    }
    Ok(())
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values.map(str::len).fold(header.len(), usize::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SolutionStatus;
    use crate::schedule::NoSchedule;

    fn no_schedule() -> ScheduleOutcome {
        ScheduleOutcome::NoSchedule(NoSchedule {
            status: SolutionStatus::Infeasible,
            message: "no solution satisfies all constraints".into(),
            interrupted: false,
            structurally_infeasible: vec!["K7".into()],
        })
    }

    #[test]
    fn test_text_for_missing_schedule() {
        let mut out = Vec::new();
        write_text(&no_schedule(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Status: INFEASIBLE"));
        assert!(text.contains("K7"));
    }

    #[test]
    fn test_json_is_tagged() {
        let mut out = Vec::new();
        write_json(&no_schedule(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["outcome"], "no_schedule");
        assert_eq!(value["status"], "INFEASIBLE");
    }

    #[cfg(feature = "highs")]
    #[test]
    fn test_text_lists_assignments() {
        use crate::application::SchedulingService;
        use crate::catalog::fixtures::uniform_catalog;
        use crate::domain::Interrupt;
        use crate::solver::HighsSolver;
        use std::sync::Arc;

        let outcome = SchedulingService::new(Arc::new(HighsSolver::new()))
            .run(&uniform_catalog(3, 2, 1), &Interrupt::new())
            .unwrap();
        let mut out = Vec::new();
        write_text(&outcome, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Status: OPTIMAL"));
        assert!(text.contains("Unscheduled (1):"));
        assert!(text.contains("K2 (not selected)"));
        assert!(!text.contains("scheduled."));
    }

    #[cfg(feature = "highs")]
    #[test]
    fn test_text_for_complete_schedule() {
        use crate::application::SchedulingService;
        use crate::catalog::fixtures::uniform_catalog;
        use crate::domain::Interrupt;
        use crate::solver::HighsSolver;
        use std::sync::Arc;

        let outcome = SchedulingService::new(Arc::new(HighsSolver::new()))
            .run(&uniform_catalog(2, 2, 1), &Interrupt::new())
            .unwrap();
        assert!(outcome.schedule().unwrap().is_complete());
        let mut out = Vec::new();
        write_text(&outcome, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("All 2 KDV(s) scheduled."));
        assert!(!text.contains("Unscheduled"));
    }
}
