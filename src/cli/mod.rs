//! CLI Module
//!
//! The operator-facing collaborators the acquisition core stays decoupled
//! from: the yes/no acceptance of the default distance schedule, the fallback
//! selection when port discovery is ambiguous, and the end-of-session summary
//! rendering.

use std::io::{self, Write};

use crate::config::{parse_distance_list, DEFAULT_DISTANCES};
use crate::core::{AcquisitionError, PortCandidate, PortChoice, SessionOutcome};

/// Resolve the distance schedule with the operator
///
/// Non-interactive stdin accepts the default list outright. Interactively,
/// the operator may accept the default or type a custom comma-separated
/// list; unparsable input falls back to the default with a warning.
pub fn prompt_distance_schedule() -> Result<Vec<u32>, AcquisitionError> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(DEFAULT_DISTANCES.to_vec());
    }

    println!("Default distances (cm): {DEFAULT_DISTANCES:?}");
    print!("Use the default schedule? [Y/n]: ");
    io::stdout().flush().ok();

    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .map_err(|e| AcquisitionError::Config(format!("failed to read input: {e}")))?;

    if !answer.trim().eq_ignore_ascii_case("n") {
        return Ok(DEFAULT_DISTANCES.to_vec());
    }

    print!("Distance list (e.g. 3,5,10,15,20): ");
    io::stdout().flush().ok();
    let mut custom = String::new();
    io::stdin()
        .read_line(&mut custom)
        .map_err(|e| AcquisitionError::Config(format!("failed to read input: {e}")))?;

    match parse_distance_list(custom.trim()) {
        Ok(distances) => Ok(distances),
        Err(e) => {
            tracing::warn!("{e}; using the default schedule");
            Ok(DEFAULT_DISTANCES.to_vec())
        }
    }
}

/// Resolve a port choice to a concrete port name
///
/// The definite case passes through. The ambiguous case prompts when stdin
/// is interactive and fails with the candidate listing otherwise.
pub fn resolve_port(choice: PortChoice) -> Result<String, AcquisitionError> {
    match choice {
        PortChoice::Definite(candidate) => {
            tracing::info!("selected {} ({})", candidate.name, candidate.description);
            Ok(candidate.name)
        }
        PortChoice::Ambiguous(candidates) => {
            if !atty::is(atty::Stream::Stdin) {
                return Err(AcquisitionError::PortAmbiguous {
                    candidates: candidates.into_iter().map(|c| c.name).collect(),
                });
            }
            select_port(&candidates)
        }
    }
}

fn select_port(candidates: &[PortCandidate]) -> Result<String, AcquisitionError> {
    println!("Several serial ports found:");
    for (i, candidate) in candidates.iter().enumerate() {
        println!("  [{i}] {} - {}", candidate.name, candidate.description);
    }

    loop {
        print!("Select a port [0-{}]: ", candidates.len() - 1);
        io::stdout().flush().ok();
        let mut answer = String::new();
        io::stdin()
            .read_line(&mut answer)
            .map_err(|e| AcquisitionError::Config(format!("failed to read input: {e}")))?;
        if let Ok(index) = answer.trim().parse::<usize>() {
            if let Some(candidate) = candidates.get(index) {
                return Ok(candidate.name.clone());
            }
        }
        println!("Not a listed port.");
    }
}

/// Print the end-of-session summary
pub fn print_report(outcome: &SessionOutcome) {
    let report = &outcome.report;

    println!();
    println!("Saved {} rows to {}", report.rows_accepted, report.output_path.display());
    if report.rows_dropped > 0 {
        println!("Dropped {} malformed rows", report.rows_dropped);
    }
    println!("Completed distances: {:?}", report.completed_distances);

    for s in &report.summaries {
        println!();
        println!("Distance {} cm ({} samples):", s.distance_cm, s.count);
        println!("  left:  {:7.1} (±{:.1})", s.left.0, s.left.1);
        println!("  right: {:7.1} (±{:.1})", s.right.0, s.right.1);
        println!(
            "  avg:   {:7.1} (±{:.1})  range [{}, {}]",
            s.avg.0, s.avg.1, s.avg_range.0, s.avg_range.1
        );
    }
}
