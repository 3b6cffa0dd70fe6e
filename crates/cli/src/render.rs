//! Plain-text rendering of a simulation report.

use flowsim_model::Report;
use std::fmt::Write;

/// Render the report as two aligned tables: processes, then pools.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();

    let name_width = report
        .processes
        .iter()
        .map(|p| p.name.len())
        .chain(report.pools.iter().map(|p| p.name.len()))
        .chain(["process".len()])
        .max()
        .unwrap_or(0);

    let _ = writeln!(
        out,
        "{:<name_width$}  {:>9}  {:>9}  {:>12}",
        "process", "completed", "in-flight", "idle"
    );
    for process in &report.processes {
        let _ = writeln!(
            out,
            "{:<name_width$}  {:>9}  {:>9}  {:>12}",
            process.name,
            process.completed,
            process.in_flight,
            humantime::format_duration(process.idle_time).to_string(),
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{:<name_width$}  {:>9}  {:>9}", "pool", "depth", "cap");
    for pool in &report.pools {
        let _ = writeln!(
            out,
            "{:<name_width$}  {:>9}  {:>9}",
            pool.name, pool.depth, pool.capacity
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowsim_model::{PoolReport, ProcessReport};
    use std::time::Duration;

    #[test]
    fn test_render_aligns_names_and_counts() {
        let report = Report {
            processes: vec![ProcessReport {
                name: "assemble".into(),
                completed: 12,
                in_flight: 1,
                idle_time: Duration::from_secs(90),
            }],
            pools: vec![PoolReport {
                name: "parts".into(),
                depth: 7,
                capacity: 1000,
            }],
        };

        let text = render_text(&report);
        assert!(text.contains("assemble"));
        assert!(text.contains("12"));
        assert!(text.contains("1m 30s"), "idle time should be humanized");
        assert!(text.contains("parts"));
        assert!(text.contains("7"));
    }
}
