//! Condition-based termination (extension point).

use crate::report::Report;

/// A predicate over a live [`Report`], used by
/// [`Model::run_until`](crate::Model::run_until) to decide when a run
/// should stop.
///
/// No concrete condition language is provided; closures implement the trait,
/// and richer condition types are left to callers. Conditions are evaluated
/// periodically against a report taken while replicas are still running, so
/// they observe counters that may advance between two evaluations.
pub trait Condition: Send + Sync {
    fn evaluate(&self, report: &Report) -> bool;
}

impl<F> Condition for F
where
    F: Fn(&Report) -> bool + Send + Sync,
{
    fn evaluate(&self, report: &Report) -> bool {
        self(report)
    }
}
