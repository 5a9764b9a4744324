//! Loop detection thresholds from TOML (`[correction]` section)
//!
//! The section deserializes straight into the domain [`LoopThresholds`];
//! this module only checks that every warning fires before its abort.

use ratchet_domain::{ConfigIssue, LoopThresholds};

/// Check warn/abort ordering, falling back to the defaults on violation.
///
/// ```toml
/// [correction]
/// read_warn = 5
/// blocked_reads_abort = 10
/// repetition_warn = 4
/// repetition_abort = 6
/// ```
pub fn parse_thresholds(thresholds: &LoopThresholds) -> (LoopThresholds, Vec<ConfigIssue>) {
    let mut issues = Vec::new();
    let pairs = [
        ("correction.read_warn", thresholds.read_warn, thresholds.blocked_reads_abort),
        (
            "correction.syntax_warn_per_file",
            thresholds.syntax_warn_per_file,
            thresholds.syntax_abort_total,
        ),
        (
            "correction.repetition_warn",
            thresholds.repetition_warn,
            thresholds.repetition_abort,
        ),
    ];
    for (field, warn, abort) in pairs {
        if warn == 0 || warn > abort {
            issues.push(ConfigIssue::invalid_constraint(
                field,
                format!("expected 1 <= warn ({}) <= abort ({})", warn, abort),
            ));
        }
    }
    if thresholds.consecutive_blocked_iterations_abort == 0 {
        issues.push(ConfigIssue::invalid_constraint(
            "correction.consecutive_blocked_iterations_abort",
            "must be at least 1",
        ));
    }
    if thresholds.history_limit < thresholds.blocked_reads_abort {
        issues.push(ConfigIssue::invalid_constraint(
            "correction.history_limit",
            format!(
                "history of {} records cannot hold {} blocked reads",
                thresholds.history_limit, thresholds.blocked_reads_abort
            ),
        ));
    }

    if issues.is_empty() {
        (thresholds.clone(), issues)
    } else {
        (LoopThresholds::default(), issues)
    }
}
