//! Console output formatter for ratchet results

use colored::Colorize;
use ratchet_application::{PlanResolution, ValidationReport};
use ratchet_domain::{
    AgentOutcome, CheckResult, CheckStatus, Classification, ConfigIssue, DiffLineKind,
    DiffPreview, ExecutionPlan, Severity, StepRisk, ValidationResult, VerificationSummary,
};
use serde_json::json;

/// One configuration source, as shown by `ratchet config --sources`.
#[derive(Debug, Clone)]
pub struct SourceLine {
    pub kind: &'static str,
    pub location: String,
    pub found: bool,
}

/// Formats ratchet results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Enable or disable ANSI colors for everything formatted afterwards.
    pub fn use_color(enabled: bool) {
        colored::control::set_override(enabled);
    }

    // ==================== Plans ====================

    pub fn format_plan(plan: &ExecutionPlan, classification: &Classification) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Execution Plan"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            "Task:".cyan().bold(),
            plan.task().description()
        ));
        output.push_str(&format!(
            "{} {} ({} files, ~{} lines)\n",
            "Complexity:".cyan().bold(),
            Self::complexity_label(plan),
            classification.signals.estimated_files,
            classification.signals.estimated_lines
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Approval:".cyan().bold(),
            plan.approval().as_str()
        ));

        if !classification.reasons.is_empty() {
            output.push_str(&format!("\n{}\n", "Why:".cyan().bold()));
            for reason in &classification.reasons {
                output.push_str(&format!("  * {}\n", reason));
            }
        }

        output.push_str(&Self::section_header("Steps"));
        for step in plan.steps() {
            output.push_str(&format!(
                "  {:>2}. {} {}\n",
                step.index + 1,
                Self::risk_badge(step.risk),
                step.description
            ));
        }
        output.push_str(&Self::footer());
        output
    }

    pub fn format_resolution(resolution: &PlanResolution) -> String {
        match resolution {
            PlanResolution::Proceed(plan) => format!(
                "{} plan {} ({})\n",
                "Proceeding with".green().bold(),
                plan.id(),
                plan.approval().as_str()
            ),
            PlanResolution::Rejected(plan) => {
                format!("{} plan {}\n", "Rejected".red().bold(), plan.id())
            }
            PlanResolution::Modified { plan, steps } => format!(
                "{} plan {} with {} caller-supplied steps\n",
                "Replaced".yellow().bold(),
                plan.id(),
                steps.len()
            ),
        }
    }

    pub fn format_plan_json(
        plan: &ExecutionPlan,
        classification: &Classification,
        resolution: Option<&PlanResolution>,
    ) -> String {
        let mut value = json!({
            "plan": plan,
            "classification": classification,
        });
        if let Some(resolution) = resolution {
            value["resolution"] = json!(match resolution {
                PlanResolution::Proceed(_) => "proceed",
                PlanResolution::Rejected(_) => "rejected",
                PlanResolution::Modified { .. } => "modified",
            });
            // the resolved plan carries the final approval state
            value["plan"] = json!(resolution.plan());
        }
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    fn complexity_label(plan: &ExecutionPlan) -> String {
        let label = plan.complexity().as_str();
        match plan.complexity() {
            ratchet_domain::Complexity::Simple => label.green().bold().to_string(),
            ratchet_domain::Complexity::Moderate => label.yellow().bold().to_string(),
            ratchet_domain::Complexity::Complex => label.red().bold().to_string(),
        }
    }

    fn risk_badge(risk: StepRisk) -> String {
        let badge = format!("[{}]", risk.as_str());
        match risk {
            StepRisk::Low => badge.dimmed().to_string(),
            StepRisk::Medium => badge.yellow().to_string(),
            StepRisk::High => badge.red().bold().to_string(),
        }
    }

    // ==================== Validation ====================

    pub fn format_validation(report: &ValidationReport) -> String {
        let mut output = format!(
            "{} {} ({})\n",
            "Validating".cyan().bold(),
            report.path,
            report.language.as_str()
        );
        for result in &report.results {
            output.push_str(&Self::format_stage(result));
        }
        let verdict = if report.passed() {
            "PASSED".green().bold()
        } else {
            "FAILED".red().bold()
        };
        output.push_str(&format!("\n{}\n", verdict));
        output
    }

    fn format_stage(result: &ValidationResult) -> String {
        let name = format!("{:<11}", result.stage.as_str());
        if result.skipped {
            return format!(
                "  {} {} {}\n",
                "-".dimmed(),
                name.dimmed(),
                result.skip_reason.as_deref().unwrap_or("skipped").dimmed()
            );
        }
        let mut line = if result.passed {
            let note = if result.fixed_content.is_some() {
                " (auto-fixed)".yellow().to_string()
            } else {
                String::new()
            };
            format!("  {} {}{}\n", "✓".green(), name, note)
        } else {
            format!("  {} {}\n", "✗".red(), name.red())
        };
        for issue in &result.errors {
            line.push_str(&format!("      {}\n", issue));
        }
        line
    }

    pub fn format_validation_json(report: &ValidationReport) -> String {
        let value = json!({
            "path": report.path,
            "language": report.language.as_str(),
            "passed": report.passed(),
            "results": report.results,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    // ==================== Verification ====================

    pub fn format_verification(results: &[CheckResult], summary: &VerificationSummary) -> String {
        let mut output = String::new();
        output.push_str(&Self::section_header("Verification"));
        for result in results {
            let target = result.target.as_deref().unwrap_or("(project)");
            let (mark, status) = match result.status {
                CheckStatus::Passed => ("✓".green(), "passed".green()),
                CheckStatus::Failed if result.is_blocking() => ("✗".red(), "blocking".red().bold()),
                CheckStatus::Failed if result.is_deferred() => ("!".yellow(), "deferred".yellow()),
                CheckStatus::Failed => ("!".yellow(), "warning".yellow()),
                CheckStatus::Skipped => ("-".dimmed(), "skipped".dimmed()),
            };
            output.push_str(&format!(
                "  {} {:<10} {:<30} {}",
                mark,
                result.kind.as_str(),
                target,
                status
            ));
            if !result.message.is_empty() {
                output.push_str(&format!(": {}", result.message));
            }
            output.push('\n');
            if result.is_failure() {
                output.push_str(&Self::indent(&result.details.join("\n"), "      "));
                if !result.details.is_empty() {
                    output.push('\n');
                }
            }
        }

        output.push_str(&format!(
            "\n{} passed, {} skipped, {} blocking, {} warnings, {} deferred\n",
            summary.passed,
            summary.skipped,
            summary.blocking_failures.len(),
            summary.warnings.len(),
            summary.deferred.len()
        ));
        if summary.can_continue {
            output.push_str(&format!("{}\n", "Safe to continue".green().bold()));
        } else {
            output.push_str(&format!("{}\n", "Blocked: fix the failures above".red().bold()));
        }
        output
    }

    pub fn format_verification_json(results: &[CheckResult], summary: &VerificationSummary) -> String {
        let value = json!({ "results": results, "summary": summary });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    // ==================== Diffs ====================

    pub fn format_diff(preview: &DiffPreview) -> String {
        if preview.is_empty() {
            return format!("{} {}\n", "No changes to".dimmed(), preview.path);
        }
        let mut output = format!(
            "{}\n{}\n",
            format!("--- a/{}", preview.path).bold(),
            format!("+++ b/{}", preview.path).bold()
        );
        for hunk in &preview.hunks {
            output.push_str(&format!("{}\n", hunk.header().cyan()));
            for line in &hunk.lines {
                let rendered = match line.kind {
                    DiffLineKind::Context => format!(" {}", line.text).normal(),
                    DiffLineKind::Added => format!("+{}", line.text).green(),
                    DiffLineKind::Removed => format!("-{}", line.text).red(),
                };
                output.push_str(&format!("{}\n", rendered));
            }
        }
        output.push_str(&format!(
            "{} {}, {} {}\n",
            preview.lines_added.to_string().green(),
            "added".green(),
            preview.lines_removed.to_string().red(),
            "removed".red()
        ));
        output
    }

    pub fn format_diff_json(preview: &DiffPreview) -> String {
        serde_json::to_string_pretty(preview).unwrap_or_else(|_| "{}".to_string())
    }

    // ==================== Outcomes & Configuration ====================

    pub fn format_outcome(outcome: &AgentOutcome) -> String {
        let mut output = if outcome.is_complete() {
            format!(
                "{} after {} iterations\n",
                "COMPLETE".green().bold(),
                outcome.iterations_taken
            )
        } else {
            format!(
                "{} after {} iterations: {}\n",
                "ABORTED".red().bold(),
                outcome.iterations_taken,
                outcome
                    .abort_reason
                    .as_ref()
                    .map(|r| r.to_string())
                    .unwrap_or_default()
            )
        };
        if !outcome.files_touched.is_empty() {
            output.push_str(&format!("{}\n", "Files touched:".cyan().bold()));
            for file in &outcome.files_touched {
                output.push_str(&format!("  {}\n", file));
            }
        }
        output
    }

    pub fn format_config_issues(issues: &[ConfigIssue]) -> String {
        issues
            .iter()
            .map(|issue| match issue.severity {
                Severity::Error => format!("{} {}\n", "error:".red().bold(), issue.message),
                Severity::Warning => format!("{} {}\n", "warning:".yellow().bold(), issue.message),
            })
            .collect()
    }

    pub fn format_sources(sources: &[SourceLine]) -> String {
        let mut output = Self::section_header("Configuration sources (highest priority first)");
        for source in sources {
            let mark = if source.found {
                "✓".green()
            } else {
                "·".dimmed()
            };
            output.push_str(&format!(
                "  {} {:<12} {}\n",
                mark, source.kind, source.location
            ));
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
