//! CLI entrypoint for ratchet
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use ratchet_application::{
    AgentConfig, AgentEvent, CheckpointStore, CodeValidator, PersistenceStore, PlanApprovals,
    TaskPlanner, VerificationLoop, WorkspacePort,
};
use ratchet_domain::{
    Complexity, ExecutionPlan, OutputFormat, Task, TaskClassifier, TaskSignals, ValidationStage,
    VerificationLevel,
};
use ratchet_infrastructure::{
    CommandToolchain, ConfigLoader, FileConfig, FileLoggingConfig, JsonlPersistenceStore,
    LocalWorkspace, TreeSitterParser,
};
use ratchet_presentation::{Cli, Command, ConsoleFormatter, DecisionArg, EventRenderer, SourceLine};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let root = cli.workspace.clone().unwrap_or_else(|| PathBuf::from("."));

    let file_config = ConfigLoader::load_from(&root, cli.config.as_ref())
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(cli.verbose, &file_config.logging);

    info!(workspace = %root.display(), "Starting ratchet");

    let (config, issues) = file_config.to_agent_config()?;
    let format = cli
        .format
        .or(file_config.output.format)
        .unwrap_or_default();
    if !file_config.output.color || format == OutputFormat::Json {
        ConsoleFormatter::use_color(false);
    }
    for issue in &issues {
        warn!(field = issue.field(), "{}", issue.message);
    }
    if !issues.is_empty() && format == OutputFormat::Text {
        eprint!("{}", ConsoleFormatter::format_config_issues(&issues));
    }

    // === Dependency Injection ===
    let context = AppContext::new(&root, &file_config, config, format)?;

    match cli.command {
        Command::Plan {
            description,
            files,
            lines,
            decision,
        } => context.plan(&description, files, lines, decision).await,
        Command::Validate {
            file,
            strict,
            write_fixes,
        } => context.validate(&file, strict, write_fixes).await,
        Command::Verify { files, level } => context.verify(&files, level).await,
        Command::Diff { file, proposed } => context.diff(&file, &proposed).await,
        Command::Config { sources } => {
            show_config(&root, cli.config.as_ref(), &file_config, sources, format)
        }
    }
}

/// Install the tracing subscriber.
///
/// `-v` flags pick the level; without them `RUST_LOG` applies, defaulting
/// to `warn`. With `[logging] dir` set, a daily-rolling file gets the same
/// events.
fn init_tracing(verbose: u8, logging: &FileLoggingConfig) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    match logging.log_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "ratchet.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

/// Adapters shared by the subcommands.
struct AppContext {
    config: AgentConfig,
    format: OutputFormat,
    workspace: Arc<LocalWorkspace>,
    toolchain: Arc<CommandToolchain>,
    records: Option<Arc<dyn PersistenceStore>>,
}

impl AppContext {
    fn new(
        root: &Path,
        file_config: &FileConfig,
        config: AgentConfig,
        format: OutputFormat,
    ) -> Result<Self> {
        let workspace = Arc::new(
            LocalWorkspace::new(root)
                .with_context(|| format!("Cannot open workspace {}", root.display()))?,
        );

        let verification = &file_config.verification;
        let (timeout_secs, _) = verification.parse_timeout_secs();
        let toolchain = Arc::new(
            CommandToolchain::new(workspace.root())
                .with_timeout(Duration::from_secs(timeout_secs))
                .with_lint_command(verification.lint_command.as_deref())
                .with_type_command(verification.type_command.as_deref())
                .with_test_command(verification.test_command.as_deref()),
        );
        info!(project = toolchain.project().name(), "Toolchain ready");

        let records = match file_config.logging.records_path() {
            Some(path) => match JsonlPersistenceStore::open(&path) {
                Ok(store) => Some(Arc::new(store) as Arc<dyn PersistenceStore>),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Record store disabled");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            config,
            format,
            workspace,
            toolchain,
            records,
        })
    }

    fn validator(&self) -> CodeValidator {
        CodeValidator::new(Arc::new(TreeSitterParser::new()))
            .with_type_checker(self.toolchain.clone())
    }

    fn print(&self, text: String, json: impl FnOnce() -> String) {
        match self.format {
            OutputFormat::Text => print!("{}", text),
            OutputFormat::Json => println!("{}", json()),
        }
    }

    // ==================== plan ====================

    async fn plan(
        &self,
        description: &str,
        files: Option<usize>,
        lines: Option<usize>,
        decision: Option<DecisionArg>,
    ) -> Result<ExitCode> {
        let task = Task::new(description, self.workspace.root().display().to_string())?;

        let estimated = TaskClassifier::new(self.config.planner.clone()).estimate_signals(description);
        let signals = TaskSignals::new(
            files.unwrap_or(estimated.estimated_files),
            lines.unwrap_or(estimated.estimated_lines),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let mut planner = TaskPlanner::new(self.config.planner.clone())
            .with_approval_timeout(self.config.plan_approval_timeout)
            .with_events(Arc::new(tx));
        if let Some(records) = &self.records {
            planner = planner.with_persistence(records.clone());
        }

        let (plan, classification) = planner.draft(task, Some(signals));
        if self.format == OutputFormat::Text {
            print!("{}", ConsoleFormatter::format_plan(&plan, &classification));
        }

        let approver = tokio::spawn(decide_plans(rx, planner.approvals(), decision));

        let cancellation = CancellationToken::new();
        let on_interrupt = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let resolution = planner.resolve(plan, &Some(cancellation)).await?;
        // closes the event channel so the approver finishes
        drop(planner);
        approver.await?;

        self.print(ConsoleFormatter::format_resolution(&resolution), || {
            ConsoleFormatter::format_plan_json(resolution.plan(), &classification, Some(&resolution))
        });
        Ok(if resolution.proceeds() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    // ==================== validate ====================

    async fn validate(&self, file: &str, strict: bool, write_fixes: bool) -> Result<ExitCode> {
        let content = self
            .workspace
            .read_text(file)
            .await?
            .ok_or_else(|| anyhow!("{} does not exist", file))?;

        let report = self
            .validator()
            .validate(&content, file, &ValidationStage::defaults(strict))
            .await;
        self.print(ConsoleFormatter::format_validation(&report), || {
            ConsoleFormatter::format_validation_json(&report)
        });

        if write_fixes
            && let Some(fixed) = report.fixed_content()
            && fixed != content
        {
            self.workspace.write(file, fixed.as_bytes()).await?;
            info!(path = file, "Wrote fixed content");
            if self.format == OutputFormat::Text {
                println!("Wrote fixes to {}", file);
            }
        }

        Ok(if report.passed() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    // ==================== verify ====================

    async fn verify(&self, files: &[String], level: Option<VerificationLevel>) -> Result<ExitCode> {
        let level = level
            .or(self.config.verification_level)
            .unwrap_or(VerificationLevel::Standard);
        let verifier = VerificationLoop::new(Arc::new(self.validator()), self.workspace.clone())
            .with_linter(self.toolchain.clone())
            .with_type_checker(self.toolchain.clone())
            .with_test_runner(self.toolchain.clone());

        let (results, summary) = verifier.verify_and_summarize(files, level).await;
        self.print(
            ConsoleFormatter::format_verification(&results, &summary),
            || ConsoleFormatter::format_verification_json(&results, &summary),
        );
        Ok(if summary.can_continue {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    // ==================== diff ====================

    async fn diff(&self, file: &str, proposed: &Path) -> Result<ExitCode> {
        let proposed = tokio::fs::read_to_string(proposed)
            .await
            .with_context(|| format!("Cannot read {}", proposed.display()))?;
        let checkpoints = CheckpointStore::new(self.workspace.clone());
        let preview = checkpoints.preview(file, &proposed).await?;
        self.print(ConsoleFormatter::format_diff(&preview), || {
            ConsoleFormatter::format_diff_json(&preview)
        });
        Ok(ExitCode::SUCCESS)
    }
}

/// Render planner events and answer approval requests.
///
/// Complex plans need an explicit decision; without one they are rejected,
/// since nobody can approve them later. Moderate plans without a decision
/// wait out the approval window.
async fn decide_plans(
    mut rx: mpsc::UnboundedReceiver<AgentEvent>,
    approvals: PlanApprovals,
    decision: Option<DecisionArg>,
) {
    let renderer = EventRenderer::new();
    while let Some(event) = rx.recv().await {
        if let Some(line) = renderer.render(&event) {
            eprintln!("{}", line);
        }
        let AgentEvent::PlanApprovalRequest(plan) = event else {
            continue;
        };
        if let Err(e) = apply_decision(&approvals, &plan, decision) {
            warn!(plan = %plan.id(), error = %e, "Plan decision not applied");
        }
    }
}

fn apply_decision(
    approvals: &PlanApprovals,
    plan: &ExecutionPlan,
    decision: Option<DecisionArg>,
) -> Result<(), ratchet_application::PlanningError> {
    match decision {
        Some(DecisionArg::Approve) => approvals.approve_plan(plan.id()),
        Some(DecisionArg::Reject) => approvals.reject_plan(plan.id()),
        None if plan.complexity() == Complexity::Complex => {
            eprintln!("complex plans need --decision approve");
            approvals.reject_plan(plan.id())
        }
        None => Ok(()),
    }
}

fn show_config(
    root: &Path,
    config_path: Option<&PathBuf>,
    file_config: &FileConfig,
    sources: bool,
    format: OutputFormat,
) -> Result<ExitCode> {
    if sources {
        let lines: Vec<SourceLine> = ConfigLoader::sources(root, config_path)
            .into_iter()
            .map(|s| SourceLine {
                kind: s.kind.as_str(),
                location: s.location,
                found: s.found,
            })
            .collect();
        print!("{}", ConsoleFormatter::format_sources(&lines));
        return Ok(ExitCode::SUCCESS);
    }

    match format {
        OutputFormat::Text => print!("{}", toml::to_string_pretty(file_config)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(file_config)?),
    }
    Ok(ExitCode::SUCCESS)
}
