//! CLI entrypoint: lists the tool facades and runs single tool calls.

mod config;
#[cfg(test)]
mod test_support;

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::Config;
use tools::{
    AuthorizationPolicy, Authorizer, BrowserTool, ComputerTool, DatabaseTool, DiskTool, DocTool,
    EvalTool, StreamPrompt, ToolRegistry,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Top-level command-line arguments for the shared-tools binary.
#[derive(Parser)]
#[command(name = "shared-tools")]
#[command(about = "LLM tool facades over pluggable drivers", version = "0.1.0")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Enable debug logging to ~/.shared-tools/logs/
    #[arg(long, default_value_t = false, global = true)]
    debug: bool,

    /// Approve sensitive actions without prompting
    #[arg(long, default_value_t = false, global = true)]
    auto_execute: bool,

    #[command(subcommand)]
    command: Commands,
}

/// CLI subcommands available in the application.
#[derive(Subcommand)]
enum Commands {
    /// Print every tool definition as JSON
    List,

    /// Run one tool action and print its output
    Call {
        /// Tool name (browser, computer, database, disk, doc, eval)
        tool: String,

        /// JSON arguments, e.g. '{"action":"file_read","path":"a.txt"}'
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

impl Commands {
    fn label(&self) -> &'static str {
        match self {
            Commands::List => "list",
            Commands::Call { .. } => "call",
        }
    }
}

/// Tools that hold live sessions and must be closed before exit.
struct Session {
    registry: ToolRegistry,
    browser: Arc<BrowserTool>,
    database: Arc<DatabaseTool>,
}

impl Session {
    async fn close(&self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {e}");
        }
        self.database.close().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so tool output on stdout stays parseable.
    // With --debug, debug-level logs are also written to
    // ~/.shared-tools/logs/debug.YYYY-MM-DD.log using daily rotation.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // WorkerGuard must outlive main() so buffered file writes are flushed on exit.
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>;

    if cli.debug {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let log_dir = std::path::PathBuf::from(home)
            .join(".shared-tools")
            .join("logs");
        std::fs::create_dir_all(&log_dir).ok();
        let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        _file_guard = Some(guard);

        let console = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter);
        let file = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .with_filter(EnvFilter::new(
                "debug,hyper_util=info,rustls=info,reqwest=info,sqlx=info,chromiumoxide=info",
            ));
        tracing_subscriber::registry()
            .with(console)
            .with(file)
            .init();
        info!(command = cli.command.label(), "=== shared-tools session start ===");
    } else {
        _file_guard = None;
        fmt()
            .with_env_filter(console_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    let auto_execute = cli.auto_execute || config.authorization.auto_execute;
    let authorizer = select_authorizer(auto_execute, std::io::stdin().is_terminal());

    let session = build_session(&config, authorizer).await?;
    let outcome = match cli.command {
        Commands::List => cmd_list(&session.registry),
        Commands::Call { tool, args } => cmd_call(&session.registry, &tool, &args).await,
    };
    session.close().await;
    outcome
}

/// Picks the approval gate: the process-wide terminal prompt when stdin is a
/// TTY, otherwise one that reads answers from piped stdin.
fn select_authorizer(auto_execute: bool, interactive: bool) -> Arc<Authorizer> {
    if interactive {
        tools::set_auto_execute(auto_execute);
        Authorizer::global()
    } else {
        Arc::new(Authorizer::new(
            AuthorizationPolicy::from_auto_execute(auto_execute),
            Arc::new(StreamPrompt::stdio()),
        ))
    }
}

/// Builds every facade from the config, sharing one authorizer.
async fn build_session(config: &Config, authorizer: Arc<Authorizer>) -> anyhow::Result<Session> {
    let mut registry = ToolRegistry::new();

    registry.register(DiskTool::new(&config.disk.root)?.with_authorizer(authorizer.clone()));
    registry.register(DocTool::new(&config.disk.root)?);
    registry.register(EvalTool::new(config.eval.timeout_secs).with_authorizer(authorizer.clone()));
    registry.register(ComputerTool::new(config.computer.xdotool_path.clone()));

    let browser = Arc::new(BrowserTool::new(config.browser.settings()));
    registry.register_shared(browser.clone());

    let database = Arc::new(
        DatabaseTool::sqlite(&config.database.url)
            .await
            .with_context(|| format!("failed to open database '{}'", config.database.url))?
            .with_authorizer(authorizer),
    );
    registry.register_shared(database.clone());

    info!(tools = ?registry.tool_names(), "Tool registry ready");
    Ok(Session {
        registry,
        browser,
        database,
    })
}

fn cmd_list(registry: &ToolRegistry) -> anyhow::Result<()> {
    let definitions = registry.definitions();
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}

async fn cmd_call(registry: &ToolRegistry, tool: &str, raw_args: &str) -> anyhow::Result<()> {
    let args = parse_args(raw_args)?;
    let call_id = uuid::Uuid::new_v4().to_string();
    let result = registry.execute(&call_id, tool, args).await;
    if result.is_error {
        anyhow::bail!("{}", result.output);
    }
    println!("{}", result.output);
    Ok(())
}

fn parse_args(raw: &str) -> anyhow::Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("--args must be valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("--args must be a JSON object");
    }
    Ok(value)
}
