//! Executive Assistant - Entry Point
//!
//! Runs the HTTP server and, when enabled, the background reminder scheduler.

use exec_assistant::{
    AppState, AssistantServer, Capabilities, Composer, Config, Orchestrator, ReminderConfig,
    ReminderScheduler,
};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("Executive Assistant v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: exec-assistant [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --help, -h         Show this help");
        println!();
        println!("Environment variables:");
        println!("  GOOGLE_CALENDAR_API_KEY     Google Calendar API key");
        println!("  GOOGLE_CALENDAR_ID          Calendar id (default: primary)");
        println!("  SENDGRID_API_KEY            SendGrid API key");
        println!("  GMAIL_APP_PASSWORD          SMTP app password (used without SendGrid)");
        println!("  SMTP_HOST / SMTP_PORT       SMTP relay (default: smtp.gmail.com:587)");
        println!("  GEMINI_API_KEY              Gemini API key");
        println!("  GEMINI_MODEL                Gemini model (default: gemini-1.5-flash-latest)");
        println!("  ANTHROPIC_API_KEY           Claude API key (used without Gemini)");
        println!("  ANTHROPIC_MODEL             Claude model (default: claude-sonnet-4-20250514)");
        println!("  SERVER_PORT / BIND_ADDR     Listen address (default: 0.0.0.0:8080)");
        println!("  FROM_EMAIL / FROM_NAME      Sender identity");
        println!("  USER_EMAIL                  Operator address");
        println!("  TIMEZONE                    IANA zone (default: UTC)");
        println!("  DAILY_REMINDER_TIME         HH:MM (default: 09:00)");
        println!("  MEETING_REMINDER_MINUTES    Lead time (default: 15)");
        println!("  REMINDER_SCHEDULER_ENABLED  Run background reminders (default: false)");
        println!("  REQUEST_TIMEOUT_SECS        Per-request deadline (default: 30)");
        println!("  RUST_LOG                    trace|debug|info|warn|error (default: info)");
        println!("  LOG_FORMAT                  json for structured logs");
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Executive Assistant v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let demo_mode = config.is_demo_mode();
    if demo_mode {
        warn!("Running in DEMO MODE - no API keys provided");
        warn!("Set GOOGLE_CALENDAR_API_KEY, SENDGRID_API_KEY (or GMAIL_APP_PASSWORD) and GEMINI_API_KEY (or ANTHROPIC_API_KEY) for full functionality");
    }

    let capabilities = Capabilities::from_config(&config)?;
    let orchestrator = Arc::new(Orchestrator::new(
        capabilities,
        config.identity.clone(),
        Composer::new(config.timezone),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let scheduler = Arc::new(ReminderScheduler::new(
        orchestrator.clone(),
        ReminderConfig::from_config(&config),
    ));
    let scheduler_handle = tokio::spawn(scheduler.run_continuous(shutdown_rx));

    let server = AssistantServer::new(&config, AppState::new(orchestrator, demo_mode));
    let result = server.run().await;

    // Stop the scheduler once the server is down
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_handle.await {
        warn!("Reminder scheduler task failed: {}", e);
    }

    result
}
