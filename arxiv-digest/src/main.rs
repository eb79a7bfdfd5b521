use arxiv_digest::config::AppConfig;
use arxiv_digest::logging::init_tracing;
use arxiv_digest::scheduler::run_daily;
use arxiv_digest::{ArxivFeedSource, DigestError, DigestPipeline, SynopsisGenerator};
use chrono::Local;
use clap::Parser;
use email_delivery::{send_test_email, SmtpMailer};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "arxiv-digest", version, about = "Daily arXiv keyword digest delivered by email")]
struct Cli {
    /// Configuration file path (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand (runs the daily schedule if omitted)
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Fetch, filter and send one digest now
    Run,
    /// Send a connectivity-check email
    Test,
    /// Run every day at the configured process_time until interrupted
    Schedule,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("arxiv-digest: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_tracing(&config.logging);

    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }
    config.log_summary();

    match execute(cli.command.unwrap_or(Command::Schedule), config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Command, config: AppConfig) -> Result<(), DigestError> {
    let mailer = SmtpMailer::new(&config.email).map_err(|e| DigestError::Config(e.to_string()))?;

    if let Command::Test = command {
        info!("Sending test email");
        let report = send_test_email(&mailer, &config.email.recipients, Local::now()).await;
        return if report.is_success() {
            Ok(())
        } else {
            Err(DigestError::Delivery("test email reached no recipients".to_string()))
        };
    }

    let at = config.digest.process_time()?;
    let source = ArxivFeedSource::new(config.digest.fetch.clone())?;
    let summarizer = SynopsisGenerator::from_config(&config.digest.summarizer)?;
    let pipeline = DigestPipeline::new(
        Box::new(source),
        summarizer,
        Box::new(mailer),
        config.digest,
        config.email.recipients,
    );

    match command {
        Command::Run => {
            let report = pipeline.run().await?;
            info!(
                fetched = report.fetched,
                matched = report.matched,
                pushed = report.pushed,
                "Sent {}/{}",
                report.delivery.sent.len(),
                report.delivery.attempted()
            );
            Ok(())
        }
        _ => {
            info!(time = %at, "Scheduler started, press Ctrl+C to stop");
            run_daily(&pipeline, at, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Cannot listen for Ctrl+C");
                    std::future::pending::<()>().await;
                }
            })
            .await;
            Ok(())
        }
    }
}
