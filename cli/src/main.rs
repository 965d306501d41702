mod client;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use intake::{AcquisitionController, ConfigError, DetectionPipeline, EffectRunner, IntakeConfig, NoDevices};
use shared::FacingMode;
use thiserror::Error;

use client::{ReqwestAnalysisService, TokioTimer, resolve_endpoint};
use session::{Report, Runner};

const DEFAULT_CONFIG: &str = "config/intake.yaml";

#[derive(Error, Debug)]
enum CliError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Acquisition(#[from] intake::AcquisitionError),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Validate skin images and submit them for analysis")]
struct Args {
    /// Intake configuration (YAML). Built-in defaults apply when the file is absent.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
    /// Base URL a relative analysis endpoint is resolved against.
    #[arg(long, global = true, env = "INTAKE_BASE_URL", default_value = "http://localhost:8080")]
    base_url: String,
    /// Analysis endpoint, overriding the configured one.
    #[arg(long, global = true, env = "INTAKE_ENDPOINT")]
    endpoint: Option<String>,
    /// Print one JSON report per file instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check files against the acceptance policy without submitting them.
    Check { files: Vec<PathBuf> },
    /// Check files and submit accepted ones for analysis.
    Analyze {
        files: Vec<PathBuf>,
        /// Extra submissions after a failed analysis.
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Try to open a camera on this host.
    Camera {
        #[arg(long)]
        facing: Option<FacingMode>,
    },
}

fn load_config(args: &Args) -> Result<IntakeConfig, CliError> {
    let mut config = if args.config.exists() {
        IntakeConfig::load(&args.config)?
    } else {
        log::warn!("{} not found, using default intake config", args.config.display());
        IntakeConfig::default()
    };
    if let Some(endpoint) = &args.endpoint {
        config.detection.endpoint = endpoint.clone();
    }
    config.validate()?;
    Ok(config)
}

fn build_runner(args: &Args, config: &IntakeConfig) -> Result<Runner, CliError> {
    let endpoint = resolve_endpoint(&args.base_url, &config.detection.endpoint)?;
    let pipeline = DetectionPipeline::new(
        ReqwestAnalysisService::new(endpoint),
        TokioTimer,
        config.detection.request_timeout(),
    );
    log::info!("Analysis endpoint: {}", pipeline.service().endpoint());
    Ok(EffectRunner::new(NoDevices, pipeline))
}

fn print_report(report: &Report, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }
    match report {
        Report::Rejected { file, violations } => {
            println!("{file}: rejected");
            for violation in violations {
                println!("  - {violation}");
            }
        }
        Report::Accepted {
            file,
            size_bytes,
            dimensions,
        } => {
            let dims = dimensions.map(|(w, h)| format!(", {w}x{h}")).unwrap_or_default();
            println!(
                "{file}: accepted ({:.2} MB{dims})",
                *size_bytes as f64 / (1024.0 * 1024.0)
            );
        }
        Report::Analyzed { file, result } => {
            let severity = result
                .severity
                .as_deref()
                .map(|s| format!(", severity {s}"))
                .unwrap_or_default();
            println!(
                "{file}: {} ({:.1}% confidence{severity})",
                result.condition_label, result.confidence_percent
            );
        }
        Report::Failed { file, attempts, error } => {
            println!("{file}: failed after {attempts} attempt(s): {error}");
        }
    }
    Ok(())
}

async fn run(args: Args) -> Result<bool, CliError> {
    let config = load_config(&args)?;
    let runner = build_runner(&args, &config)?;
    let mut controller = AcquisitionController::new(&config);

    let mut all_ok = true;
    match &args.command {
        Command::Check { files } => {
            for path in files {
                let report = session::load_file(&mut controller, path).await?;
                all_ok &= report.is_success();
                print_report(&report, args.json)?;
                controller.clear();
            }
        }
        Command::Analyze { files, retries } => {
            for path in files {
                let report = session::analyze_file(&mut controller, &runner, path, *retries).await?;
                all_ok &= report.is_success();
                print_report(&report, args.json)?;
                controller.clear();
            }
        }
        Command::Camera { facing } => {
            if let Some(facing) = facing {
                controller.set_facing(*facing);
            }
            if session::check_camera(&mut controller, &runner).await? {
                println!("Camera opened");
            } else {
                println!("Camera unavailable");
                all_ok = false;
            }
        }
    }
    controller.teardown();
    Ok(all_ok)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
