//! otpseal: generate and seal numeric one-time passcodes
//!
//! Commands:
//!   generate [--length N]        - print a fresh numeric OTP
//!   encrypt <OTP>                - seal an OTP into "<b64 ct>:<b64 nonce>"
//!   decrypt <ENVELOPE>           - open an envelope produced by `encrypt`
//!   issue [--length N] [--json]  - generate and seal in one step
//!   config show                  - display the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use otpseal_core::OtpSealConfig;
use otpseal_sdk::OtpSeal;
use serde::Serialize;
use std::path::{Path, PathBuf};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "otpseal",
    version,
    about = "Numeric one-time passcodes with AES-256-GCM sealing",
    long_about = "otpseal: generate OTPs and protect them at rest with a key held in the platform keychain"
)]
struct Cli {
    /// Path to config.toml (default: ~/.config/otpseal/config.toml)
    #[arg(long, short = 'c', env = "OTPSEAL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides [log] level
    #[arg(long, env = "OTPSEAL_LOG")]
    log: Option<String>,

    /// Log format; overrides [log] format
    #[arg(long, env = "OTPSEAL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a fresh numeric OTP
    Generate {
        /// Number of digits (default: [otp] length)
        #[arg(long, short = 'n')]
        length: Option<usize>,
    },

    /// Seal an OTP with the store-held key
    Encrypt {
        otp: String,
    },

    /// Open an envelope and print the OTP
    Decrypt {
        /// Envelope in "<base64 ciphertext>:<base64 nonce>" form
        envelope: String,
    },

    /// Generate an OTP and seal it in one step
    Issue {
        #[arg(long, short = 'n')]
        length: Option<usize>,
        /// Emit {"otp": ..., "envelope": ...} as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Serialize)]
struct IssuedOtp<'a> {
    otp: &'a str,
    envelope: &'a str,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(OtpSealConfig::default_path);
    let config = load_config(&config_path)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = match cli.log_format {
        Some(f) => f,
        None => parse_log_format(&config.log.format)?,
    };
    init_logging(&level, format);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        backend = ?config.keystore.backend,
        "otpseal starting"
    );

    match cli.command {
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
        Commands::Generate { length } => {
            let seal = open_seal(&config)?;
            let otp = seal
                .generate_otp(length.unwrap_or(seal.default_length()))
                .context("generating OTP")?;
            println!("{otp}");
            Ok(())
        }
        Commands::Encrypt { otp } => {
            let seal = open_seal(&config)?;
            println!("{}", seal.encrypt_otp(&otp).context("encrypting OTP")?);
            Ok(())
        }
        Commands::Decrypt { envelope } => {
            let seal = open_seal(&config)?;
            println!("{}", seal.decrypt_otp(&envelope).context("decrypting OTP")?);
            Ok(())
        }
        Commands::Issue { length, json } => {
            let seal = open_seal(&config)?;
            cmd_issue(&seal, length.unwrap_or(seal.default_length()), json)
        }
    }
}

fn load_config(path: &Path) -> Result<OtpSealConfig> {
    OtpSealConfig::load(path).with_context(|| format!("loading config: {}", path.display()))
}

fn open_seal(config: &OtpSealConfig) -> Result<OtpSeal> {
    OtpSeal::from_config(config).context("initialising otpseal")
}

fn parse_log_format(s: &str) -> Result<LogFormat> {
    LogFormat::from_str(s, true).map_err(|e| anyhow::anyhow!("invalid [log] format {s:?}: {e}"))
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let layer = fmt::layer().with_writer(std::io::stderr);

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .init(),
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_issue(seal: &OtpSeal, length: usize, json: bool) -> Result<()> {
    let (otp, envelope) = seal.issue_otp(length).context("issuing OTP")?;
    if json {
        let rendered = serde_json::to_string(&IssuedOtp {
            otp: &otp,
            envelope: &envelope,
        })
        .context("serializing issued OTP")?;
        println!("{rendered}");
    } else {
        println!("otp:      {otp}");
        println!("envelope: {envelope}");
    }
    Ok(())
}

fn cmd_config_show(config: &OtpSealConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
