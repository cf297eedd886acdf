//! CourseMate auth service CLI server
//!
//! ```sh
//! # Run with default config (~/.config/coursemate-auth/config.toml)
//! JWT_SECRET=... coursemate-auth
//!
//! # Local development with the insecure fallback secret and demo user
//! coursemate-auth --dev
//!
//! # Validate config without starting
//! coursemate-auth --check
//!
//! # Produce a bcrypt hash for a [[users]] entry
//! echo -n 'pass123' | coursemate-auth hash-password
//! ```

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use coursemate_auth::config::AppConfig;
use coursemate_auth::infrastructure::crypto::password::hash_password;
use coursemate_auth::server::{init_tracing, ServerHandle};

/// Bearer-token auth service for CourseMate.
#[derive(Parser, Debug)]
#[command(name = "coursemate-auth", version, about)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "AUTH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable development mode (insecure fallback secret, demo user).
    #[arg(long)]
    dev: bool,

    /// Validate the configuration and exit without starting the server.
    #[arg(long)]
    check: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a bcrypt hash for seeding the credential store.
    HashPassword {
        /// Password to hash; read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,

        /// bcrypt work factor.
        #[arg(long, default_value_t = 10)]
        cost: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(Command::HashPassword { password, cost }) = cli.command {
        return hash_password_command(password, cost);
    }

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .unwrap_or_else(coursemate_auth::default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.apply_env_overrides() {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.dev {
        config.security.development_mode = true;
    }

    init_tracing(&config);
    info!("Configuration loaded from {}", config_path.display());

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        return match config.validate() {
            Ok(()) => {
                println!("Configuration is valid");
                println!("   Config file : {}", config_path.display());
                println!("   Address     : {}", config.server.address());
                println!("   Token TTL   : {}s", config.security.token_ttl_secs);
                println!("   Users       : {}", config.users.len());
                println!("   Dev mode    : {}", config.security.development_mode);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Configuration is invalid: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    // ── Start server ───────────────────────────────────────────
    let handle = match ServerHandle::start(config).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    handle.install_signal_handler();
    info!("Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;
    info!("Shutdown complete");

    ExitCode::SUCCESS
}

fn hash_password_command(password: Option<String>, cost: u32) -> ExitCode {
    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            if let Err(e) = io::stdin().lock().read_line(&mut line) {
                eprintln!("Failed to read password from stdin: {}", e);
                return ExitCode::FAILURE;
            }
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if password.is_empty() {
        eprintln!("Refusing to hash an empty password");
        return ExitCode::FAILURE;
    }

    match hash_password(&password, cost) {
        Ok(hash) => {
            println!("{}", hash);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Hashing failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
