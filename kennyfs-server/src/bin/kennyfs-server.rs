#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use kennyfs_backend_memory::MemoryBackend;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Two positional arguments, per spec.md §6's CLI surface: the subsystem's
/// own config file and the TCP port to listen on. The port is taken on the
/// CLI rather than solely from the config file so one config can back
/// multiple listener instances; it overrides `listen_port` from the file.
#[derive(Parser, Debug)]
#[command(author, version, about = "KennyFS network-protocol server")]
struct Cli {
    /// Path to the server's TOML configuration file.
    config: PathBuf,
    /// TCP port to listen on, overriding the config file's listen_port.
    port: u16,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut cfg = match kennyfs_server::config::load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    cfg.listen_port = cli.port;

    init_tracing(&cfg.logging.level);

    let backend = Arc::new(MemoryBackend::new());
    match kennyfs_server::run(Arc::new(cfg), backend).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "server exited with a fatal error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
}
