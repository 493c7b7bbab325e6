//! sessiond server binary

use clap::Parser;
use sessiond::config::expand_path;
use sessiond::{Config, Service};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sessiond", version)]
#[command(about = "Cookie-keyed server-side session store", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "~/.sessiond/config.toml")]
    config: PathBuf,

    /// Listen on this port instead of server.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind to this host instead of server.host
    #[arg(long)]
    host: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Write a commented default config and exit
    #[arg(long)]
    init: bool,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "sessiond=debug,tower_http=debug"
    } else {
        "sessiond=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn write_default_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        tracing::warn!("Refusing to overwrite {}", path.display());
    } else {
        Config::create_default(path)?;
        tracing::info!("Wrote default config to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config_path = expand_path(&args.config);
    if args.init {
        return write_default_config(&config_path);
    }

    let mut config = Config::resolve(&config_path)?;
    config.override_listener(args.host, args.port);

    // Unknown or duplicate backends abort here
    let service = Service::new(config)?;
    service.run().await?;

    Ok(())
}
