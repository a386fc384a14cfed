mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use opusrack::{config, server};

async fn start_server(
    host: String,
    port: u16,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting Opusrack server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "opusrack=trace,tower_http=debug".to_string()
        } else {
            "opusrack=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("opusrack {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::HashSeed { seed } => hash_seed(&seed),
        Commands::GenerateToken => {
            println!("{}", server::auth::generate_token());
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Auth enabled: {}", config.server.auth.enabled);
            println!("  Bitrates: {:?}", config.encoder.bitrates);
            println!("  Output dir: {:?}", config.encoder.output_dir);
            println!("  Store enabled: {}", config.store.enabled);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Bitrates: {:?}", config.encoder.bitrates);
        }
    }

    Ok(())
}

fn hash_seed(seed: &str) -> Result<()> {
    let hash = bcrypt::hash(seed, 10)?;
    println!("{}", hash);
    Ok(())
}
