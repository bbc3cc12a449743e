use anyhow::{Context as _, Result};
use chanrelay_adaptor::{get_adaptor, vertex};
use chanrelay_auth::AccessTokenCache;
use chanrelay_config::{Config, LogConfig};
use chanrelay_types::ChannelType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chanrelay", about = "chanrelay: inspect relay channels and adaptors")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured channels.
    Channels,
    /// List the models an adaptor advertises.
    Models {
        /// Channel type name or numeric code (openai / azure / 42 …).
        channel_type: String,
    },
    /// Print the upstream URL a request would be sent to.
    Url {
        /// Configured channel name.
        #[arg(long)]
        channel: String,
        /// Upstream model name.
        #[arg(long)]
        model: String,
        /// Inbound request path.
        #[arg(long, default_value = "/v1/chat/completions")]
        path: String,
    },
    /// Fetch an access token for a Vertex channel.
    Token {
        /// Configured channel name.
        #[arg(long)]
        channel: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path).map_err(|e| anyhow::anyhow!("config error: {e}"))?,
        None => Config::default(),
    };
    init_logging(&config.log)?;
    tracing::debug!(channels = config.channels.len(), "configuration loaded");
    AccessTokenCache::configure_global(config.token_cache.refresh_margin());

    match cli.command {
        Commands::Channels => {
            cmd_channels(&config);
            Ok(())
        }
        Commands::Models { channel_type } => cmd_models(&channel_type),
        Commands::Url {
            channel,
            model,
            path,
        } => cmd_url(&config, &channel, &model, &path),
        Commands::Token { channel } => cmd_token(&config, &channel).await,
    }
}

fn init_logging(log: &LogConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log.level))
        .context("failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if log.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
    Ok(())
}

fn cmd_channels(config: &Config) {
    if config.channels.is_empty() {
        eprintln!("no channels configured");
        return;
    }
    for ch in &config.channels {
        let state = if ch.enabled { "" } else { " (disabled)" };
        println!(
            "{}\t{} ({})\t{}{state}",
            ch.name,
            ch.channel_type,
            ch.channel_type.code(),
            ch.base_url()
        );
    }
}

fn cmd_models(channel_type: &str) -> Result<()> {
    let channel: ChannelType = channel_type
        .parse()
        .map_err(|e| anyhow::anyhow!("unknown channel type '{channel_type}': {e}"))?;
    let adaptor = get_adaptor(channel, AccessTokenCache::global());
    println!("# {}", adaptor.get_channel_name());
    for model in adaptor.get_model_list() {
        println!("{model}");
    }
    Ok(())
}

fn cmd_url(config: &Config, name: &str, model: &str, path: &str) -> Result<()> {
    let channel = config
        .channel(name)
        .with_context(|| format!("no enabled channel named '{name}'"))?;
    let info = channel.relay_info(path, model, false, 0);
    let url = get_adaptor(channel.channel_type, AccessTokenCache::global()).get_request_url(&info)?;
    println!("{url}");
    Ok(())
}

async fn cmd_token(config: &Config, name: &str) -> Result<()> {
    let channel = config
        .channel(name)
        .with_context(|| format!("no enabled channel named '{name}'"))?;
    if channel.channel_type != ChannelType::VertexOpenAI {
        anyhow::bail!("channel '{name}' is {}, not a Vertex channel", channel.channel_type);
    }
    let key = vertex::parse_composite_key(&channel.api_key)?;
    let cache = AccessTokenCache::global();
    let token = cache
        .get_access_token(key.credential)
        .await
        .map_err(|e| anyhow::anyhow!("token fetch failed: {e}"))?;
    if let Some(entry) = cache.cached(key.credential) {
        eprintln!(
            "project {} token valid for {}s",
            key.project_id,
            entry.remaining().as_secs()
        );
    }
    println!("{token}");
    Ok(())
}
