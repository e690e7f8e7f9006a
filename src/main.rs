mod cli;

use stillcast::{
    config,
    conversion::{ConversionRequest, Orchestrator, Upload},
    server,
};
use stillcast_av::{SubtitleMode, ToolRegistry};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting stillcast server");

    // Refuse to serve if the transcoder or a required asset is missing.
    let settings = config::Settings::resolve(&config)?;
    let orchestrator = Orchestrator::from_settings(settings);

    server::start_server(config, orchestrator).await
}

async fn convert_files(
    audio: &Path,
    image: Option<&Path>,
    subtitle: Option<&Path>,
    mode: SubtitleMode,
    output: &Path,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let settings = config::Settings::resolve(&config)?;
    let orchestrator = Orchestrator::from_settings(settings);

    let request = ConversionRequest {
        audio: read_upload(audio).await?,
        image: match image {
            Some(path) => Some(read_upload(path).await?),
            None => None,
        },
        subtitle: match subtitle {
            Some(path) => Some(read_upload(path).await?),
            None => None,
        },
        subtitle_mode: mode,
    };

    let media = orchestrator.convert(request).await?;
    let bytes = media.save_to(output).await?;

    println!("Wrote {} ({} bytes)", output.display(), bytes);
    Ok(())
}

async fn read_upload(path: &Path) -> Result<Upload> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read input file: {:?}", path))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Upload::new(file_name, data))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "stillcast=trace,stillcast_av=trace,stillcast_common=debug,tower_http=debug".to_string()
        } else {
            "stillcast=info,stillcast_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Convert {
            audio,
            image,
            subtitle,
            mode,
            output,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_files(
                &audio,
                image.as_deref(),
                subtitle.as_deref(),
                mode,
                &output,
                cli.config.as_deref(),
            ))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("stillcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let registry = ToolRegistry::discover(config.tools.ffmpeg_path.as_deref());
    let tools = registry.check_all();

    for tool in &tools {
        let status = if tool.available { "✓" } else { "✗" };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if tools.iter().any(|t| t.name == "ffmpeg" && t.available) {
        println!("ffmpeg is available; stillcast can convert.");
        Ok(())
    } else {
        anyhow::bail!("ffmpeg is required but was not found on PATH")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Max upload: {} MiB", config.server.max_upload_mb);
    println!("  Scratch dir: {}", config.storage.scratch_dir.display());
    println!("  Image policy: {:?}", config.image.policy);
    if config.image.policy.uses_fixed_image() {
        println!("  Default image: {}", config.image.default_image.display());
    }
    println!("  Subtitle language: {}", config.subtitles.language);

    Ok(())
}
