use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stillcast_av::SubtitleMode;

#[derive(Parser)]
#[command(name = "stillcast")]
#[command(author, version, about = "Turn an audio track into an MP4 with a still picture")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP conversion server
    Start {
        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Convert local files without starting the server
    Convert {
        /// Audio track to use
        #[arg(long, required = true)]
        audio: PathBuf,

        /// Still image for the video track
        #[arg(long)]
        image: Option<PathBuf>,

        /// Subtitle file
        #[arg(long)]
        subtitle: Option<PathBuf>,

        /// How to attach the subtitle
        #[arg(long, default_value = "hard")]
        mode: SubtitleMode,

        /// Where to write the MP4
        #[arg(short, long, required = true)]
        output: PathBuf,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
