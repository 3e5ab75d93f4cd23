//! beatgrid: drum pattern editing and rendering from the command line

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "beatgrid", version, about = "Drum pattern timing engine")]
pub struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print grid lines for a duration
    Grid {
        /// Duration in seconds
        #[arg(long)]
        duration: f64,
        /// Grid step in seconds (defaults to the configured tempo/division)
        #[arg(long)]
        grid: Option<f64>,
        #[arg(long)]
        beats_per_bar: Option<u32>,
    },
    /// Apply transforms to a pattern file
    Edit(EditArgs),
    /// Print the notes inside a time range as JSON
    Select {
        pattern: PathBuf,
        #[arg(long)]
        start: f64,
        #[arg(long)]
        end: f64,
        /// Comma separated lane names (default: all lanes)
        #[arg(long, value_delimiter = ',')]
        lanes: Vec<String>,
    },
    /// Render a pattern through the configured kit into a WAV file
    Render {
        pattern: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Extra seconds rendered after the last note
        #[arg(long, default_value_t = 1.0)]
        tail: f64,
    },
    /// Play a pattern on the default output device
    Play {
        pattern: PathBuf,
        #[arg(long, default_value_t = 1.0)]
        tail: f64,
    },
}

#[derive(Debug, Args)]
pub struct EditArgs {
    pub pattern: PathBuf,
    /// Output file (defaults to overwriting the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Grid step in seconds for quantize/swing
    #[arg(long)]
    pub grid: Option<f64>,
    /// Quantize strength 0.0-1.0
    #[arg(long)]
    pub quantize: Option<f64>,
    /// Swing amount
    #[arg(long)]
    pub swing: Option<f64>,
    /// Humanize amount
    #[arg(long)]
    pub humanize: Option<f64>,
    #[arg(long, default_value_t = beatgrid_core::transform::DEFAULT_SEED)]
    pub seed: u64,
    /// Move notes: START END OFFSET
    #[arg(
        long = "move",
        num_args = 3,
        value_names = ["START", "END", "OFFSET"],
        allow_negative_numbers = true
    )]
    pub move_range: Option<Vec<f64>>,
    /// Delete notes: START END
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    pub delete: Option<Vec<f64>>,
    /// Lanes for move/delete (comma separated, default: all)
    #[arg(long, value_delimiter = ',')]
    pub lanes: Vec<String>,
    /// Undo this many edits before saving
    #[arg(long, default_value_t = 0)]
    pub undo: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("beatgrid=info")))
        .init();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref());

    match cli.command {
        Command::Grid { duration, grid, beats_per_bar } => {
            commands::print_grid(&config, duration, grid, beats_per_bar)
        }
        Command::Edit(args) => commands::edit(&config, &args),
        Command::Select { pattern, start, end, lanes } => {
            commands::select(&pattern, start, end, &lanes)
        }
        Command::Render { pattern, output, tail } => {
            commands::render(&config, &pattern, &output, tail)
        }
        Command::Play { pattern, tail } => commands::play(&config, &pattern, tail),
    }
}
