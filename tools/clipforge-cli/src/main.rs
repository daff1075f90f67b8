//! ClipForge CLI: project setup, timeline editing, and export.
//!
//! Usage:
//!   clipforge init <NAME>                 Create a project
//!   clipforge import <PATH> <FILE>        Import media and append a clip
//!   clipforge add-text <PATH> <TEXT>      Append a text overlay
//!   clipforge split <PATH> <ID> <AT>      Split an element at a timeline position
//!   clipforge drag <PATH> <ID> <PX>...    Replay a pointer drag
//!   clipforge compile <PATH>              Print the render command
//!   clipforge export <PATH>               Render the timeline to video
//!   clipforge check                       Check for ffmpeg/ffprobe
//!
//! Element ids may be abbreviated to any unique prefix.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use clipforge_project_model::DragHandle;
use commands::edit::EditAction;

#[derive(Parser)]
#[command(
    name = "clipforge",
    about = "Non-linear video editing from the command line",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Parent directory (defaults to the configured projects directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a media file and append it to the timeline
    Import {
        /// Path to the project directory
        path: PathBuf,

        /// Media file to import
        file: PathBuf,
    },

    /// Append a text overlay
    AddText {
        /// Path to the project directory
        path: PathBuf,

        /// Overlay content
        text: String,
    },

    /// Split a clip or overlay at a timeline position
    Split {
        path: PathBuf,
        id: String,
        /// Timeline position in seconds
        at: f64,
    },

    /// Move a clip's source in-point, keeping its end fixed
    TrimStart {
        path: PathBuf,
        id: String,
        /// New source in-point in seconds
        source_in: f64,
    },

    /// Move a clip's source out-point, keeping its start fixed
    TrimEnd {
        path: PathBuf,
        id: String,
        /// New source out-point in seconds
        source_out: f64,
    },

    /// Move an element to a new timeline start
    Move {
        path: PathBuf,
        id: String,
        /// New timeline start in seconds
        start: f64,
    },

    /// Drag an element's right edge to a new timeline end
    Resize {
        path: PathBuf,
        id: String,
        /// New timeline end in seconds
        end: f64,
    },

    /// Replay a pointer drag on an element, in pixels at the configured zoom
    Drag {
        path: PathBuf,
        id: String,

        /// Dragged part: body|left|right
        #[arg(long, default_value = "body")]
        handle: String,

        /// Pointer offsets from the drag origin, in pixels
        #[arg(required = true, allow_negative_numbers = true)]
        deltas_px: Vec<f64>,
    },

    /// Duplicate an element right after itself
    Duplicate { path: PathBuf, id: String },

    /// Remove an element
    Delete { path: PathBuf, id: String },

    /// Show project information
    Info {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Validate a project directory
    Validate {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Compile the timeline and print the render command
    Compile {
        /// Path to the project directory
        path: PathBuf,

        /// Print the command as JSON instead of an ffmpeg argument list
        #[arg(long)]
        json: bool,

        /// Compile an empty timeline to a black frame
        #[arg(long)]
        allow_empty: bool,
    },

    /// Export the timeline to video
    Export {
        /// Path to the project directory
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Quality: low|medium|high|ultra
        #[arg(long)]
        quality: Option<String>,

        /// Encoding speed: fastest|fast|balanced|slow
        #[arg(long)]
        speed: Option<String>,

        /// Compile an empty timeline to a black frame
        #[arg(long)]
        allow_empty: bool,
    },

    /// Check for the external tools
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = clipforge_common::AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    clipforge_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init { name, output } => {
            commands::init::run(name, output.unwrap_or_else(|| config.projects_dir.clone()))
        }
        Commands::Import { path, file } => commands::import::run(path, file, &config),
        Commands::AddText { path, text } => {
            commands::edit::run(path, EditAction::AddText { text })
        }
        Commands::Split { path, id, at } => commands::edit::run(path, EditAction::Split { id, at }),
        Commands::TrimStart {
            path,
            id,
            source_in,
        } => commands::edit::run(path, EditAction::TrimStart { id, source_in }),
        Commands::TrimEnd {
            path,
            id,
            source_out,
        } => commands::edit::run(path, EditAction::TrimEnd { id, source_out }),
        Commands::Move { path, id, start } => {
            commands::edit::run(path, EditAction::Move { id, start })
        }
        Commands::Resize { path, id, end } => {
            commands::edit::run(path, EditAction::Resize { id, end })
        }
        Commands::Drag {
            path,
            id,
            handle,
            deltas_px,
        } => {
            let handle = match handle.as_str() {
                "body" => DragHandle::Body,
                "left" => DragHandle::LeftEdge,
                "right" => DragHandle::RightEdge,
                _ => {
                    return Err(anyhow::anyhow!(
                        "Unknown handle: {handle}. Use: body, left, right"
                    ));
                }
            };
            commands::edit::drag(path, id, handle, deltas_px, &config)
        }
        Commands::Duplicate { path, id } => commands::edit::run(path, EditAction::Duplicate { id }),
        Commands::Delete { path, id } => commands::edit::run(path, EditAction::Delete { id }),
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Compile {
            path,
            json,
            allow_empty,
        } => commands::compile::run(path, json, allow_empty),
        Commands::Export {
            path,
            output,
            quality,
            speed,
            allow_empty,
        } => commands::export::run(path, output, quality, speed, allow_empty, &config).await,
        Commands::Check => commands::check::run(&config),
    }
}
