//! # Emoji Art CLI
//!
//! Command-line host for Emoji Art documents. Each invocation opens one
//! document, applies one command through the document controller, waits for
//! background resolution to settle, prints a JSON summary, and saves.
//!
//! ## Usage
//!
//! ```bash
//! emoji-art add 🐶 --x 40 --y 60 --size 48
//! emoji-art move 1 10 -5
//! emoji-art background url https://example.com/sky.png
//! emoji-art --file drawing.emojiart show
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `CliConfig` - Where the document lives and how backgrounds are fetched
//! - `Session` - One open document plus its store, driving the controller

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod session;

pub use session::{document_summary, Session};

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use emoji_art_io::FetchConfig;
use url::Url;

/// Name of the palette store the CLI manages.
pub const PALETTE_STORE_NAME: &str = "Default";

/// Command-line arguments for emoji-art.
#[derive(Debug, Clone, Parser)]
#[command(name = "emoji-art")]
#[command(about = "Edit Emoji Art documents from the command line")]
#[command(version)]
pub struct CliArgs {
    /// Snapshot file to edit instead of a named document in the data directory
    #[arg(long, env = "EMOJI_ART_FILE", global = true)]
    pub file: Option<PathBuf>,

    /// Directory holding named documents and palettes
    #[arg(
        long,
        env = "EMOJI_ART_DATA_DIR",
        default_value = "emoji-art-data",
        global = true
    )]
    pub data_dir: PathBuf,

    /// Document name within the data directory
    #[arg(long, default_value = "Untitled", global = true)]
    pub name: String,

    /// Downscale backgrounds so neither edge exceeds this many pixels
    /// (overrides EMOJI_ART_MAX_IMAGE_DIMENSION)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..), global = true)]
    pub max_background_dimension: Option<u32>,

    /// What to do with the document
    #[command(subcommand)]
    pub command: Command,
}

/// Document commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the document
    Show,
    /// Place an emoji
    Add {
        /// The emoji to place
        emoji: String,
        /// Horizontal offset from the canvas center
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        x: i32,
        /// Vertical offset from the canvas center
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        y: i32,
        /// Point size
        #[arg(long, default_value_t = 40)]
        size: u32,
    },
    /// Move an emoji by an offset
    Move {
        /// Emoji id
        id: u64,
        /// Horizontal offset
        #[arg(allow_negative_numbers = true)]
        dx: i32,
        /// Vertical offset
        #[arg(allow_negative_numbers = true)]
        dy: i32,
    },
    /// Set an emoji's size
    Resize {
        /// Emoji id
        id: u64,
        /// New point size
        size: u32,
    },
    /// Remove an emoji
    Remove {
        /// Emoji id
        id: u64,
    },
    /// Replace the background
    Background {
        /// Where the new background comes from
        #[command(subcommand)]
        source: BackgroundSource,
    },
    /// List the emoji palettes
    Palettes,
    /// Walk through add, remove, undo, and redo on a scratch document
    DemoUndo,
}

impl Command {
    /// Whether the command changes the opened document and should be saved.
    #[must_use]
    pub const fn modifies_document(&self) -> bool {
        matches!(
            self,
            Self::Add { .. }
                | Self::Move { .. }
                | Self::Resize { .. }
                | Self::Remove { .. }
                | Self::Background { .. }
        )
    }
}

/// Background sources.
#[derive(Debug, Clone, Subcommand)]
pub enum BackgroundSource {
    /// No background image
    Blank,
    /// Fetch an image URL (image search links are unwrapped)
    Url {
        /// Image URL
        url: Url,
    },
    /// Embed a local image file in the document
    File {
        /// Image file path
        path: PathBuf,
    },
}

/// Where the edited document is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLocation {
    /// An explicit snapshot file.
    File(PathBuf),
    /// A named document in the data directory.
    Named(String),
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Named(name) => write!(f, "document {name}"),
        }
    }
}

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// The document to open.
    pub location: DocumentLocation,
    /// Directory for named documents and palettes.
    pub data_dir: PathBuf,
    /// Background fetch settings.
    pub fetch: FetchConfig,
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        let location = match args.file {
            Some(path) => DocumentLocation::File(path),
            None => DocumentLocation::Named(args.name),
        };
        let mut fetch = FetchConfig::from_env();
        if let Some(max) = args.max_background_dimension {
            fetch.max_image_dimension = Some(max);
        }
        Self {
            location,
            data_dir: args.data_dir,
            fetch,
        }
    }
}
