use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ytgist",
    about = "YouTube video summaries, transcripts and transcript chat via Gemini",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show video and preference details
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Picks {
    /// Caption / summary language code (e.g. en, de, ja)
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Gemini model (see `ytgist prefs --list`)
    #[arg(short, long)]
    pub model: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Summarize a video
    Summary {
        /// YouTube video URL or video ID
        url: String,

        #[command(flatten)]
        picks: Picks,

        /// Summary length: short, medium, long
        #[arg(long)]
        length: Option<String>,
    },

    /// Print a video's transcript
    Transcript {
        /// YouTube video URL or video ID
        url: String,

        /// Caption language code
        #[arg(short, long)]
        lang: Option<String>,

        /// Plain text without timestamps
        #[arg(long)]
        plain: bool,
    },

    /// Chat about a video (reads questions from stdin)
    Chat {
        /// YouTube video URL or video ID
        url: String,

        #[command(flatten)]
        picks: Picks,
    },

    /// Manage the stored Google AI Studio API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Show or change stored preferences
    Prefs {
        #[command(flatten)]
        picks: Picks,

        /// Summary length: short, medium, long
        #[arg(long)]
        length: Option<String>,

        /// List available languages, models and lengths
        #[arg(long)]
        list: bool,
    },
}

#[derive(Subcommand)]
pub enum KeyAction {
    /// Validate and store a key
    Set { key: String },
    /// Remove the stored key
    Reset,
    /// Show whether a key is stored
    Status,
}
