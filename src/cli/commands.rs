//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - route: classify an utterance (or let the model call a function) and dispatch it
//! - navigate / medical / tool: call one handler directly
//! - tools / sites / pages: inspect the domain store

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Voxroute - intent router for transcribed voice requests
#[derive(Parser, Debug)]
#[command(name = "voxroute")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log browser launches instead of opening pages
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Subcommand to execute; without one, utterances are read from stdin
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Whether the command needs the classifier (and so an API key)
    pub fn needs_classifier(&self) -> bool {
        matches!(self.command, None | Some(Commands::Route { .. }))
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify an utterance and route it to a handler
    Route {
        /// The utterance, e.g. "what's the weather in Surat"
        #[arg(required = true, num_args = 1..)]
        utterance: Vec<String>,

        /// Let the model pick a handler function instead of classifying
        #[arg(short, long)]
        function_call: bool,
    },

    /// Open a known page
    Navigate {
        /// Page name or alias
        page: String,
    },

    /// Extract a structured record from a clinical note
    Medical {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Run a registry tool
    Tool {
        /// Tool name, e.g. get_weather_tool
        name: String,

        /// Parameters as key=value
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },

    /// List registry tools
    Tools,

    /// List valid anatomical sites
    Sites {
        /// Only this organ (upper or lower)
        #[arg(short, long)]
        organ: Option<String>,
    },

    /// List known pages
    Pages,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
