//! Command definitions and structures for the CLI
//!
//! This module contains all the clap-based command line argument definitions,
//! including the main CLI structure and all subcommands.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::notification::Urgency;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "popup-notifier")]
#[command(about = "Show desktop notification popups through the freedesktop notification daemon")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project path for project-level configuration
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show a notification popup
    Send(SendArgs),

    /// List the capabilities of the running notification daemon
    Capabilities {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    /// Body text
    pub body: Option<String>,

    /// Title; the application's pretty name is used when omitted
    #[arg(short, long)]
    pub title: Option<String>,

    /// Icon name or path
    #[arg(short, long)]
    pub icon: Option<String>,

    /// default, low, normal, high or critical
    #[arg(short, long, default_value = "default")]
    pub urgency: Urgency,

    /// Event id looked up in the application's events file
    #[arg(short, long, default_value = "notification")]
    pub event: String,

    /// Application name; defaults to `app.name` from the configuration
    #[arg(short, long, env = "POPUP_NOTIFIER_APP")]
    pub app: Option<String>,

    /// Action label, repeat for several actions
    #[arg(long = "action")]
    pub actions: Vec<String>,

    /// Label of the default action
    #[arg(long)]
    pub default_action: Option<String>,

    /// Extra hint as KEY=VALUE, repeatable
    #[arg(long = "hint", value_parser = parse_hint)]
    pub hints: Vec<(String, String)>,

    /// Keep the popup until it is closed
    #[arg(long)]
    pub persistent: bool,

    /// Do not group with other popups of the application
    #[arg(long)]
    pub skip_grouping: bool,

    /// Keep the notification after an action is invoked
    #[arg(long)]
    pub resident: bool,

    /// Wait for the popup to close and print its signals
    #[arg(short, long)]
    pub wait: bool,

    /// Print signals as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Print the Notify call instead of sending it
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_hint(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Configuration management actions
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Initialize global configuration (default is project-level)
        #[arg(short, long)]
        global: bool,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Print the configuration file and events directory in use
    Path,
}
