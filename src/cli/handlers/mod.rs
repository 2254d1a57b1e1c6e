//! Command handlers for all CLI operations

pub mod capabilities;
pub mod config;
pub mod send;

use super::{CliContext, Commands};
use anyhow::Result;

pub use capabilities::CapabilitiesHandler;
pub use config::ConfigHandler;
pub use send::SendHandler;

/// Routes parsed commands to their handlers
pub struct CommandHandler {
    context: CliContext,
}

impl CommandHandler {
    pub fn new(context: CliContext) -> Self {
        Self { context }
    }

    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Send(args) => SendHandler::new(&self.context).handle(args).await,
            Commands::Capabilities { json } => {
                CapabilitiesHandler::new(&self.context).handle(json).await
            }
            Commands::Config { action } => ConfigHandler::new(&self.context).handle(action),
        }
    }
}
