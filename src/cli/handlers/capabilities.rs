//! `capabilities`: ask the daemon what it supports

use super::super::CliContext;
use crate::bus::dbus::fetch_capabilities;
use anyhow::{Context, Result};
use std::time::Duration;

pub struct CapabilitiesHandler<'a> {
    context: &'a CliContext,
}

impl<'a> CapabilitiesHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub async fn handle(&self, json: bool) -> Result<()> {
        let timeout = Duration::from_millis(self.context.config_manager.config().bus.call_timeout_ms);
        let mut capabilities = fetch_capabilities(timeout)
            .await
            .context("Failed to query the notification daemon")?;
        capabilities.sort();

        if json {
            println!("{}", serde_json::to_string(&capabilities)?);
        } else {
            for capability in capabilities {
                println!("{capability}");
            }
        }
        Ok(())
    }
}
