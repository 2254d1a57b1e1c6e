//! Per-event shell commands
//!
//! An event section may name a command to run whenever the event is raised.
//! `%e`, `%a`, `%s`, `%i` and `%w` expand to the event id, app name, text,
//! notification id and window id; every value is shell-quoted. `%%` is a
//! literal percent sign and unknown macros are left untouched.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::notification::Notification;

/// Quote a value for `sh`, wrapping it in single quotes
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:,=+@".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Expand the macros of `template` for one notification
pub fn expand_command(template: &str, notification: &Notification) -> String {
    let mut expanded = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            expanded.push(c);
            continue;
        }
        let value = match chars.peek() {
            Some('e') => shell_quote(&notification.event_id),
            Some('a') => shell_quote(&notification.app_name),
            Some('s') => shell_quote(&notification.text),
            Some('i') => notification.id.0.to_string(),
            // no window association
            Some('w') => "0".to_string(),
            Some('%') => "%".to_string(),
            _ => {
                expanded.push('%');
                continue;
            }
        };
        chars.next();
        expanded.push_str(&value);
    }

    expanded.trim().to_string()
}

/// Start `command` through `sh -c` without waiting for it.
///
/// The child is reaped by a background task; its exit status is only logged.
/// Must be called from within a tokio runtime.
pub fn spawn_command(command: &str) -> AppResult<()> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| AppError::process_with_source(command, e))?;

    let command = command.to_string();
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if status.success() => debug!("Command '{}' finished", command),
            Ok(status) => warn!("Command '{}' exited with {}", command, status),
            Err(e) => warn!("Failed to wait for '{}': {}", command, e),
        }
    });
    Ok(())
}

/// Expand and start the event command, logging any failure
pub fn run_event_command(template: &str, notification: &Notification) {
    let command = expand_command(template, notification);
    if command.is_empty() {
        return;
    }
    debug!("Running event command for {}: {}", notification.id, command);
    if let Err(e) = spawn_command(&command) {
        warn!(category = e.category(), "{}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationId;

    fn notification() -> Notification {
        Notification {
            id: NotificationId(42),
            ..Notification::new("build-done")
                .with_app_name("builder")
                .with_text("it's done")
        }
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "plain");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
    }

    #[test]
    fn test_expand_macros() {
        assert_eq!(
            expand_command("notify-log %a %e %i %w %s", &notification()),
            r"notify-log builder build-done 42 0 'it'\''s done'"
        );
    }

    #[test]
    fn test_literal_and_unknown_macros() {
        assert_eq!(expand_command("echo 100%% %x %", &notification()), "echo 100% %x %");
    }

    #[test]
    fn test_expansion_is_trimmed() {
        assert_eq!(expand_command("  true  ", &notification()), "true");
    }

    #[tokio::test]
    async fn test_spawn_command_runs_shell() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        spawn_command(&format!("touch {}", shell_quote(&marker.to_string_lossy()))).unwrap();

        for _ in 0..50 {
            if marker.exists() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("command did not run");
    }
}
