//! Open the frontend in the user's browser

use std::process::Stdio;
use tokio::process::Command;

use crate::error::WebError;

/// Launch the platform's default browser on `url`
pub async fn open_in_browser(url: &str) -> Result<(), WebError> {
    let mut command = browser_command(url);

    let status = command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| WebError::Browser(format!("{}: {}", url, e)))?;

    if status.success() {
        tracing::debug!("Opened {} in browser", url);
        Ok(())
    } else {
        Err(WebError::Browser(format!("{}: launcher exited with {}", url, status)))
    }
}

#[cfg(target_os = "windows")]
fn browser_command(url: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/c", "start", url]);
    command
}

#[cfg(target_os = "macos")]
fn browser_command(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn browser_command(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}
