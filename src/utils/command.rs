/// Checks for external tools the service depends on at runtime
use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;

/// Check if a command-line tool is installed
pub async fn check_tool_installed(
    tool_name: &str,
    version_args: &[&str],
    install_url: &str,
) -> Result<()> {
    let output = Command::new(tool_name)
        .args(version_args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match output {
        Ok(status) if status.success() => Ok(()),
        _ => anyhow::bail!(
            "{} is not installed or not in PATH. Please install from {}",
            tool_name,
            install_url
        ),
    }
}

/// Check that the exec credential command used in generated kubeconfigs is available
pub async fn check_token_command(token_command: &str) -> Result<()> {
    check_tool_installed(
        token_command,
        &["--version"],
        "https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html",
    )
    .await
    .with_context(|| format!("{} is required to mint cluster tokens", token_command))
}
