//! Thin async wrapper around the `git` CLI.

use std::path::Path;

use tokio::process::Command;
use tracing::trace;

use sietsemap_shared::{Result, SietsemapError};

/// Run `git <args>` in `repo` and return trimmed stdout.
pub(crate) async fn run(repo: &Path, args: &[&str]) -> Result<String> {
    run_labeled(repo, args, &format!("git {}", args.join(" ")), &[]).await
}

/// Run git with an explicit label for errors, redacting `secrets` from stderr.
///
/// Used when `args` carry a credential that must not be echoed.
pub(crate) async fn run_labeled(
    repo: &Path,
    args: &[&str],
    label: &str,
    secrets: &[&str],
) -> Result<String> {
    trace!(command = label, "running git");

    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .await
        .map_err(|e| SietsemapError::git(label, format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SietsemapError::git(label, redact(stderr.trim(), secrets)));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

/// Replace every occurrence of each non-empty secret with `***`.
fn redact(text: &str, secrets: &[&str]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(text.to_string(), |acc, secret| acc.replace(secret, "***"))
}
