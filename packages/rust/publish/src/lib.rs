//! Commit-and-push of rebuilt outputs.
//!
//! After a build, the cache and map are committed back to the repository
//! with a date-stamped message and pushed. A clean tree is a no-op: nothing
//! is staged, committed, or pushed.

mod git;

use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, instrument};
use url::Url;

use sietsemap_shared::{AppConfig, Result, SietsemapError};

// ---------------------------------------------------------------------------
// Options & outcome
// ---------------------------------------------------------------------------

/// Runtime publish configuration, merged from config + env + CLI flags.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Remote name to push to.
    pub remote: String,
    /// Push token, if one was found in the environment.
    pub token: Option<String>,
    /// Commit message prefix; the date is appended.
    pub message_prefix: String,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    /// Paths (relative to the repo) that are staged and checked for changes.
    pub paths: Vec<String>,
    /// Whether to push after committing.
    pub push: bool,
}

impl PublishOptions {
    /// Build options from config, reading the token from `publish.token_env`.
    pub fn from_config(config: &AppConfig) -> Self {
        let token = std::env::var(&config.publish.token_env)
            .ok()
            .filter(|t| !t.is_empty());

        Self {
            remote: config.publish.remote.clone(),
            token,
            message_prefix: config.publish.message_prefix.clone(),
            author_name: config.publish.author_name.clone(),
            author_email: config.publish.author_email.clone(),
            paths: config.publish_paths(),
            push: true,
        }
    }
}

/// What the publish step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Working tree was clean for the tracked paths.
    NoChanges,
    /// Exactly one commit was created.
    Committed { message: String, pushed: bool },
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Commit message for a given UTC date.
pub fn commit_message(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix} {}", date.format("%Y-%m-%d"))
}

/// Whether any of `paths` has uncommitted changes (including untracked files).
pub async fn has_changes(repo: &Path, paths: &[String]) -> Result<bool> {
    Ok(!changed_paths(repo, paths).await?.is_empty())
}

/// Commit and push changes to `opts.paths`, or do nothing if they are clean.
#[instrument(skip_all, fields(repo = %repo.display(), remote = %opts.remote))]
pub async fn publish(repo: &Path, opts: &PublishOptions, today: NaiveDate) -> Result<PublishOutcome> {
    if opts.paths.is_empty() {
        return Err(SietsemapError::validation("no paths configured for publish"));
    }

    let changed = changed_paths(repo, &opts.paths).await?;
    if changed.is_empty() {
        info!("no changes to commit");
        return Ok(PublishOutcome::NoChanges);
    }

    let mut add_args = vec!["add", "-A", "--"];
    add_args.extend(changed.iter().map(String::as_str));
    git::run(repo, &add_args).await?;

    let message = commit_message(&opts.message_prefix, today);
    commit(repo, opts, &message, &changed).await?;
    info!(%message, paths = ?changed, "committed");

    let pushed = if opts.push {
        push(repo, opts).await?;
        true
    } else {
        false
    };

    Ok(PublishOutcome::Committed { message, pushed })
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The subset of `paths` with pending changes, in input order.
async fn changed_paths(repo: &Path, paths: &[String]) -> Result<Vec<String>> {
    let mut changed = Vec::new();
    for path in paths {
        let status = git::run(repo, &["status", "--porcelain", "--", path]).await?;
        if !status.trim().is_empty() {
            changed.push(path.clone());
        }
    }
    Ok(changed)
}

async fn commit(repo: &Path, opts: &PublishOptions, message: &str, paths: &[String]) -> Result<()> {
    let name_cfg = opts.author_name.as_ref().map(|n| format!("user.name={n}"));
    let email_cfg = opts.author_email.as_ref().map(|e| format!("user.email={e}"));

    let mut args: Vec<&str> = Vec::new();
    for cfg in [&name_cfg, &email_cfg].into_iter().flatten() {
        args.push("-c");
        args.push(cfg);
    }
    args.extend(["commit", "-m", message, "--"]);
    args.extend(paths.iter().map(String::as_str));

    git::run(repo, &args).await?;
    Ok(())
}

async fn push(repo: &Path, opts: &PublishOptions) -> Result<()> {
    let label = format!("git push {} HEAD", opts.remote);

    let authed = match opts.token.as_deref() {
        Some(token) => {
            let remote_url = git::run(repo, &["remote", "get-url", &opts.remote]).await?;
            authenticated_url(&remote_url, token).map(|url| (url, token))
        }
        None => None,
    };

    match authed {
        Some((url, token)) => {
            // git may echo the URL, where the token appears percent-encoded.
            let encoded = Url::parse(&url)
                .ok()
                .and_then(|u| u.password().map(str::to_string));
            let mut secrets = vec![token];
            secrets.extend(encoded.as_deref());

            git::run_labeled(repo, &["push", &url, "HEAD"], &label, &secrets).await?;
        }
        None => {
            git::run_labeled(repo, &["push", &opts.remote, "HEAD"], &label, &[]).await?;
        }
    }

    info!(remote = %opts.remote, "pushed");
    Ok(())
}

/// Inject `x-access-token:<token>` userinfo into an https remote URL.
///
/// Returns `None` for non-https remotes (ssh, local paths), which are pushed
/// as-is.
pub fn authenticated_url(remote_url: &str, token: &str) -> Option<String> {
    let mut url = Url::parse(remote_url.trim()).ok()?;
    if url.scheme() != "https" {
        return None;
    }
    url.set_username("x-access-token").ok()?;
    url.set_password(Some(token)).ok()?;
    Some(url.to_string())
}
