//! Downloading the weekly export to a local file.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::{debug, info};

/// Outcome of [`ensure_local_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// GETs `url` and returns the body.
///
/// # Errors
///
/// Fails on transport errors and on any non-success HTTP status.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        bail!("GET {url} returned status {status}");
    }
    Ok(resp.bytes().await?.to_vec())
}

/// Makes sure the export exists at `path`, downloading it from `url` if not.
///
/// The body is written to a sibling `.part` file and renamed into place, so
/// an interrupted download never leaves a file that looks complete.
#[tracing::instrument(skip(client, path), fields(path = %path.display()))]
pub async fn ensure_local_file<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    path: &Path,
) -> Result<Acquisition> {
    if path.exists() {
        debug!("Export already on disk, skipping download");
        return Ok(Acquisition::AlreadyPresent);
    }

    info!(url, "Downloading export");
    let bytes = fetch_bytes(client, url)
        .await
        .with_context(|| format!("could not download {url}"))?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("could not create {}", dir.display()))?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    write_then_rename(Path::new(&partial), path, &bytes).await?;

    let bytes = bytes.len() as u64;
    info!(bytes, "Export downloaded");
    Ok(Acquisition::Downloaded { bytes })
}

/// Writes `bytes` to `partial` and moves it to `path`, removing `partial`
/// again if either step fails.
async fn write_then_rename(partial: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let result: Result<()> = async {
        tokio::fs::write(partial, bytes)
            .await
            .with_context(|| format!("could not write {}", partial.display()))?;
        tokio::fs::rename(partial, path)
            .await
            .with_context(|| format!("could not move download to {}", path.display()))
    }
    .await;

    if result.is_err() {
        tokio::fs::remove_file(partial).await.ok();
    }
    result
}
