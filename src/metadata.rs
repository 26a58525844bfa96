#![forbid(unsafe_code)]

//! Remote metadata lookup with a deterministic local fallback.
//!
//! The resolver never fails outward: whatever goes wrong on the wire, the
//! caller always receives a fully populated [`VideoMetadata`]. Freshness is
//! traded for availability, so there are no retries either; a single failed
//! call degrades straight to the fallback values.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::warn;

use crate::config::ApiCredential;
use crate::validate::VideoId;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

pub const FALLBACK_TITLE: &str = "Video";
pub const FALLBACK_CHANNEL: &str = "Unknown Channel";

/// Title, channel and thumbnail for one video. Always fully populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub channel_title: String,
    pub thumbnail_url: String,
}

impl VideoMetadata {
    /// Deterministic substitute used whenever the remote lookup is
    /// unavailable, disabled, or returns nothing usable.
    pub fn fallback(id: &VideoId) -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            channel_title: FALLBACK_CHANNEL.to_string(),
            thumbnail_url: fallback_thumbnail_url(id),
        }
    }
}

/// Max-resolution thumbnail URL derived from the id alone; works without any
/// API access.
pub fn fallback_thumbnail_url(id: &VideoId) -> String {
    format!("https://img.youtube.com/vi/{id}/maxresdefault.jpg")
}

// Wire shape of the provider response:
// {items:[{snippet:{title, channelTitle, thumbnails:{maxres?,high?}}}]}
#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    channel_title: String,
    #[serde(default)]
    thumbnails: ThumbnailSet,
}

#[derive(Debug, Default, Deserialize)]
struct ThumbnailSet {
    maxres: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// Resolves metadata for validated video ids.
///
/// Constructed once at startup with the configured credential and shared
/// across requests; it holds no mutable state. The lookup is blocking (ureq),
/// so callers on the async runtime wrap [`Resolver::resolve`] in
/// `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct Resolver {
    credential: ApiCredential,
    api_base: String,
}

impl Resolver {
    pub fn new(credential: ApiCredential) -> Self {
        Self {
            credential,
            api_base: API_BASE.to_string(),
        }
    }

    /// Points the resolver at a different endpoint; used by tests to simulate
    /// an unreachable provider.
    #[cfg(test)]
    fn with_api_base(credential: ApiCredential, api_base: impl Into<String>) -> Self {
        Self {
            credential,
            api_base: api_base.into(),
        }
    }

    /// Never fails: without a usable credential this is a pure function of
    /// the id; with one it makes a single remote call and falls back on any
    /// error.
    pub fn resolve(&self, id: &VideoId) -> VideoMetadata {
        let Some(key) = self.credential.key() else {
            return VideoMetadata::fallback(id);
        };
        match self.lookup(id, key) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(video_id = %id, error = %err, "metadata lookup failed, serving fallback");
                VideoMetadata::fallback(id)
            }
        }
    }

    fn lookup(&self, id: &VideoId, key: &str) -> Result<VideoMetadata> {
        let url = format!(
            "{}/videos?id={}&key={}&part=snippet",
            self.api_base, id, key
        );
        let response: VideoListResponse = ureq::get(&url)
            .timeout(LOOKUP_TIMEOUT)
            .call()
            .context("querying metadata provider")?
            .into_json()
            .context("decoding metadata response")?;
        metadata_from_response(response, id)
    }
}

fn metadata_from_response(response: VideoListResponse, id: &VideoId) -> Result<VideoMetadata> {
    let item = response
        .items
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no metadata record for {id}"))?;
    let snippet = item.snippet;
    let thumbnail_url = snippet
        .thumbnails
        .maxres
        .or(snippet.thumbnails.high)
        .map(|thumbnail| thumbnail.url)
        .unwrap_or_else(|| fallback_thumbnail_url(id));
    Ok(VideoMetadata {
        title: snippet.title,
        channel_title: snippet.channel_title,
        thumbnail_url,
    })
}
