//! Podcast API client.
//!
//! Every public loader degrades instead of failing: transport errors and
//! unexpected response shapes are logged and turned into empty results, so
//! a flaky backend can never take the UI down.  No request carries a
//! timeout; a hung call simply keeps its loading token in flight.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, warn};

use cast_proto::protocol::Episode;

/// One directory card, as listed by `GET /podcasts`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Podcast {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub image: String,
    /// Set by the backend when its episode copy is stale; opening such a
    /// podcast triggers a background update.
    pub needs_update: bool,
}

#[derive(Clone)]
pub struct PodcastApi {
    client: reqwest::Client,
    base_url: String,
}

impl PodcastApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the episode list for a podcast.  Never fails: any transport or
    /// shape error yields an empty list.
    pub async fn load_episodes(&self, podcast_id: &str) -> Vec<Episode> {
        debug!("fetching episodes for podcast {}", podcast_id);
        match self.fetch_episodes(podcast_id).await {
            Ok(episodes) => episodes,
            Err(e) => {
                error!("error loading episodes for podcast {}: {:#}", podcast_id, e);
                Vec::new()
            }
        }
    }

    async fn fetch_episodes(&self, podcast_id: &str) -> Result<Vec<Episode>> {
        let url = format!("{}/api/podcast/{}/episodes", self.base_url, podcast_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to fetch episode list")?;

        if !response.status().is_success() {
            anyhow::bail!("episode list returned status: {}", response.status());
        }

        let body: Value = response
            .json()
            .await
            .context("failed to parse episode list response")?;

        Ok(parse_episodes(&body))
    }

    /// Fetch the directory listing.  Same degradation contract as
    /// [`load_episodes`](Self::load_episodes).
    pub async fn load_podcasts(&self) -> Vec<Podcast> {
        match self.fetch_podcasts().await {
            Ok(podcasts) => podcasts,
            Err(e) => {
                error!("error loading podcast directory: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_podcasts(&self) -> Result<Vec<Podcast>> {
        let url = format!("{}/podcasts", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to fetch podcast directory")?;

        if !response.status().is_success() {
            anyhow::bail!("podcast directory returned status: {}", response.status());
        }

        let body: Value = response
            .json()
            .await
            .context("failed to parse podcast directory response")?;

        Ok(parse_podcasts(&body))
    }

    /// Fetch one episode's description fragment.  `Ok(None)` means the
    /// episode has none.
    pub async fn fetch_description(
        &self,
        podcast_id: &str,
        episode_id: &str,
    ) -> Result<Option<String>> {
        let url = format!(
            "{}/api/podcast/{}/episode/{}/description",
            self.base_url, podcast_id, episode_id
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to fetch episode description")?;

        if !response.status().is_success() {
            anyhow::bail!("description returned status: {}", response.status());
        }

        let body: Value = response
            .json()
            .await
            .context("failed to parse description response")?;

        Ok(body
            .get("content_html")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    /// Re-fetch a single episode server-side.
    pub async fn refresh_episode(&self, podcast_id: &str, episode_id: &str) -> Result<()> {
        let url = format!(
            "{}/api/podcast/{}/episode/{}/refresh",
            self.base_url, podcast_id, episode_id
        );
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("failed to refresh episode")?;

        if !response.status().is_success() {
            anyhow::bail!("episode refresh returned status: {}", response.status());
        }
        Ok(())
    }

    /// Trigger a server-side episode update for a stale podcast.
    pub async fn update_podcast(&self, podcast_id: &str) -> Result<bool> {
        let url = format!("{}/api/podcast/{}/update", self.base_url, podcast_id);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("failed to update podcast")?;

        if !response.status().is_success() {
            anyhow::bail!("podcast update returned status: {}", response.status());
        }

        let body: Value = response
            .json()
            .await
            .context("failed to parse update response")?;

        Ok(body.get("success").and_then(|v| v.as_bool()).unwrap_or(false))
    }

    /// Legacy single-episode endpoint; superseded by list + index 0 but kept
    /// as the fallback when the list comes back empty.
    pub async fn last_episode_url(&self, podcast_id: &str) -> Option<String> {
        let url = format!("{}/api/podcast/{}/last", self.base_url, podcast_id);
        let response = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!("last-episode endpoint returned status: {}", r.status());
                return None;
            }
            Err(e) => {
                warn!("error fetching last episode url: {}", e);
                return None;
            }
        };

        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("error parsing last episode response: {}", e);
                return None;
            }
        };

        audio_url_of(&body)
    }
}

/// Parse an episode-list payload.  Tolerates `data` being an array or a
/// keyed object, drops malformed entries, normalizes dates, and sorts most
/// recent first.  Never fails — worst case is an empty list.
pub fn parse_episodes(body: &Value) -> Vec<Episode> {
    let raw: Vec<&Value> = match body.get("data") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => {
            warn!("episode payload has no usable 'data' field");
            return Vec::new();
        }
    };

    let mut episodes: Vec<Episode> = raw.into_iter().filter_map(parse_episode).collect();
    if episodes.is_empty() {
        warn!("no valid episodes in payload");
    }

    episodes.sort_by(|a, b| b.date.cmp(&a.date));
    episodes
}

fn parse_episode(value: &Value) -> Option<Episode> {
    if !value.is_object() {
        return None;
    }

    let title = value.get("title")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }

    let audio_url = audio_url_of(value)?;

    Some(Episode {
        title: title.to_string(),
        date: parse_date(value.get("date")),
        audio_url,
        ilpost_id: id_string(value.get("ilpost_id")),
        duration_secs: value
            .get("duration")
            .and_then(|v| v.as_u64())
            .map(|d| d as u32),
    })
}

/// Canonical media URL: `episode_raw_url` wins, `audio_url` is the fallback.
fn audio_url_of(value: &Value) -> Option<String> {
    for key in ["episode_raw_url", "audio_url"] {
        if let Some(url) = value.get(key).and_then(|v| v.as_str()) {
            if !url.trim().is_empty() {
                return Some(url.trim().to_string());
            }
        }
    }
    None
}

/// Normalize the upstream date field.  Unparseable values pin the episode to
/// the epoch so it sorts last instead of being dropped.
fn parse_date(value: Option<&Value>) -> DateTime<Utc> {
    let epoch = DateTime::<Utc>::UNIX_EPOCH;
    let Some(raw) = value.and_then(|v| v.as_str()) else {
        warn!("episode date missing, pinning to epoch");
        return epoch;
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return parsed.and_utc();
        }
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = parsed.and_hms_opt(0, 0, 0) {
            return midnight.and_utc();
        }
    }

    warn!("unparseable episode date '{}', pinning to epoch", raw);
    epoch
}

fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a directory payload with the same tolerance rules as episodes.
pub fn parse_podcasts(body: &Value) -> Vec<Podcast> {
    let raw: Vec<&Value> = match body.get("data") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => {
            warn!("podcast payload has no usable 'data' field");
            return Vec::new();
        }
    };

    raw.into_iter()
        .filter_map(|value| {
            let id = id_string(value.get("id"))?;
            let title = value.get("title")?.as_str()?.trim();
            if title.is_empty() {
                return None;
            }
            Some(Podcast {
                id,
                title: title.to_string(),
                author: text_field(value, "author"),
                description: text_field(value, "description"),
                image: text_field(value, "image"),
                needs_update: value
                    .get("needs_update")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            })
        })
        .collect()
}

fn text_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_payload_with_malformed_entries() {
        let body = json!({
            "data": [
                { "title": "Good", "audio_url": "https://a/1.mp3", "date": "2024-03-01T06:00:00Z" },
                { "title": "", "audio_url": "https://a/2.mp3" },
                { "title": "No url" },
                { "title": "Raw wins", "episode_raw_url": "https://a/raw.mp3",
                  "audio_url": "https://a/fallback.mp3", "date": "2024-03-02T06:00:00Z" },
                42,
                null
            ]
        });
        let episodes = parse_episodes(&body);
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].title, "Raw wins");
        assert_eq!(episodes[0].audio_url, "https://a/raw.mp3");
        assert_eq!(episodes[1].title, "Good");
    }

    #[test]
    fn keyed_object_payload_is_coerced() {
        let body = json!({
            "data": {
                "a": { "title": "One", "audio_url": "https://a/1.mp3", "date": "2024-01-01" },
                "b": { "title": "Two", "audio_url": "https://a/2.mp3", "date": "2024-02-01" },
                "c": { "junk": true }
            }
        });
        let episodes = parse_episodes(&body);
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].title, "Two");
    }

    #[test]
    fn sorted_descending_regardless_of_input_order() {
        let body = json!({
            "data": [
                { "title": "d2", "audio_url": "u", "date": "2024-02-01T00:00:00Z" },
                { "title": "d3", "audio_url": "u", "date": "2024-01-01T00:00:00Z" },
                { "title": "d1", "audio_url": "u", "date": "2024-03-01T00:00:00Z" }
            ]
        });
        let titles: Vec<String> = parse_episodes(&body).into_iter().map(|e| e.title).collect();
        assert_eq!(titles, ["d1", "d2", "d3"]);
    }

    #[test]
    fn malformed_payloads_yield_empty_never_panic() {
        for body in [
            json!(null),
            json!("nope"),
            json!({}),
            json!({ "data": null }),
            json!({ "data": "nope" }),
            json!({ "data": [] }),
        ] {
            assert!(parse_episodes(&body).is_empty());
        }
    }

    #[test]
    fn unparseable_dates_sort_last() {
        let body = json!({
            "data": [
                { "title": "undated", "audio_url": "u", "date": "next tuesday" },
                { "title": "dated", "audio_url": "u", "date": "2024-03-01 06:00:00" }
            ]
        });
        let episodes = parse_episodes(&body);
        assert_eq!(episodes[0].title, "dated");
        assert_eq!(episodes[1].date, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn date_formats_tolerated() {
        assert_ne!(
            parse_date(Some(&json!("2024-03-01T06:00:00+02:00"))),
            DateTime::<Utc>::UNIX_EPOCH
        );
        assert_ne!(
            parse_date(Some(&json!("2024-03-01T06:00:00.250"))),
            DateTime::<Utc>::UNIX_EPOCH
        );
        assert_ne!(
            parse_date(Some(&json!("2024-03-01"))),
            DateTime::<Utc>::UNIX_EPOCH
        );
        assert_eq!(parse_date(None), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn numeric_ids_become_strings() {
        let body = json!({
            "data": [
                { "id": 7, "title": "Seven", "author": "A" },
                { "id": "8", "title": "Eight", "needs_update": true },
                { "title": "No id" }
            ]
        });
        let podcasts = parse_podcasts(&body);
        assert_eq!(podcasts.len(), 2);
        assert_eq!(podcasts[0].id, "7");
        assert_eq!(podcasts[0].author, "A");
        assert!(!podcasts[0].needs_update);
        assert!(podcasts[1].needs_update);
    }

    #[test]
    fn episode_numeric_ilpost_id() {
        let body = json!({
            "data": [
                { "title": "t", "audio_url": "u", "ilpost_id": 991, "duration": 1800 }
            ]
        });
        let episodes = parse_episodes(&body);
        assert_eq!(episodes[0].ilpost_id.as_deref(), Some("991"));
        assert_eq!(episodes[0].duration_secs, Some(1800));
    }
}
