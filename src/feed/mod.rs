//! Feed fetch and episode ingestion.
//!
//! A refresh cycle is: fetch the RSS feed (any non-success status aborts the
//! whole cycle), ingest every unseen item, then run the number repair pass.
//! Cycles are rate-limited by [`RefreshCache`]; the episode guid makes
//! ingestion idempotent at episode granularity (show notes of an
//! already-seen episode are never re-synced).

use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::database::{Database, NewEpisode, NewShowNote};
use crate::error::AppError;
use crate::extract::sectionize;

/// Fetches the raw RSS XML. Non-success HTTP status is a [`AppError::Fetch`].
pub async fn fetch_feed(url: &str) -> Result<String, AppError> {
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Fetch(format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status")
        )));
    }
    Ok(response.text().await?)
}

/// Derives the display number from an episode title.
///
/// A leading `"123."` prefix wins over a `"#123"` token anywhere in the
/// title; neither pattern leaves the number unset for the repair pass.
pub fn derive_episode_number(title: &str) -> Option<String> {
    static DOT: OnceLock<Regex> = OnceLock::new();
    static HASH: OnceLock<Regex> = OnceLock::new();
    let dot = DOT.get_or_init(|| Regex::new(r"^(\d+)\.").unwrap());
    let hash = HASH.get_or_init(|| Regex::new(r"#(\d+)").unwrap());

    if let Some(caps) = dot.captures(title) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = hash.captures(title) {
        return Some(caps[1].to_string());
    }
    None
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Parses feed XML and ingests every item not yet in the store.
///
/// Returns the number of newly created episodes. Already-seen guids are
/// skipped entirely.
pub fn ingest_feed(db: &Database, xml: &str, config: &Config) -> Result<usize, AppError> {
    let feed = feed_rs::parser::parse(xml.as_bytes())?;
    tracing::info!("Parsed {} entries from RSS feed", feed.entries.len());

    let mut created = 0usize;
    let mut notes_created = 0usize;

    for entry in feed.entries {
        let guid = entry.id.clone();
        if db.get_episode_by_guid(&guid)?.is_some() {
            continue;
        }

        let title = entry.title.map(|t| t.content).unwrap_or_default();
        let description = entry.summary.map(|s| s.content).unwrap_or_default();
        let number = derive_episode_number(&title);

        let audio_url = entry
            .media
            .first()
            .and_then(|m| m.content.first())
            .and_then(|c| c.url.as_ref())
            .map(|u| u.to_string())
            .or_else(|| {
                entry
                    .links
                    .iter()
                    .find(|l| l.media_type.as_deref() == Some("audio/mpeg"))
                    .map(|l| l.href.clone())
            })
            .unwrap_or_default();

        let duration = entry
            .media
            .first()
            .and_then(|m| m.content.first())
            .and_then(|c| c.duration)
            .map(format_duration)
            .unwrap_or_default();

        let url = entry
            .links
            .iter()
            .find(|l| l.media_type.is_none())
            .map(|l| l.href.clone())
            .unwrap_or_else(|| {
                format!(
                    "{}/{}",
                    config.episode_url_base,
                    number.as_deref().unwrap_or_default()
                )
            });

        let tags: Vec<String> = entry.categories.iter().map(|c| c.term.clone()).collect();

        let episode = db.create_episode(&NewEpisode {
            guid,
            number,
            title,
            description: description.clone(),
            audio_url,
            publication_date: entry.published.unwrap_or_else(Utc::now),
            duration,
            url,
            tags,
        })?;
        created += 1;

        // Episode row and its notes are separate inserts; a crash between
        // them leaves a partial episode that the guid check will not revisit.
        for section in sectionize(&description) {
            db.create_show_note(&NewShowNote {
                title: section.title,
                content: section.content,
                timestamp: section.timestamp,
                episode_id: episode.id,
            })?;
            notes_created += 1;
        }
    }

    tracing::info!(
        "Ingest complete: {} new episodes, {} show notes",
        created,
        notes_created
    );
    Ok(created)
}

/// Back-fills the display number of any stored episode lacking one: re-scan
/// the title first, fall back to the generated episode id as a last-resort
/// label. Returns how many episodes were repaired.
pub fn repair_episode_numbers(db: &Database) -> Result<usize, AppError> {
    let missing = db.episodes_missing_number()?;
    if missing.is_empty() {
        return Ok(0);
    }
    tracing::warn!("{} episodes have no episode number, repairing", missing.len());

    let mut repaired = 0usize;
    for episode in missing {
        let number = match derive_episode_number(&episode.title) {
            Some(n) => n,
            None => {
                tracing::warn!(
                    "No number in title of episode {}, using its id as label",
                    episode.id
                );
                episode.id.to_string()
            }
        };
        db.update_episode_number(episode.id, &number)?;
        repaired += 1;
    }
    Ok(repaired)
}

/// Timestamped guard against hammering the upstream feed.
///
/// A refresh inside the TTL window is short-circuited by the caller. Held
/// behind an async mutex in server state, which also serializes concurrent
/// refresh cycles.
pub struct RefreshCache {
    last_fetch: Option<Instant>,
    ttl: Duration,
}

impl RefreshCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            last_fetch: None,
            ttl,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.last_fetch
            .map(|t| t.elapsed() < self.ttl)
            .unwrap_or(false)
    }

    pub fn mark_fetched(&mut self) {
        self.last_fetch = Some(Instant::now());
    }
}

/// Outcome of one refresh request.
pub struct RefreshOutcome {
    /// Newly ingested episodes (0 when the cache short-circuited).
    pub created: usize,
    /// Total episodes in the store after the cycle.
    pub episode_count: i64,
    /// True when the TTL window made this refresh a no-op.
    pub skipped: bool,
}

/// Runs one full refresh cycle through the cache guard.
///
/// On [`AppError::Fetch`] nothing is ingested and the cache timestamp is
/// left untouched, so the next request retries immediately.
pub async fn run_refresh(
    db: &Database,
    config: &Config,
    cache: &tokio::sync::Mutex<RefreshCache>,
) -> Result<RefreshOutcome, AppError> {
    let mut cache = cache.lock().await;
    if cache.is_fresh() {
        return Ok(RefreshOutcome {
            created: 0,
            episode_count: db.episode_count()?,
            skipped: true,
        });
    }

    tracing::info!("Fetching RSS from: {}", config.feed_url);
    let xml = fetch_feed(&config.feed_url).await?;
    let created = ingest_feed(db, &xml, config)?;
    repair_episode_numbers(db)?;
    cache.mark_fetched();

    Ok(RefreshOutcome {
        created,
        episode_count: db.episode_count()?,
        skipped: false,
    })
}
