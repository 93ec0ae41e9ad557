use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One podcast episode, created once per distinct feed `guid`.
///
/// Immutable after creation except for `number`, which may be back-filled
/// by the repair pass when the title carried no recognizable episode number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: i64,
    /// Stable feed identifier, unique across the store.
    pub guid: String,
    /// Display label ("123"). None until derived or repaired.
    pub number: Option<String>,
    pub title: String,
    /// Raw HTML description as it appeared in the feed item.
    pub description: String,
    pub audio_url: String,
    pub publication_date: DateTime<Utc>,
    pub duration: String,
    pub url: String,
    pub tags: Vec<String>,
}

/// A titled sub-section of an episode's description HTML.
///
/// Bulk-created while ingesting the owning episode, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowNote {
    pub id: i64,
    pub title: String,
    /// HTML fragment between this note's heading and the next.
    pub content: String,
    /// First "H:MM:SS" token found in the content, if any.
    pub timestamp: Option<String>,
    pub episode_id: i64,
}

/// Insert payload for [`Episode`]; the id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewEpisode {
    pub guid: String,
    pub number: Option<String>,
    pub title: String,
    pub description: String,
    pub audio_url: String,
    pub publication_date: DateTime<Utc>,
    pub duration: String,
    pub url: String,
    pub tags: Vec<String>,
}

/// Insert payload for [`ShowNote`].
#[derive(Debug, Clone)]
pub struct NewShowNote {
    pub title: String,
    pub content: String,
    pub timestamp: Option<String>,
    pub episode_id: i64,
}

/// A `(text, url)` pair pulled out of show-note HTML.
///
/// Ephemeral: derived on demand, never persisted. Within one extraction
/// pass entries are deduplicated by `url`, first occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedLink {
    pub text: String,
    pub url: String,
}

/// A show note annotated with its per-query match flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedShowNote {
    #[serde(flatten)]
    pub note: ShowNote,
    /// True iff this note's content carries an anchor whose link text
    /// matched the query. Always false on the latest-episodes path.
    pub matched: bool,
}

/// Which parts of a result matched the query, for presentation-side
/// highlighting. Query-relative, recomputed per request, never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub episode_title: bool,
    pub link_texts: Vec<String>,
    pub query: String,
}

/// One search hit: the episode, its notes with match flags, and the
/// highlight metadata. Response-only, not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub episode: Episode,
    pub show_notes: Vec<MatchedShowNote>,
    pub highlighted: Highlight,
}
