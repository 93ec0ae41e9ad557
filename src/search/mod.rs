//! Query matching and result ranking.
//!
//! Matching is case-insensitive substring containment over exactly two
//! searchable surfaces: episode titles and anchor link texts extracted from
//! show-note HTML. Note titles, note free text and bare URLs are not
//! searched. Match flags and highlight metadata are recomputed per request
//! and never stored.

use crate::database::{Database, Highlight, MatchedShowNote, SearchResult};
use crate::error::AppError;
use crate::extract::extract_links;

/// How many episodes an empty-query search returns.
const LATEST_DEFAULT_LIMIT: i64 = 10;

/// Searches the whole episode corpus for a query.
///
/// An empty or whitespace-only query is a distinct mode: it returns the
/// latest episodes with no highlighting, not a match-everything search.
pub fn search_episodes(db: &Database, query: &str) -> Result<Vec<SearchResult>, AppError> {
    if query.trim().is_empty() {
        return latest_episodes(db, LATEST_DEFAULT_LIMIT, 0);
    }

    let normalized = query.to_lowercase();
    let mut results = Vec::new();

    for episode in db.get_episodes()? {
        let notes = db.get_show_notes(episode.id)?;
        let title_match = episode.title.to_lowercase().contains(&normalized);

        // Anchor-only link texts, per note, in encounter order.
        let note_link_texts: Vec<Vec<String>> = notes
            .iter()
            .map(|note| {
                extract_links(&note.content)
                    .into_iter()
                    .map(|link| link.text)
                    .collect()
            })
            .collect();

        let mut matched_link_texts: Vec<String> = Vec::new();
        for texts in &note_link_texts {
            for text in texts {
                if text.to_lowercase().contains(&normalized)
                    && !matched_link_texts.contains(text)
                {
                    matched_link_texts.push(text.clone());
                }
            }
        }

        if !title_match && matched_link_texts.is_empty() {
            continue;
        }

        let show_notes = notes
            .into_iter()
            .zip(&note_link_texts)
            .map(|(note, texts)| MatchedShowNote {
                matched: texts.iter().any(|t| matched_link_texts.contains(t)),
                note,
            })
            .collect();

        results.push(SearchResult {
            episode,
            show_notes,
            highlighted: Highlight {
                episode_title: title_match,
                link_texts: matched_link_texts,
                query: query.to_string(),
            },
        });
    }

    rank(&mut results);
    tracing::info!("Search \"{}\" matched {} episodes", query, results.len());
    Ok(results)
}

/// Orders results strictly descending by publication date. The sort is
/// stable; ties keep their incoming order.
pub fn rank(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.episode.publication_date.cmp(&a.episode.publication_date));
}

/// The most recent episodes as unhighlighted results, date-descending,
/// plain offset/limit page. Sorting and slicing happen in the store
/// (`ORDER BY publication_date DESC LIMIT ? OFFSET ?`).
pub fn latest_episodes(
    db: &Database,
    limit: i64,
    offset: i64,
) -> Result<Vec<SearchResult>, AppError> {
    let episodes = db.latest_episodes(limit, offset)?;
    episodes
        .into_iter()
        .map(|episode| {
            let show_notes = db
                .get_show_notes(episode.id)?
                .into_iter()
                .map(|note| MatchedShowNote {
                    note,
                    matched: false,
                })
                .collect();
            Ok(SearchResult {
                episode,
                show_notes,
                highlighted: Highlight::default(),
            })
        })
        .collect()
}
