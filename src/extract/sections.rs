use regex::Regex;
use std::sync::OnceLock;

/// One titled sub-section of an episode description, before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub content: String,
    /// First "H:MM:SS" token found in the content, if any.
    pub timestamp: Option<String>,
}

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,2}:\d{2}:\d{2}").unwrap())
}

/// Splits an episode's HTML description into titled show-note sections.
///
/// The section marker is the literal `<h2>` opening tag. Whatever precedes
/// the first heading is discarded, as are fragments with no closing
/// `</h2>` (untitled) or no trimmed text. Emission order follows
/// appearance order.
pub fn sectionize(description_html: &str) -> Vec<Section> {
    let mut sections = Vec::new();

    for fragment in description_html.split("<h2>") {
        if fragment.trim().is_empty() {
            continue;
        }
        // No closing tag means this is the pre-heading prefix or a
        // malformed heading; either way there is no title to emit.
        let Some(end) = fragment.find("</h2>") else {
            continue;
        };

        let title = fragment[..end].trim();
        if title.is_empty() {
            continue;
        }
        let content = fragment[end + "</h2>".len()..].trim();

        let timestamp = timestamp_regex()
            .find(content)
            .map(|m| m.as_str().to_string());

        sections.push(Section {
            title: title.to_string(),
            content: content.to_string(),
            timestamp,
        });
    }

    sections
}
