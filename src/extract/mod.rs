//! Regex-based extraction of structured data from loosely-formed episode
//! HTML. Deliberately not a full HTML parser; callers only see the
//! [`links`] and [`sections`] interfaces, so a real parser could be swapped
//! in without touching them.

pub mod links;
pub mod sections;

pub use links::{extract_links, extract_links_with_bare_urls};
pub use sections::{sectionize, Section};
