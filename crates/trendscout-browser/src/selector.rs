//! Ordered selector fallback.
//!
//! Target sites change their markup without notice, so every lookup is given
//! several candidate selectors and the first one that matches wins.

use scraper::{ElementRef, Html, Selector};

use crate::error::SessionError;

/// The outcome of a successful resolution.
#[derive(Debug)]
pub struct Resolved<'a> {
    /// The selector text that matched.
    pub candidate: String,
    /// Position of the winning candidate in the list.
    pub index: usize,
    pub elements: Vec<ElementRef<'a>>,
}

/// Try `candidates` in order against `doc` and return the first non-empty match.
///
/// Candidates that fail to parse as CSS are skipped.
///
/// # Errors
///
/// Returns [`SessionError::SelectorExhausted`] when no candidate matches.
pub fn resolve<'a>(doc: &'a Html, candidates: &[&str]) -> Result<Resolved<'a>, SessionError> {
    for (index, candidate) in candidates.iter().enumerate() {
        let Ok(selector) = Selector::parse(candidate) else {
            tracing::debug!(candidate, "skipping unparseable selector");
            continue;
        };
        let elements: Vec<ElementRef<'a>> = doc.select(&selector).collect();
        if !elements.is_empty() {
            if index > 0 {
                tracing::debug!(
                    candidate,
                    index,
                    matched = elements.len(),
                    "primary selector missed; fallback matched"
                );
            }
            return Ok(Resolved {
                candidate: (*candidate).to_string(),
                index,
                elements,
            });
        }
    }
    Err(SessionError::SelectorExhausted {
        tried: candidates.iter().map(|c| (*c).to_string()).collect(),
    })
}

/// First descendant of `element` matching any of `candidates`.
#[must_use]
pub fn first_within<'a>(element: ElementRef<'a>, candidates: &[&str]) -> Option<ElementRef<'a>> {
    candidates.iter().find_map(|candidate| {
        let selector = Selector::parse(candidate).ok()?;
        element.select(&selector).next()
    })
}

/// Whitespace-normalized text content of `element`.
#[must_use]
pub fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
