//! Materiality classification
//!
//! This module handles the optional language-model step:
//! - Fetching a bounded prefix of each filing's text
//! - Isolating the section for the tracked item
//! - Asking a [`Classifier`] for a three-way verdict
//!
//! The crawl only sees [`MaterialityAssessor`]; any classifier can be plugged in,
//! which keeps tests free of model calls.

mod chat;
mod text;

pub use chat::ChatClassifier;
pub use text::{filing_text_url, visible_text, FilingTextSource, HttpFilingTextSource};

use crate::record::Materiality;
use async_trait::async_trait;

/// A classifier's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Yes,
    No,
    Unclear,
}

impl Verdict {
    /// Maps the model's reply; anything but a bare `True`/`False` is unclear
    ///
    /// Only surrounding whitespace is ignored.
    pub fn from_reply(reply: &str) -> Self {
        match reply.trim() {
            "True" => Self::Yes,
            "False" => Self::No,
            _ => Self::Unclear,
        }
    }
}

impl From<Verdict> for Materiality {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Yes => Materiality::Material,
            Verdict::No => Materiality::NotMaterial,
            Verdict::Unclear => Materiality::Unclear,
        }
    }
}

/// Judges whether a disclosure describes a material event
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Never fails: problems reaching the model surface as [`Verdict::Unclear`]
    async fn classify(&self, text: &str) -> Verdict;
}

/// Builds the single-turn prompt sent to the model
pub fn build_prompt(item_code: &str, section: &str) -> String {
    format!(
        "The following text is taken from a Form 8-K filing that reports under Item {item_code}. \
         Based only on this text, does the company state or indicate that the event is material? \
         Answer with exactly one word: True, False, or Unclear.\n\n{section}"
    )
}

/// Cuts the text between the item heading and the end marker
///
/// Both searches are case-insensitive and take the first occurrence. A missing
/// heading starts at the beginning of the text; a missing end marker (or one
/// that only appears before the heading) runs to the end.
pub fn isolate_section<'a>(text: &'a str, heading: &str, end_marker: &str) -> &'a str {
    // ASCII lowering keeps byte offsets aligned with `text`
    let lowered = text.to_ascii_lowercase();
    let heading = heading.to_ascii_lowercase();
    let end_marker = end_marker.to_ascii_lowercase();

    let start = if heading.is_empty() {
        0
    } else {
        lowered.find(&heading).unwrap_or(0)
    };
    let end = if end_marker.is_empty() {
        text.len()
    } else {
        lowered[start..]
            .find(&end_marker)
            .map(|offset| start + offset)
            .unwrap_or(text.len())
    };

    &text[start..end]
}

/// Fetches filing text and runs it through a classifier
pub struct MaterialityAssessor {
    text_source: Box<dyn FilingTextSource>,
    classifier: Box<dyn Classifier>,
    item_code: String,
    end_marker: String,
}

impl MaterialityAssessor {
    pub fn new(
        text_source: Box<dyn FilingTextSource>,
        classifier: Box<dyn Classifier>,
        item_code: &str,
        end_marker: &str,
    ) -> Self {
        Self {
            text_source,
            classifier,
            item_code: item_code.to_string(),
            end_marker: end_marker.to_string(),
        }
    }

    /// Assesses the filing whose detail page is `link`
    pub async fn assess(&self, link: &str) -> Materiality {
        let text = match self.text_source.fetch_text(link).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Could not fetch filing text for {}: {}", link, e);
                return Materiality::Unclear;
            }
        };

        let heading = format!("Item {}", self.item_code);
        let section = isolate_section(&text, &heading, &self.end_marker);
        tracing::debug!("Classifying {} ({} bytes of section text)", link, section.len());

        let verdict = self.classifier.classify(section).await;
        verdict.into()
    }
}
