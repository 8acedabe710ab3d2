//! Knowledge compilation: merges a bot's enabled sources into one bounded
//! text blob.
//!
//! # Priority
//!
//! FAQs are always emitted in full (subject only to a hard safety ceiling).
//! When the assembled text exceeds the caller's budget, the remaining
//! sections are filled in the order URL → Document → Structured data.
//!
//! # Determinism
//!
//! [`compile`] and [`truncate`] are pure: the same profile snapshot and the
//! same budget always produce identical output. All lengths are counted in
//! chars and every cut lands on a char boundary.

mod compiler;
mod render;
mod truncate;

pub use compiler::{SectionLimits, compile};
pub use truncate::truncate;

use serde::Serialize;

/// Returned instead of an empty string when a bot has nothing enabled.
pub const NO_KNOWLEDGE_PLACEHOLDER: &str =
    "No knowledge base has been configured for this bot yet.";

/// Appended to every truncated result.
pub const PRIORITY_NOTE: &str =
    "[Knowledge truncated to fit: priority FAQ > URL > Document > Structured data]";

/// Appended when everything except the FAQs had to be dropped.
pub const FAQ_ONLY_NOTE: &str = "[Other knowledge sections omitted to preserve FAQs]";

pub const FAQ_TRUNCATED_MARKER: &str = "[FAQs truncated]";
pub const CONTINUES_MARKER: &str = "[...content continues]";

/// The text contributed by each section, headers included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeSections {
    pub faq: String,
    pub documents: String,
    pub urls: String,
    pub structured: String,
}

impl KnowledgeSections {
    pub fn is_empty(&self) -> bool {
        self.faq.is_empty()
            && self.documents.is_empty()
            && self.urls.is_empty()
            && self.structured.is_empty()
    }

    pub fn usage(&self) -> SectionUsage {
        SectionUsage {
            faq: char_len(&self.faq),
            documents: char_len(&self.documents),
            urls: char_len(&self.urls),
            structured: char_len(&self.structured),
        }
    }
}

/// Characters used per section in the compiled text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SectionUsage {
    pub faq: usize,
    pub documents: usize,
    pub urls: usize,
    pub structured: usize,
}

/// Bounded knowledge text plus the per-section breakdown it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledKnowledge {
    pub text: String,
    pub sections: KnowledgeSections,
    pub usage: SectionUsage,
    pub truncated: bool,
}

impl CompiledKnowledge {
    /// Untruncated layout: FAQ, Documents, URLs, Structured data.
    pub(crate) fn assemble(sections: KnowledgeSections) -> Self {
        if sections.is_empty() {
            return Self::placeholder();
        }

        let text = join_blocks([
            sections.faq.as_str(),
            sections.documents.as_str(),
            sections.urls.as_str(),
            sections.structured.as_str(),
        ]);

        Self {
            usage: sections.usage(),
            text,
            sections,
            truncated: false,
        }
    }

    pub fn placeholder() -> Self {
        Self {
            text: NO_KNOWLEDGE_PLACEHOLDER.to_string(),
            sections: KnowledgeSections::default(),
            usage: SectionUsage::default(),
            truncated: false,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.sections.is_empty()
    }

    /// Length of `text` in chars.
    pub fn len(&self) -> usize {
        char_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The first `max` chars of `s`.
pub(crate) fn take_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub(crate) fn join_blocks<'a>(blocks: impl IntoIterator<Item = &'a str>) -> String {
    blocks
        .into_iter()
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
