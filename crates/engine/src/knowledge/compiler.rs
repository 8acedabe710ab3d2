use chatwright_core::profile::BotProfile;

use super::render::{
    DOCUMENTS_HEADER, STRUCTURED_HEADER, URLS_HEADER, document, faq_block, record, section, url,
};
use super::{CompiledKnowledge, KnowledgeSections, truncate};

/// Per-section character and item caps derived from a length budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionLimits {
    pub document_chars: usize,
    pub url_chars: usize,
    pub record_chars: usize,
    pub max_documents: usize,
    pub max_urls: usize,
    pub max_records: usize,
}

impl SectionLimits {
    const DOCUMENT_CHARS: usize = 3000;
    const URL_CHARS: usize = 2000;
    const RECORD_CHARS: usize = 1500;

    /// Budgets below this count as the small fallback tier.
    pub const SMALL_BUDGET: usize = 10_000;

    pub fn for_budget(max_length: Option<usize>) -> Self {
        match max_length {
            None => Self::default(),
            Some(len) => {
                let (max_documents, max_urls, max_records) = if len < Self::SMALL_BUDGET {
                    (10, 10, 10)
                } else {
                    (20, 20, 10)
                };
                Self {
                    document_chars: Self::DOCUMENT_CHARS.min(len / 5),
                    url_chars: Self::URL_CHARS.min(len / 6),
                    record_chars: Self::RECORD_CHARS.min(len / 8),
                    max_documents,
                    max_urls,
                    max_records,
                }
            }
        }
    }
}

impl Default for SectionLimits {
    fn default() -> Self {
        Self {
            document_chars: Self::DOCUMENT_CHARS,
            url_chars: Self::URL_CHARS,
            record_chars: Self::RECORD_CHARS,
            max_documents: 20,
            max_urls: 20,
            max_records: 10,
        }
    }
}

/// Compile a profile's enabled knowledge into one text blob.
///
/// Without `max_length` the output is the full compile with default caps.
/// With it, per-section caps shrink with the budget and anything still over
/// budget goes through [`truncate`].
pub fn compile(profile: &BotProfile, max_length: Option<usize>) -> CompiledKnowledge {
    let limits = SectionLimits::for_budget(max_length);

    let sections = KnowledgeSections {
        faq: faq_block(&profile.faqs),
        documents: section(
            DOCUMENTS_HEADER,
            "documents",
            profile.documents.iter().filter(|d| d.enabled),
            limits.document_chars,
            limits.max_documents,
            document,
        ),
        urls: section(
            URLS_HEADER,
            "pages",
            profile.urls.iter().filter(|u| u.enabled),
            limits.url_chars,
            limits.max_urls,
            url,
        ),
        structured: section(
            STRUCTURED_HEADER,
            "records",
            profile.records.iter().filter(|r| r.enabled),
            limits.record_chars,
            limits.max_records,
            record,
        ),
    };

    let compiled = CompiledKnowledge::assemble(sections);
    match max_length {
        Some(len) if !compiled.is_placeholder() && compiled.len() > len => truncate(&compiled, len),
        _ => compiled,
    }
}
