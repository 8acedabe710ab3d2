//! Priority truncation: FAQ > URL > Document > Structured data.

use super::{
    CompiledKnowledge, FAQ_ONLY_NOTE, FAQ_TRUNCATED_MARKER, KnowledgeSections, PRIORITY_NOTE,
    SectionLimits, char_len, join_blocks, take_chars,
};

/// Hard ceiling on the FAQ block, whatever the budget.
pub const FAQ_CEILING: usize = 30_000;

/// Room kept for separators and notes when the FAQ block is placed.
const RESERVE: usize = 200;

const ELLIPSIS: &str = "...";

/// Cut compiled knowledge down to `max_length` chars.
///
/// Input that already fits is returned unchanged. Otherwise the FAQ block is
/// placed first (cut only above `min(max_length, 30000)`), then URLs,
/// Documents and Structured data fill what is left, each whole or cut with an
/// ellipsis, after which nothing further is added. The result always ends
/// with [`PRIORITY_NOTE`].
pub fn truncate(knowledge: &CompiledKnowledge, max_length: usize) -> CompiledKnowledge {
    if knowledge.len() <= max_length || knowledge.is_placeholder() {
        return knowledge.clone();
    }

    let source = &knowledge.sections;
    let ceiling = max_length.min(FAQ_CEILING);
    let faq_len = char_len(&source.faq).min(ceiling);
    let remaining = max_length as i64 - faq_len as i64 - RESERVE as i64;

    if remaining <= 0 {
        return faq_only(&source.faq, max_length);
    }

    let mut sections = KnowledgeSections {
        faq: cut_faq(&source.faq, ceiling),
        ..Default::default()
    };

    let mut budget = remaining as usize;
    for (from, to) in [
        (&source.urls, &mut sections.urls),
        (&source.documents, &mut sections.documents),
        (&source.structured, &mut sections.structured),
    ] {
        if budget == 0 {
            break;
        }
        if from.is_empty() {
            continue;
        }
        let len = char_len(from);
        if len <= budget {
            to.clone_from(from);
            budget -= len;
        } else {
            *to = format!("{}{ELLIPSIS}", take_chars(from, budget).trim_end());
            budget = 0;
        }
    }

    let text = join_blocks([
        sections.faq.as_str(),
        sections.urls.as_str(),
        sections.documents.as_str(),
        sections.structured.as_str(),
        PRIORITY_NOTE,
    ]);

    CompiledKnowledge {
        usage: sections.usage(),
        text,
        sections,
        truncated: true,
    }
}

/// The FAQ block alone. Large budgets keep it whole up to the ceiling; small
/// (fallback) budgets trim it so the result still fits.
fn faq_only(faq: &str, max_length: usize) -> CompiledKnowledge {
    let keep = if max_length >= SectionLimits::SMALL_BUDGET {
        max_length.min(FAQ_CEILING)
    } else {
        max_length.saturating_sub(RESERVE)
    };

    let sections = KnowledgeSections {
        faq: cut_faq(faq, keep),
        ..Default::default()
    };
    let text = join_blocks([sections.faq.as_str(), FAQ_ONLY_NOTE, PRIORITY_NOTE]);

    CompiledKnowledge {
        usage: sections.usage(),
        text,
        sections,
        truncated: true,
    }
}

fn cut_faq(faq: &str, keep: usize) -> String {
    if char_len(faq) <= keep {
        faq.to_string()
    } else {
        format!("{}\n{FAQ_TRUNCATED_MARKER}", take_chars(faq, keep).trim_end())
    }
}
