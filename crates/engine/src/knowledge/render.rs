//! Text rendering for each knowledge source kind.

use chatwright_core::profile::{
    CatalogItem, Document, Faq, PriceEntry, Product, RecordData, Service, StructuredRecord,
    UrlSource,
};
use std::fmt::Write;

use super::{CONTINUES_MARKER, char_len, take_chars};

pub(crate) const FAQ_HEADER: &str = "=== FREQUENTLY ASKED QUESTIONS ===";
pub(crate) const DOCUMENTS_HEADER: &str = "=== DOCUMENTS ===";
pub(crate) const URLS_HEADER: &str = "=== WEBSITE CONTENT ===";
pub(crate) const STRUCTURED_HEADER: &str = "=== STRUCTURED DATA ===";

pub(crate) fn faq_block(faqs: &[Faq]) -> String {
    if faqs.is_empty() {
        return String::new();
    }
    let body: Vec<String> = faqs.iter().map(Faq::render).collect();
    format!("{FAQ_HEADER}\n{}", body.join("\n\n"))
}

/// Render a section of items: each capped at `item_cap` chars, at most
/// `max_items` of them, and a note counting the rest.
pub(crate) fn section<'a, T: 'a>(
    header: &str,
    noun: &str,
    items: impl Iterator<Item = &'a T>,
    item_cap: usize,
    max_items: usize,
    render: impl Fn(&T) -> (String, String),
) -> String {
    let items: Vec<&T> = items.collect();
    if items.is_empty() {
        return String::new();
    }

    let mut out = String::from(header);
    for &item in items.iter().take(max_items) {
        let (title, body) = render(item);
        let _ = write!(out, "\n\n{title}\n{}", cap(&body, item_cap));
    }

    let omitted = items.len().saturating_sub(max_items);
    if omitted > 0 {
        let _ = write!(out, "\n\n({omitted} more {noun} not shown)");
    }
    out
}

fn cap(content: &str, max: usize) -> String {
    let content = content.trim();
    if char_len(content) <= max {
        content.to_string()
    } else {
        format!("{}\n{CONTINUES_MARKER}", take_chars(content, max).trim_end())
    }
}

fn labels(category: &Option<String>, tags: &[String]) -> String {
    let mut out = String::new();
    if let Some(category) = category.as_deref().filter(|c| !c.is_empty()) {
        let _ = write!(out, " (category: {category})");
    }
    if !tags.is_empty() {
        let _ = write!(out, " [tags: {}]", tags.join(", "));
    }
    out
}

pub(crate) fn document(doc: &Document) -> (String, String) {
    let kind = if doc.kind.is_empty() {
        String::new()
    } else {
        format!(" ({})", doc.kind)
    };
    (
        format!("[Document: {}{kind}]{}", doc.name, labels(&doc.category, &doc.tags)),
        doc.content.clone(),
    )
}

pub(crate) fn url(page: &UrlSource) -> (String, String) {
    let title = if page.title.trim().is_empty() {
        page.url.clone()
    } else {
        format!("{} <{}>", page.title.trim(), page.url)
    };
    (
        format!("[Page: {title}]{}", labels(&page.category, &page.tags)),
        page.content.clone(),
    )
}

pub(crate) fn record(record: &StructuredRecord) -> (String, String) {
    (
        format!(
            "[{}: {}]{}",
            record.data.label(),
            record.name,
            labels(&record.category, &record.tags)
        ),
        record_data(&record.data),
    )
}

/// Lossless key/value rendering, one line per item.
pub(crate) fn record_data(data: &RecordData) -> String {
    let lines: Vec<String> = match data {
        RecordData::Products(items) => items.iter().map(product).collect(),
        RecordData::Pricing(items) => items.iter().map(price_entry).collect(),
        RecordData::Services(items) => items.iter().map(service).collect(),
        RecordData::Catalog(items) => items.iter().map(catalog_item).collect(),
    };
    lines.join("\n")
}

fn fields(pairs: &[(&str, Option<&str>)]) -> String {
    let parts: Vec<String> = pairs
        .iter()
        .filter_map(|(key, value)| value.map(|v| format!("{key}: {v}")))
        .collect();
    format!("- {}", parts.join("; "))
}

fn product(p: &Product) -> String {
    fields(&[
        ("Name", Some(p.name.as_str())),
        ("Price", p.price.as_deref()),
        ("SKU", p.sku.as_deref()),
        ("Description", p.description.as_deref()),
    ])
}

fn price_entry(p: &PriceEntry) -> String {
    fields(&[
        ("Item", Some(p.item.as_str())),
        ("Price", Some(p.price.as_str())),
        ("Unit", p.unit.as_deref()),
        ("Notes", p.notes.as_deref()),
    ])
}

fn service(s: &Service) -> String {
    fields(&[
        ("Name", Some(s.name.as_str())),
        ("Duration", s.duration.as_deref()),
        ("Price", s.price.as_deref()),
        ("Description", s.description.as_deref()),
    ])
}

fn catalog_item(c: &CatalogItem) -> String {
    let mut pairs: Vec<(&str, Option<&str>)> = vec![("Name", Some(c.name.as_str()))];
    pairs.extend(
        c.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), Some(v.as_str()))),
    );
    fields(&pairs)
}
