//! Bot profile: the read-only snapshot of a bot's identity and knowledge.
//!
//! Profiles are owned by the settings store; the engine only reads them.
//! The `updated_at` stamp doubles as the cache version: any edit to the bot
//! produces a new stamp and therefore a cache miss.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::GenerationError;

/// A bot's configuration as seen by the answer pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotProfile {
    /// Stable bot identifier
    pub id: String,

    /// Display name used in the identity line
    pub name: String,

    /// Greeting shown to users when a conversation opens
    #[serde(default)]
    pub welcome_message: String,

    /// Last-modified stamp; the cache version component
    pub updated_at: DateTime<Utc>,

    /// FAQs are always included (no enabled flag)
    #[serde(default)]
    pub faqs: Vec<Faq>,

    #[serde(default)]
    pub documents: Vec<Document>,

    #[serde(default)]
    pub urls: Vec<UrlSource>,

    #[serde(default)]
    pub records: Vec<StructuredRecord>,
}

impl BotProfile {
    /// Create an empty profile stamped with the current time.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            welcome_message: String::new(),
            updated_at: Utc::now(),
            faqs: Vec::new(),
            documents: Vec::new(),
            urls: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Version stamp as epoch milliseconds.
    pub fn version(&self) -> i64 {
        self.updated_at.timestamp_millis()
    }

    /// Reject profiles the pipeline cannot key or address.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.id.trim().is_empty() {
            return Err(GenerationError::Validation("bot profile has no id".into()));
        }
        Ok(())
    }
}

/// A question with its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

impl Faq {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Question and answer merged into one block of text.
    pub fn render(&self) -> String {
        format!("Q: {}\nA: {}", self.question.trim(), self.answer.trim())
    }
}

/// Extracted text of an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    /// File kind as reported by the extractor ("pdf", "docx", "txt", ...)
    #[serde(default)]
    pub kind: String,
    pub content: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Scraped text of a web page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlSource {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Structured business data entered through the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub data: RecordData,
}

fn default_true() -> bool {
    true
}

/// The closed set of structured record kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum RecordData {
    Products(Vec<Product>),
    Pricing(Vec<PriceEntry>),
    Services(Vec<Service>),
    Catalog(Vec<CatalogItem>),
}

impl RecordData {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Products(_) => "Products",
            Self::Pricing(_) => "Pricing",
            Self::Services(_) => "Services",
            Self::Catalog(_) => "Catalog",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Products(v) => v.len(),
            Self::Pricing(v) => v.len(),
            Self::Services(v) => v.len(),
            Self::Catalog(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

/// One line of a price list or rate table (e.g. a deposit term and its rate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub item: String,
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

/// Free-form catalog entry; attributes are ordered so rendering is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// The chat surface a message arrived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Embedded web widget
    #[default]
    Web,
    Telegram,
    Discord,
    /// WhatsApp Business API
    #[serde(rename = "whatsapp")]
    WhatsApp,
    /// WhatsApp Web session
    #[serde(rename = "whatsapp_web")]
    WhatsAppWeb,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Telegram => "telegram",
            Self::Discord => "discord",
            Self::WhatsApp => "whatsapp",
            Self::WhatsAppWeb => "whatsapp_web",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "web" | "widget" => Ok(Self::Web),
            "telegram" => Ok(Self::Telegram),
            "discord" => Ok(Self::Discord),
            "whatsapp" => Ok(Self::WhatsApp),
            "whatsapp_web" | "whatsapp-web" => Ok(Self::WhatsAppWeb),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_parses_from_dashboard_json() {
        let json = serde_json::json!({
            "id": "bot-1",
            "name": "Acme Support",
            "welcomeMessage": "Hi",
            "updatedAt": "2026-01-02T03:04:05Z",
            "faqs": [{ "question": "Hours?", "answer": "9-5" }],
            "documents": [{ "name": "terms.pdf", "kind": "pdf", "content": "Terms", "enabled": false }],
            "urls": [{ "url": "https://acme.test", "content": "Home" }],
            "records": [{
                "name": "Rates",
                "kind": "pricing",
                "items": [{ "item": "6 months", "price": "8%" }]
            }]
        });
        let profile: BotProfile = serde_json::from_value(json).unwrap();
        assert_eq!(profile.welcome_message, "Hi");
        assert!(!profile.documents[0].enabled);
        assert!(profile.urls[0].enabled, "enabled defaults to true");
        assert_eq!(profile.records[0].data.label(), "Pricing");
        assert_eq!(profile.records[0].data.len(), 1);
        assert_eq!(profile.version(), 1_767_323_045_000);
    }

    #[test]
    fn validate_rejects_blank_id() {
        let profile = BotProfile::new("  ", "Nameless");
        assert!(matches!(
            profile.validate(),
            Err(GenerationError::Validation(_))
        ));
        assert!(BotProfile::new("bot", "Named").validate().is_ok());
    }

    #[test]
    fn faq_render_merges_question_and_answer() {
        assert_eq!(
            Faq::new(" Open? ", "Yes ").render(),
            "Q: Open?\nA: Yes"
        );
    }

    #[test]
    fn platform_tags() {
        let p: Platform = serde_json::from_str("\"whatsapp_web\"").unwrap();
        assert_eq!(p, Platform::WhatsAppWeb);
        assert_eq!("Telegram".parse::<Platform>().unwrap(), Platform::Telegram);
        assert!("fax".parse::<Platform>().is_err());
        assert_eq!(Platform::WhatsApp.to_string(), "whatsapp");
    }
}
