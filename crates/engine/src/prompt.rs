//! Prompt assembly: the system instruction sent with every attempt.
//!
//! The output is a pure function of its inputs, which is what makes the
//! prompt cache sound.

use chatwright_core::profile::{BotProfile, Platform};

use crate::knowledge::CompiledKnowledge;
use crate::market::MarketContext;

const BEHAVIOR_RULES: &str = "\
=== RULES ===
1. LANGUAGE: Reply in the same language as the user's message. This rule is mandatory and overrides every other instruction, including the language of the knowledge base.
2. SEARCH FIRST: Before saying you do not know, search the ENTIRE knowledge base above: every FAQ, page, document and data record. Only if nothing relevant exists, say so politely and suggest contacting the team.
3. ACCURACY: Use only facts from the knowledge base and live market data. Never invent prices, rates, dates or policies.
4. FORMAT: Write like a short report. Start with a bold header line, separate sections with a divider line (━━━━━━━━), use bullet points for lists, and add a fitting emoji to headers and key figures.
5. Keep answers focused on what was asked.";

/// Renders the system prompt from identity, knowledge, rules and optional
/// market context.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptAssembler;

impl PromptAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(
        &self,
        profile: &BotProfile,
        knowledge: &CompiledKnowledge,
        platform: Platform,
        market: Option<&MarketContext>,
    ) -> String {
        let mut parts = vec![identity(profile)];

        if let Some(market) = market {
            parts.push(market.text.clone());
        }

        parts.push(format!("=== KNOWLEDGE BASE ===\n{}", knowledge.text));
        parts.push(BEHAVIOR_RULES.to_string());
        parts.push(format!("=== PLATFORM ===\n{}", platform_hint(platform)));

        parts.join("\n\n")
    }
}

fn identity(profile: &BotProfile) -> String {
    let welcome = profile.welcome_message.trim();
    if welcome.is_empty() {
        format!("You are {}, a customer support assistant.", profile.name)
    } else {
        format!(
            "You are {}, a customer support assistant. Your greeting to users is: \"{welcome}\"",
            profile.name
        )
    }
}

fn platform_hint(platform: Platform) -> &'static str {
    match platform {
        Platform::Web => {
            "Replies are shown in a web chat widget that renders Markdown: headers, bold text and bullet lists display properly."
        }
        Platform::Telegram => {
            "Replies are sent on Telegram. Use simple formatting: bold sparingly, short paragraphs, no tables."
        }
        Platform::Discord => {
            "Replies are sent on Discord, which renders Markdown. Keep each reply under 2000 characters."
        }
        Platform::WhatsApp | Platform::WhatsAppWeb => {
            "Replies are sent on WhatsApp. Use *single asterisks* for bold and plain dashes for lists; Markdown headers and tables do not render."
        }
    }
}
