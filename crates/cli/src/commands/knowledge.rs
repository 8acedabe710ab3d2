//! `chatwright knowledge`: Show what the model would see for a profile.

use chatwright_engine::{CompiledKnowledge, compile};
use std::path::Path;

pub fn run(profile_path: &Path, max_length: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    if max_length == Some(0) {
        return Err("--max-length must be greater than zero".into());
    }

    let profile = super::load_profile(profile_path)?;
    let knowledge = compile(&profile, max_length);

    println!("{}", knowledge.text);
    eprintln!();
    eprintln!("{}", summary(&knowledge, max_length));

    Ok(())
}

fn summary(knowledge: &CompiledKnowledge, max_length: Option<usize>) -> String {
    if knowledge.is_placeholder() {
        return "No enabled knowledge sources.".to_string();
    }

    let usage = knowledge.usage;
    let budget = max_length.map_or_else(|| "unbounded".to_string(), |l| l.to_string());
    format!(
        "{} chars (budget {budget}{})\n   FAQ:        {}\n   Documents:  {}\n   Websites:   {}\n   Structured: {}",
        knowledge.len(),
        if knowledge.truncated { ", truncated" } else { "" },
        usage.faq,
        usage.documents,
        usage.urls,
        usage.structured,
    )
}
