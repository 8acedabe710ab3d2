//! Reply-language detection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static VIETNAMESE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[àáạảãâầấậẩẫăằắặẳẵèéẹẻẽêềếệểễìíịỉĩòóọỏõôồốộổỗơờớợởỡùúụủũưừứựửữỳýỵỷỹđ]",
    )
    .expect("vietnamese diacritics pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Vietnamese,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Vietnamese => "Vietnamese",
        }
    }

    /// The second system instruction sent with every attempt.
    pub fn enforcement_instruction(&self) -> String {
        let name = self.name();
        format!(
            "The user is writing in {name}. Your ENTIRE reply MUST be in {name}, \
             including headers, labels and notes, even if the knowledge base is in \
             another language. This rule overrides every other instruction."
        )
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Vietnamese if the text carries any Vietnamese diacritic, else English.
pub fn detect(text: &str) -> Language {
    if VIETNAMESE.is_match(text) {
        Language::Vietnamese
    } else {
        Language::English
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_phrases() {
        assert_eq!(detect("Xin chào bạn"), Language::Vietnamese);
        assert_eq!(detect("Hello there"), Language::English);
    }

    #[test]
    fn uppercase_and_lone_d_stroke() {
        assert_eq!(detect("GIÁ BAO NHIÊU"), Language::Vietnamese);
        assert_eq!(detect("Đi"), Language::Vietnamese);
    }

    #[test]
    fn unaccented_vietnamese_reads_as_english() {
        assert_eq!(detect("xin chao"), Language::English);
        assert_eq!(detect(""), Language::English);
    }

    #[test]
    fn instruction_names_language() {
        let instruction = Language::Vietnamese.enforcement_instruction();
        assert!(instruction.contains("MUST be in Vietnamese"));
    }
}
