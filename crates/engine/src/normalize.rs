use regex::Regex;
use std::sync::LazyLock;

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank-run pattern is valid"));

/// Collapse 3+ newlines to two, then every double newline to one, then trim.
pub fn normalize(text: &str) -> String {
    let collapsed = BLANK_RUNS.replace_all(text, "\n\n");
    collapsed.replace("\n\n", "\n").trim().to_string()
}
