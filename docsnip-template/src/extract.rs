//! Fenced code block extraction and normalization.

use docsnip_core::{LanguageVariant, Result, SnippetError};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

static FENCE_PATTERNS: OnceLock<HashMap<LanguageVariant, Regex>> = OnceLock::new();

/// One fenced block pattern per language tag; group 1 is the block body.
fn get_fence_regex(language: LanguageVariant) -> &'static Regex {
    let patterns = FENCE_PATTERNS.get_or_init(|| {
        LanguageVariant::ALL
            .into_iter()
            .map(|language| {
                let pattern =
                    format!(r"(?ms)^[ \t]*```{}[ \t]*\n(.*?)^[ \t]*```", regex::escape(language.tag()));
                (language, Regex::new(&pattern).expect("Invalid regex pattern"))
            })
            .collect()
    });
    &patterns[&language]
}

/// Extracts the single fenced block tagged for `language` from documentation text.
///
/// # Errors
///
/// Returns [`SnippetError::Format`] when the text holds no block or more than one
/// block for the language.
pub fn extract_code_block(text: &str, language: LanguageVariant) -> Result<String> {
    let text = text.replace("\r\n", "\n");
    let blocks: Vec<&str> = get_fence_regex(language)
        .captures_iter(&text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    match blocks.as_slice() {
        [block] => Ok(block.to_string()),
        [] => Err(SnippetError::format(format!("no ```{} code block found", language.tag()))),
        many => Err(SnippetError::format(format!(
            "expected one ```{} code block, found {}",
            language.tag(),
            many.len()
        ))),
    }
}

/// Normalizes extracted code: LF line endings, no trailing whitespace, common
/// indentation removed, runs of blank lines collapsed to one and no blank lines at
/// either end. Applying it twice gives the same text.
pub fn normalize_code(code: &str) -> String {
    let unified = code.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = unified.lines().map(str::trim_end).collect();

    let common_indent = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for line in &lines {
        let line = if line.is_empty() { "" } else { &line[common_indent..] };
        if line.is_empty() && out.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }

    out.join("\n")
}

/// Prefixes every non-empty line with `unit`.
pub fn indent_lines(code: &str, unit: &str) -> String {
    code.lines()
        .map(|l| if l.is_empty() { String::new() } else { format!("{}{}", unit, l) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered listing of a snippet, used in compilation failure reports.
pub fn numbered_listing(code: &str) -> String {
    let width = code.lines().count().to_string().len();
    code.lines()
        .enumerate()
        .map(|(i, l)| format!("{:>width$} {}", i + 1, l, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}
