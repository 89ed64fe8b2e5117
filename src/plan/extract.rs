//! JSON array extraction from free-form LLM text
//!
//! Candidates are tried in a fixed order; the first one that parses as a
//! non-empty JSON array wins.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::core::{Result, StepwrightError};

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fenced block regex")
});

static ARRAY_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)["']?\b(?:steps|json)\b["']?\s*:\s*"#).expect("array label regex")
});

/// Where a candidate came from, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    WholeText,
    FencedBlock,
    Labeled,
    BracketScan,
    LineRange,
}

/// Extract the JSON array text from an LLM response
pub fn extract_json(text: &str) -> Result<String> {
    let trimmed = text.trim();

    let found = whole_text(trimmed)
        .map(|c| (Source::WholeText, c.to_string()))
        .or_else(|| fenced_block(trimmed).map(|c| (Source::FencedBlock, c.to_string())))
        .or_else(|| labeled_array(trimmed).map(|c| (Source::Labeled, c.to_string())))
        .or_else(|| bracket_scan(trimmed).map(|c| (Source::BracketScan, c.to_string())))
        .or_else(|| line_range(trimmed).map(|c| (Source::LineRange, c)));

    match found {
        Some((source, candidate)) => {
            debug!(?source, len = candidate.len(), "Extracted step array");
            Ok(candidate)
        }
        None => Err(StepwrightError::parse(
            "no JSON array of steps found in response",
        )),
    }
}

/// Whether the candidate parses as a non-empty JSON array
fn is_step_array(candidate: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(candidate),
        Ok(serde_json::Value::Array(items)) if !items.is_empty()
    )
}

fn whole_text(text: &str) -> Option<&str> {
    (text.starts_with('[') && text.ends_with(']') && is_step_array(text)).then_some(text)
}

fn fenced_block(text: &str) -> Option<&str> {
    FENCED_BLOCK.captures_iter(text).find_map(|caps| {
        let body = caps.get(1)?.as_str().trim();
        if is_step_array(body) {
            return Some(body);
        }
        // A fenced object such as {"steps": [...]} still carries the array
        labeled_array(body).or_else(|| bracket_scan(body))
    })
}

fn labeled_array(text: &str) -> Option<&str> {
    ARRAY_LABEL.find_iter(text).find_map(|label| {
        let rest = &text[label.end()..];
        if !rest.starts_with('[') {
            return None;
        }
        balanced_array(text, label.end()).filter(|c| is_step_array(c))
    })
}

fn bracket_scan(text: &str) -> Option<&str> {
    bracketed_spans(text)
        .into_iter()
        .map(|(start, end)| &text[start..=end])
        .find(|candidate| is_step_array(candidate))
}

/// Every matched `[`/`]` pair as (start, end), ordered by start
///
/// One pass with a stack of open brackets. Quotes only open a JSON string
/// inside a bracket, so apostrophes and quotes in prose do not count.
fn bracketed_spans(text: &str) -> Vec<(usize, usize)> {
    let mut open = Vec::new();
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (index, byte) in text.bytes().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' if !open.is_empty() => in_string = true,
            b'[' => open.push(index),
            b']' => {
                if let Some(start) = open.pop() {
                    spans.push((start, index));
                }
            }
            _ => {}
        }
    }

    spans.sort_unstable_by_key(|&(start, _)| start);
    spans
}

/// Everything from the first line starting with `[` to the last line ending with `]`
fn line_range(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let first = lines.iter().position(|l| l.trim_start().starts_with('['))?;
    let last = lines.iter().rposition(|l| l.trim_end().ends_with(']'))?;
    if last < first {
        return None;
    }

    let candidate = lines[first..=last].join("\n");
    let candidate = candidate.trim();
    is_step_array(candidate).then(|| candidate.to_string())
}

/// Slice from the `[` at `start` to its matching `]`, honouring JSON strings
fn balanced_array(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'[') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARRAY: &str = r##"[{"action":"click","target":"#btn"}]"##;

    #[test]
    fn test_whole_text_array() {
        assert_eq!(extract_json(&format!("  {}\n", ARRAY)).unwrap(), ARRAY);
    }

    #[test]
    fn test_fenced_block_with_prose() {
        let text = format!("Here is the plan:\n```json\n{}\n```\nGood luck!", ARRAY);
        assert_eq!(extract_json(&text).unwrap(), ARRAY);
    }

    #[test]
    fn test_fenced_block_without_language() {
        let text = format!("```\n{}\n```", ARRAY);
        assert_eq!(extract_json(&text).unwrap(), ARRAY);
    }

    #[test]
    fn test_fenced_object_with_steps_key() {
        let text = format!("```json\n{{\"steps\": {}}}\n```", ARRAY);
        assert_eq!(extract_json(&text).unwrap(), ARRAY);
    }

    #[test]
    fn test_labeled_array() {
        let text = format!("I analysed the recording.\nSteps: {} That is all.", ARRAY);
        assert_eq!(extract_json(&text).unwrap(), ARRAY);
    }

    #[test]
    fn test_array_inside_unclosed_bracket() {
        let text = format!("Plan [draft: {}", ARRAY);
        assert_eq!(extract_json(&text).unwrap(), ARRAY);
    }

    #[test]
    fn test_many_unclosed_brackets_scan_once() {
        let noise = "[".repeat(200_000);
        assert!(extract_json(&noise).is_err());

        let text = format!("{}{}", noise, ARRAY);
        assert_eq!(extract_json(&text).unwrap(), ARRAY);
    }

    #[test]
    fn test_bracket_scan_skips_empty_and_prose_brackets() {
        let text = format!("Options [a] and [] were ignored; plan {} done", ARRAY);
        assert_eq!(extract_json(&text).unwrap(), ARRAY);
    }

    #[test]
    fn test_brackets_inside_strings_do_not_close_array() {
        let array = r#"[{"action":"click","target":"input[name=\"q\"]"}]"#;
        let text = format!("plan: {}", array);
        assert_eq!(extract_json(&text).unwrap(), array);
    }

    #[test]
    fn test_multiline_array() {
        let text = "Plan below\n[\n  {\"action\": \"wait\", \"value\": \"500\"},\n  {\"action\": \"click\", \"target\": \"#go\"}\n]\nthanks";
        let extracted = extract_json(text).unwrap();
        assert!(extracted.starts_with('['));
        assert!(extracted.ends_with(']'));
        assert!(extracted.contains("#go"));
    }

    #[test]
    fn test_no_array_is_parse_error() {
        for text in ["", "I cannot help with that.", "[]", "[not json]", "{\"a\": 1}"] {
            let err = extract_json(text).unwrap_err();
            assert!(matches!(err, StepwrightError::Parse(_)), "input: {text:?}");
        }
    }

    #[test]
    fn test_unbalanced_array_is_parse_error() {
        assert!(extract_json("[{\"action\": \"click\"").is_err());
    }
}
