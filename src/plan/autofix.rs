//! Heuristic repair of invalid steps
//!
//! Best-effort textual recovery only: fields missing from a step are scraped
//! from its own description or reasoning. Each applied repair is logged under
//! the `autofix` target so it stays distinguishable from validation noise.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::core::{ActionKind, ExecuteStep};
use crate::plan::validate::{parse_number, ValidationIssue};

static QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["'`\u{201C}\u{2018}]([^"'`\u{201C}\u{201D}\u{2018}\u{2019}]+)["'`\u{201D}\u{2019}]"#)
        .expect("quoted token regex")
});

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s"'`<>)\]]+"#).expect("url regex"));

static DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:[a-z0-9-]+\.)+[a-z]{2,}(?:/[^\s]*)?").expect("domain regex")
});

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(ms|milliseconds?|s|secs?|seconds?)?\b").expect("duration regex")
});

const KEY_NAMES: &[&str] = &[
    "Enter",
    "Tab",
    "Escape",
    "Backspace",
    "Delete",
    "Space",
    "ArrowUp",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
    "PageUp",
    "PageDown",
    "Home",
    "End",
];

/// Repair a step using its validation issues and return the repaired copy.
///
/// A step without issues is returned unchanged.
pub fn attempt_step_fix(step: &ExecuteStep, issues: &[ValidationIssue]) -> ExecuteStep {
    fix_step(step, issues).0
}

/// Like [`attempt_step_fix`], also returning a note per applied repair
pub(crate) fn fix_step(step: &ExecuteStep, issues: &[ValidationIssue]) -> (ExecuteStep, Vec<String>) {
    let mut fixed = step.clone();
    let mut notes = Vec::new();

    // Description last: it may be synthesized from a freshly scraped target
    for issue in issues
        .iter()
        .filter(|i| **i != ValidationIssue::MissingDescription)
    {
        let note = match issue {
            ValidationIssue::MissingUrl => scrape_url(step).map(|url| {
                let note = format!("scraped URL '{}'", url);
                fixed.target = url;
                note
            }),
            ValidationIssue::MissingTarget => scrape_selector(step).map(|selector| {
                let note = format!("scraped selector '{}'", selector);
                fixed.target = selector;
                note
            }),
            ValidationIssue::MissingValue(_) => scrape_value(step, &fixed.target).map(|value| {
                let note = format!("scraped value '{}'", value);
                fixed.value = Some(value);
                note
            }),
            ValidationIssue::MissingKey => scrape_key(step, &fixed.target).map(|key| {
                let note = format!("scraped key '{}'", key);
                fixed.value = Some(key);
                note
            }),
            ValidationIssue::NonNumericValue => scrape_number(step).map(|number| {
                let note = format!("scraped number '{}'", number);
                fixed.value = Some(number);
                note
            }),
            ValidationIssue::MissingDescription | ValidationIssue::UnknownAction(_) => None,
        };

        if let Some(note) = note {
            notes.push(note);
        }
    }

    if issues.contains(&ValidationIssue::MissingDescription) {
        let subject = fixed
            .target()
            .or_else(|| fixed.value())
            .unwrap_or_default()
            .to_string();
        fixed.description = format!("{} {}", step.action.label(), subject)
            .trim()
            .to_string();
        notes.push(format!("synthesized description '{}'", fixed.description));
    }

    for note in &notes {
        info!(target: "autofix", step_id = %step.id, action = %step.action, "{}", note);
    }

    (fixed, notes)
}

/// Text the heuristics may read from: description first, then reasoning
fn sources(step: &ExecuteStep) -> impl Iterator<Item = &str> {
    std::iter::once(step.description.as_str()).chain(step.reasoning.as_deref())
}

fn quoted_tokens(text: &str) -> impl Iterator<Item = &str> {
    QUOTED
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

fn looks_like_selector(token: &str) -> bool {
    if token.contains("://") {
        return false;
    }
    let starts_with_marker = token.starts_with(['#', '.', '[']);
    let has_css_syntax = token.contains(['[', '=', '>', '#']);
    let tag_with_class = !token.contains(char::is_whitespace)
        && token
            .split_once(['.', '#'])
            .map(|(tag, rest)| {
                !tag.is_empty() && !rest.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .unwrap_or(false);
    starts_with_marker || has_css_syntax || tag_with_class
}

fn scrape_url(step: &ExecuteStep) -> Option<String> {
    let text: Vec<&str> = sources(step).collect();

    if let Some(url) = text.iter().find_map(|t| URL.find(t)) {
        return Some(url.as_str().trim_end_matches(['.', ',', ';']).to_string());
    }

    text.iter()
        .flat_map(|t| quoted_tokens(t))
        .find_map(|token| DOMAIN.find(token).filter(|m| m.as_str() == token))
        .or_else(|| text.iter().find_map(|t| DOMAIN.find(t)))
        .map(|m| format!("https://{}", m.as_str().trim_end_matches(['.', ',', ';'])))
}

fn scrape_selector(step: &ExecuteStep) -> Option<String> {
    sources(step)
        .flat_map(quoted_tokens)
        .find(|token| looks_like_selector(token))
        .map(str::to_string)
}

fn scrape_value(step: &ExecuteStep, target: &str) -> Option<String> {
    sources(step)
        .flat_map(quoted_tokens)
        .find(|token| *token != target.trim())
        .map(str::to_string)
}

fn scrape_key(step: &ExecuteStep, target: &str) -> Option<String> {
    scrape_value(step, target)
        .filter(|v| KEY_NAMES.iter().any(|k| k.eq_ignore_ascii_case(v)) || v.chars().count() == 1)
        .or_else(|| {
            sources(step).find_map(|text| {
                text.split(|c: char| !c.is_ascii_alphanumeric())
                    .find_map(|word| KEY_NAMES.iter().find(|k| k.eq_ignore_ascii_case(word)))
                    .map(|k| k.to_string())
            })
        })
}

/// Number for waits and sliders; waits convert seconds to milliseconds
fn scrape_number(step: &ExecuteStep) -> Option<String> {
    let candidates = step.value.as_deref().into_iter().chain(sources(step));

    for text in candidates {
        let Some(caps) = DURATION.captures(text) else {
            continue;
        };
        let Some(number) = caps.get(1).and_then(|m| parse_number(m.as_str())) else {
            continue;
        };

        let unit = caps.get(2).map(|m| m.as_str().to_lowercase());
        let number = match (step.action, unit.as_deref()) {
            (ActionKind::Wait | ActionKind::WaitForDynamicContent, Some(u)) if u.starts_with('s') => {
                number * 1000.0
            }
            _ => number,
        };

        return Some(format_number(number));
    }

    None
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 {
        format!("{}", number as u64)
    } else {
        number.to_string()
    }
}
