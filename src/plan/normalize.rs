//! Action name normalization
//!
//! Maps the loose action vocabulary LLMs produce onto `ActionKind`.

use tracing::warn;

use crate::core::ActionKind;

/// Synonym table; canonical names are matched through `ActionKind::as_str`
const SYNONYMS: &[(&str, ActionKind)] = &[
    ("go_to", ActionKind::Navigate),
    ("goto", ActionKind::Navigate),
    ("go", ActionKind::Navigate),
    ("visit", ActionKind::Navigate),
    ("open", ActionKind::Navigate),
    ("open_url", ActionKind::Navigate),
    ("navigate_to", ActionKind::Navigate),
    ("load", ActionKind::Navigate),
    ("load_url", ActionKind::Navigate),
    ("browse", ActionKind::Navigate),
    ("tap", ActionKind::Click),
    ("press", ActionKind::Click),
    ("click_element", ActionKind::Click),
    ("click_button", ActionKind::Click),
    ("click_link", ActionKind::Click),
    ("input", ActionKind::Type),
    ("fill", ActionKind::Type),
    ("fill_in", ActionKind::Type),
    ("enter_text", ActionKind::Type),
    ("type_text", ActionKind::Type),
    ("text_input", ActionKind::Type),
    ("write", ActionKind::Type),
    ("clear_input", ActionKind::Clear),
    ("clear_text", ActionKind::Clear),
    ("erase", ActionKind::Clear),
    ("submit_form", ActionKind::Submit),
    ("unfocus", ActionKind::Blur),
    ("mouse_over", ActionKind::Hover),
    ("mouseover", ActionKind::Hover),
    ("key_press", ActionKind::Keypress),
    ("press_key", ActionKind::Keypress),
    ("key", ActionKind::Keypress),
    ("keyboard", ActionKind::Keypress),
    ("choose", ActionKind::Select),
    ("check", ActionKind::Toggle),
    ("uncheck", ActionKind::Toggle),
    ("checkbox", ActionKind::Toggle),
    ("toggle_checkbox", ActionKind::Toggle),
    ("dropdown", ActionKind::SelectOption),
    ("select_dropdown", ActionKind::SelectOption),
    ("choose_option", ActionKind::SelectOption),
    ("radio", ActionKind::SelectRadio),
    ("radio_button", ActionKind::SelectRadio),
    ("upload", ActionKind::SelectFile),
    ("file_upload", ActionKind::SelectFile),
    ("upload_file", ActionKind::SelectFile),
    ("attach", ActionKind::SelectFile),
    ("slider", ActionKind::AdjustSlider),
    ("slide", ActionKind::AdjustSlider),
    ("set_range", ActionKind::AdjustSlider),
    ("copy_text", ActionKind::Copy),
    ("cut_text", ActionKind::Cut),
    ("paste_text", ActionKind::Paste),
    ("scroll_to", ActionKind::Scroll),
    ("scroll_down", ActionKind::Scroll),
    ("scroll_up", ActionKind::Scroll),
    ("right_click", ActionKind::ContextMenu),
    ("rightclick", ActionKind::ContextMenu),
    ("contextmenu", ActionKind::ContextMenu),
    ("sleep", ActionKind::Wait),
    ("delay", ActionKind::Wait),
    ("pause", ActionKind::Wait),
    ("wait_for", ActionKind::WaitForElement),
    ("wait_for_selector", ActionKind::WaitForElement),
    ("wait_element", ActionKind::WaitForElement),
    ("wait_for_content", ActionKind::WaitForDynamicContent),
    ("wait_for_load", ActionKind::WaitForDynamicContent),
    ("wait_for_network_idle", ActionKind::WaitForDynamicContent),
    ("wait_for_page", ActionKind::WaitForDynamicContent),
    ("assert_element", ActionKind::VerifyElement),
    ("check_element", ActionKind::VerifyElement),
    ("verify", ActionKind::VerifyElement),
    ("assert_text", ActionKind::VerifyText),
    ("check_text", ActionKind::VerifyText),
    ("assert_url", ActionKind::VerifyUrl),
    ("check_url", ActionKind::VerifyUrl),
    ("scrape", ActionKind::Extract),
    ("get_text", ActionKind::Extract),
    ("read", ActionKind::Extract),
    ("extract_text", ActionKind::Extract),
    ("extract_data", ActionKind::Extract),
];

/// Lowercase, trim, and fold separators to `_`
fn canonical_token(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Strict lookup: canonical names and known synonyms only
pub fn lookup_action_type(raw: &str) -> Option<ActionKind> {
    let token = canonical_token(raw);
    if token.is_empty() {
        return None;
    }

    ActionKind::ALL
        .iter()
        .copied()
        .find(|kind| kind.as_str() == token)
        .or_else(|| {
            SYNONYMS
                .iter()
                .find(|(name, _)| *name == token)
                .map(|(_, kind)| *kind)
        })
}

/// Total mapping from any string to an action kind.
///
/// Unknown or empty input falls back to `click` so that one bad token does not
/// sink the whole plan. The fallback is logged; callers that want to reject it
/// use [`lookup_action_type`] instead.
pub fn normalize_action_type(raw: &str) -> ActionKind {
    lookup_action_type(raw).unwrap_or_else(|| {
        warn!(raw, "Unrecognized action type, falling back to click");
        ActionKind::Click
    })
}
