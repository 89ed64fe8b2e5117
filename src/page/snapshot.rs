//! Snapshot parsing for agent-browser output
//!
//! Parses the accessibility tree JSON from agent-browser and condenses it
//! into the serializable `PageSnapshot` that extract steps return.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw `snapshot --json` output from agent-browser
#[derive(Debug, Clone, Deserialize)]
pub struct AccessibilitySnapshot {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<SnapshotData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotData {
    /// Accessibility tree as text
    #[serde(default)]
    pub snapshot: String,
    /// Element refs mapped to their info
    #[serde(default)]
    pub refs: HashMap<String, RefElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefElement {
    /// ARIA role
    #[serde(default)]
    pub role: String,
    /// Accessible name
    #[serde(default)]
    pub name: String,
    /// Element value (for inputs)
    #[serde(default)]
    pub value: Option<String>,
}

impl RefElement {
    /// Check if this is an interactive element
    pub fn is_interactive(&self) -> bool {
        matches!(
            self.role.as_str(),
            "button"
                | "link"
                | "textbox"
                | "searchbox"
                | "checkbox"
                | "radio"
                | "combobox"
                | "menuitem"
                | "tab"
                | "switch"
                | "slider"
                | "spinbutton"
        )
    }
}

/// One element of a page snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotElement {
    /// agent-browser ref, e.g. `e12`
    #[serde(rename = "ref")]
    pub reference: String,
    pub role: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Plain-data view of a page, the payload of extract steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    /// Visible text of the page or of the selected element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<SnapshotElement>,
}

impl AccessibilitySnapshot {
    /// Parse CLI output; `None` when it is not a snapshot
    pub fn parse(output: &str) -> Option<Self> {
        serde_json::from_str(output.trim()).ok()
    }

    /// Count the number of elements with refs
    pub fn count_elements(&self) -> usize {
        self.data.as_ref().map(|d| d.refs.len()).unwrap_or(0)
    }

    /// Interactive elements ordered by ref number
    pub fn interactive_elements(&self) -> Vec<SnapshotElement> {
        let Some(data) = &self.data else {
            return Vec::new();
        };

        let mut elements: Vec<SnapshotElement> = data
            .refs
            .iter()
            .filter(|(_, el)| el.is_interactive())
            .map(|(reference, el)| SnapshotElement {
                reference: reference.clone(),
                role: el.role.clone(),
                name: el.name.clone(),
                value: el.value.clone(),
            })
            .collect();

        elements.sort_by_key(|el| ref_number(&el.reference));
        elements
    }

    /// Get the raw accessibility tree string
    pub fn raw_tree(&self) -> Option<&str> {
        self.data
            .as_ref()
            .map(|d| d.snapshot.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// `e12` -> 12; refs without a number sort last
fn ref_number(reference: &str) -> u64 {
    reference
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(u64::MAX)
}
