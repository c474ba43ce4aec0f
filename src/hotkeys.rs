//! Dataset hotkey resolution.
//!
//! Datasets ship a key-to-action map of string directives; this module
//! parses them into typed requests the host routes to class selection or
//! tool activation. Unknown or malformed directives resolve to nothing
//! and log a warning, so a bad dataset config never breaks input.

use std::collections::HashMap;

use crate::model::ClassId;

/// Parsed hotkey directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyRequest {
    SelectClass(ClassId),
    ActivateTool(String),
}

#[derive(Default)]
pub struct HotkeyManager {
    bindings: HashMap<String, String>,
}

impl HotkeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bindings with a dataset's hotkey map.
    pub fn set_bindings(&mut self, bindings: HashMap<String, String>) {
        self.bindings = bindings;
    }

    pub fn bind(&mut self, key: impl Into<String>, directive: impl Into<String>) {
        self.bindings.insert(key.into(), directive.into());
    }

    /// Resolve a pressed key into a request, if it is bound.
    pub fn resolve(&self, key: &str) -> Option<HotkeyRequest> {
        let directive = self.bindings.get(key)?;
        match parse_directive(directive) {
            Some(request) => Some(request),
            None => {
                log::warn!("unparseable hotkey directive '{directive}' bound to '{key}'");
                None
            }
        }
    }
}

fn parse_directive(directive: &str) -> Option<HotkeyRequest> {
    let (action, argument) = directive.split_once(':')?;
    match action {
        "select_class" => argument.parse().ok().map(HotkeyRequest::SelectClass),
        "activate_tool" => Some(HotkeyRequest::ActivateTool(argument.to_string())),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_select_class() {
        let mut hotkeys = HotkeyManager::new();
        hotkeys.bind("1", "select_class:17");
        hotkeys.bind("b", "activate_tool:brush_tool");
        hotkeys.bind("x", "select_class:not_a_number");

        assert_eq!(hotkeys.resolve("1"), Some(HotkeyRequest::SelectClass(17)));
        assert_eq!(
            hotkeys.resolve("b"),
            Some(HotkeyRequest::ActivateTool("brush_tool".to_string()))
        );
        assert_eq!(hotkeys.resolve("x"), None);
        assert_eq!(hotkeys.resolve("unbound"), None);
    }
}
