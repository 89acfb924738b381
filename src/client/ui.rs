//! Page surface seam
//!
//! The router and session only need three things from the page: replace an
//! element's content, append an output option, and read the selected option.
//! [`UiModel`] is an in-memory page used by the replay client and the tests.

use std::collections::HashMap;

/// What the client needs from the page it runs in
pub trait UiSurface: Send {
    /// Replace the content of element `id`. Returns `false` when no such
    /// element exists.
    fn update_element(&mut self, id: &str, html: &str) -> bool;

    /// Append a selectable output option labelled `label`
    fn append_output_option(&mut self, label: &str);

    /// Label of the selected output option, empty when nothing is selected
    fn selected_output(&self) -> String;
}

/// In-memory page with per-hand readout elements and an output selector
#[derive(Debug, Clone)]
pub struct UiModel {
    elements: HashMap<String, String>,
    options: Vec<String>,
    selected: Option<usize>,
    preferred: Option<String>,
}

impl Default for UiModel {
    fn default() -> Self {
        Self::new()
    }
}

impl UiModel {
    /// A page with the `left` and `right` readout elements
    pub fn new() -> Self {
        let mut model = Self {
            elements: HashMap::new(),
            options: Vec::new(),
            selected: None,
            preferred: None,
        };
        model.register_element("left");
        model.register_element("right");
        model
    }

    /// Select `label` as soon as it is offered, instead of the first option
    pub fn with_preferred_output(mut self, label: Option<String>) -> Self {
        self.preferred = label;
        self
    }

    pub fn register_element(&mut self, id: &str) {
        self.elements.entry(id.to_string()).or_default();
    }

    pub fn element(&self, id: &str) -> Option<&str> {
        self.elements.get(id).map(String::as_str)
    }

    pub fn output_options(&self) -> &[String] {
        &self.options
    }

    /// Select an offered option by label; `false` if it was never offered
    pub fn select_output(&mut self, label: &str) -> bool {
        match self.options.iter().position(|o| o == label) {
            Some(index) => {
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }
}

impl UiSurface for UiModel {
    fn update_element(&mut self, id: &str, html: &str) -> bool {
        match self.elements.get_mut(id) {
            Some(content) => {
                *content = html.to_string();
                true
            }
            None => false,
        }
    }

    fn append_output_option(&mut self, label: &str) {
        self.options.push(label.to_string());
        let index = self.options.len() - 1;

        // A select element shows its first option until told otherwise.
        let preferred = self.preferred.as_deref() == Some(label);
        if self.selected.is_none() || preferred {
            self.selected = Some(index);
        }
    }

    fn selected_output(&self) -> String {
        self.selected
            .and_then(|i| self.options.get(i))
            .cloned()
            .unwrap_or_default()
    }
}
