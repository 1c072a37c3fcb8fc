//! UI descriptors
//!
//! A front-end (CLI prompts, GUI, silent runner) looks up the [`UiMapping`] for
//! the current state and renders whatever its [`UiComponent`] calls for. The
//! descriptor carries no rendering logic.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

/// Kind of screen a state is rendered as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UiComponent {
    Welcome,
    License,
    ComponentList,
    DirectoryPicker,
    Summary,
    Progress,
    Finish,
    Error,
    Rollback,
    ThemePicker,
    Custom,
}

/// Descriptor for rendering one state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiMapping {
    pub title: String,
    pub description: String,
    pub component: UiComponent,
    /// Label of the forward button
    pub next_label: String,
    pub show_back: bool,
    pub show_cancel: bool,
}

impl UiMapping {
    pub fn new(title: impl Into<String>, component: UiComponent) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            component,
            next_label: "Next".to_string(),
            show_back: true,
            show_cancel: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_next_label(mut self, label: impl Into<String>) -> Self {
        self.next_label = label.into();
        self
    }

    pub fn without_back(mut self) -> Self {
        self.show_back = false;
        self
    }

    pub fn without_cancel(mut self) -> Self {
        self.show_cancel = false;
        self
    }
}
