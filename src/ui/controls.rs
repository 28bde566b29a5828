//! Control map: which element performs which UI action
//!
//! Defaults target the widget tree the viewer's web client renders today.
//! Each entry can be replaced from the `[controls]` section of the config
//! file without touching the scenario.

use std::collections::HashMap;
use std::fmt;

use crate::common::{Error, Result};

use super::locator::{css_string, xpath_literal, Locator};

/// Placeholder substituted in per-item locators
pub const LABEL_PLACEHOLDER: &str = "{label}";

/// Class of the workspace's display windows
pub const DISPLAY_WINDOW_CLASS: &str = "skel.widgets.Window.DisplayDesktop";

const BUTTON: &str = "qx.ui.form.Button";
const MENU_BUTTON: &str = "qx.ui.menu.Button";
const CHECK_BOX: &str = "qx.ui.form.CheckBox";
const LIST_ITEM: &str = "qx.ui.form.ListItem";

/// A UI action the scenario needs a control for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    SessionMenu,
    SessionSave,
    SessionRestore,
    SavePreferences,
    SaveLayout,
    SaveData,
    SaveName,
    SaveConfirm,
    SaveClose,
    RestoreSelector,
    /// Entry in the restore selector; `{label}` is the snapshot name
    SnapshotItem,
    RestoreConfirm,
    RestoreClose,
    LayoutMenu,
    /// Entry in the layout menu; `{label}` is the layout name
    LayoutItem,
    DisplayWindow,
}

impl Control {
    pub const ALL: [Control; 16] = [
        Control::SessionMenu,
        Control::SessionSave,
        Control::SessionRestore,
        Control::SavePreferences,
        Control::SaveLayout,
        Control::SaveData,
        Control::SaveName,
        Control::SaveConfirm,
        Control::SaveClose,
        Control::RestoreSelector,
        Control::SnapshotItem,
        Control::RestoreConfirm,
        Control::RestoreClose,
        Control::LayoutMenu,
        Control::LayoutItem,
        Control::DisplayWindow,
    ];

    /// Key used in the `[controls]` config section
    pub fn key(&self) -> &'static str {
        match self {
            Control::SessionMenu => "session_menu",
            Control::SessionSave => "session_save",
            Control::SessionRestore => "session_restore",
            Control::SavePreferences => "save_preferences",
            Control::SaveLayout => "save_layout",
            Control::SaveData => "save_data",
            Control::SaveName => "save_name",
            Control::SaveConfirm => "save_confirm",
            Control::SaveClose => "save_close",
            Control::RestoreSelector => "restore_selector",
            Control::SnapshotItem => "snapshot_item",
            Control::RestoreConfirm => "restore_confirm",
            Control::RestoreClose => "restore_close",
            Control::LayoutMenu => "layout_menu",
            Control::LayoutItem => "layout_item",
            Control::DisplayWindow => "display_window",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.key() == key)
    }

    fn default_locator(&self) -> Locator {
        match self {
            Control::SessionMenu => Locator::text_parent("Session"),
            Control::SessionSave => Locator::widget_text(MENU_BUTTON, "Save"),
            Control::SessionRestore => Locator::widget_text(MENU_BUTTON, "Restore"),
            Control::SavePreferences => Locator::widget_text(CHECK_BOX, "Preferences"),
            Control::SaveLayout => Locator::widget_text(CHECK_BOX, "Layout"),
            Control::SaveData => Locator::widget_text(CHECK_BOX, "Data"),
            Control::SaveName => {
                Locator::XPath("//input[@qxclass='qx.ui.form.TextField']".to_string())
            }
            Control::SaveConfirm => Locator::widget_text(BUTTON, "Save"),
            Control::SaveClose => Locator::widget_text(BUTTON, "Close"),
            Control::RestoreSelector => Locator::widget_class("qx.ui.form.SelectBox"),
            Control::SnapshotItem => Locator::widget_text(LIST_ITEM, LABEL_PLACEHOLDER),
            Control::RestoreConfirm => Locator::widget_text(BUTTON, "Restore"),
            Control::RestoreClose => Locator::widget_text(BUTTON, "Close"),
            Control::LayoutMenu => Locator::text_parent("Layout"),
            Control::LayoutItem => Locator::text_parent(LABEL_PLACEHOLDER),
            Control::DisplayWindow => Locator::widget_class(DISPLAY_WINDOW_CLASS),
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Locator per control
#[derive(Debug, Clone)]
pub struct ControlMap {
    locators: HashMap<Control, Locator>,
}

impl Default for ControlMap {
    fn default() -> Self {
        Self {
            locators: Control::ALL
                .iter()
                .map(|c| (*c, c.default_locator()))
                .collect(),
        }
    }
}

impl ControlMap {
    /// Defaults with the given overrides applied
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Result<Self> {
        let mut map = Self::default();
        for (key, spec) in overrides {
            let control = Control::from_key(key)
                .ok_or_else(|| Error::Config(format!("Unknown control '{}'", key)))?;
            let locator: Locator = spec.parse()?;
            tracing::debug!(control = %control, locator = %locator, "Control override");
            map.set(control, locator);
        }
        Ok(map)
    }

    pub fn set(&mut self, control: Control, locator: Locator) {
        self.locators.insert(control, locator);
    }

    /// Locator for a fixed control
    pub fn locator(&self, control: Control) -> Locator {
        self.locators
            .get(&control)
            .cloned()
            .unwrap_or_else(|| control.default_locator())
    }

    /// Locator for a per-item control with `{label}` filled in
    pub fn item_locator(&self, control: Control, label: &str) -> Locator {
        fill_label(self.locator(control), label)
    }
}

fn fill_label(locator: Locator, label: &str) -> Locator {
    let fill = |s: String| s.replace(LABEL_PLACEHOLDER, label);
    match locator {
        Locator::WidgetClass(class) => Locator::WidgetClass(fill(class)),
        Locator::TextParent(text) => Locator::TextParent(fill(text)),
        Locator::WidgetText { class, text } => Locator::WidgetText {
            class: fill(class),
            text: fill(text),
        },
        Locator::XPath(xpath) => Locator::XPath(substitute(&xpath, &xpath_literal(label))),
        Locator::Css(css) => Locator::Css(substitute(&css, &css_string(label))),
    }
}

/// Replace each placeholder in a raw query with a quoted literal. A
/// placeholder already wrapped in matching quotes loses those quotes.
fn substitute(query: &str, literal: &str) -> String {
    let mut out = String::with_capacity(query.len() + literal.len());
    let mut rest = query;

    while let Some(start) = rest.find(LABEL_PLACEHOLDER) {
        let before = &rest[..start];
        let after = &rest[start + LABEL_PLACEHOLDER.len()..];
        let quote = before
            .chars()
            .next_back()
            .filter(|q| matches!(q, '\'' | '"') && after.starts_with(*q));

        match quote {
            Some(q) => {
                out.push_str(&before[..before.len() - q.len_utf8()]);
                out.push_str(literal);
                rest = &after[q.len_utf8()..];
            }
            None => {
                out.push_str(before);
                out.push_str(literal);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
