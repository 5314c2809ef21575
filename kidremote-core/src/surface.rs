//! The boundary between the controller and whatever draws the screen.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    content::tabs::{Section, TabView},
    render::{ColumnId, ColumnView, QuickLaunchTile},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusVariant {
    Info,
    Success,
    Error,
}

impl StatusVariant {
    pub fn icon(self) -> &'static str {
        match self {
            StatusVariant::Info => "ℹ️",
            StatusVariant::Success => "✅",
            StatusVariant::Error => "⚠️",
        }
    }
}

/// What the speech engine reported for a `speak` request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpeechOutcome {
    /// Speaking right away.
    Started,
    /// Accepted, but the voice is still loading.
    WarmingUp,
    Failed,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerView {
    pub label: String,
    pub emoji: String,
    /// Requested length as `m:ss`.
    pub original: String,
    /// Index into the spinner animations.
    pub animation: usize,
}

pub trait Surface: Send {
    fn show_status(&mut self, variant: StatusVariant, message: &str);
    fn hide_status(&mut self);

    /// Replaces the whole content of a column.
    fn render_column(&mut self, column: ColumnId, view: &ColumnView);
    /// `None` hides the grid.
    fn render_quick_launch(&mut self, tiles: Option<&[QuickLaunchTile]>);
    fn render_tabs(&mut self, tabs: &[TabView], active: &str);
    fn set_visible_sections(&mut self, sections: &[Section]);

    fn set_settings_visible(&mut self, visible: bool);
    /// Stroke offset of the hold ring, from the full arc down to zero.
    fn set_hold_progress(&mut self, offset: f64);
    fn show_pin_pad(&mut self, visible: bool);
    fn set_pin_display(&mut self, text: &str, error: bool);
    /// Which PIN the gate checks, shown in the settings panel.
    fn set_pin_status(&mut self, text: &str);
    /// Where the current buttons came from.
    fn set_content_info(&mut self, text: &str);
    /// Fills the config editor with a pretty-printed document.
    fn show_config_editor(&mut self, document: &str);
    fn show_cloud_state(&mut self, state: &str);

    fn show_timer(&mut self, view: &TimerView);
    fn update_timer(&mut self, countdown: &str);
    fn hide_timer(&mut self);

    fn show_fireworks(&mut self, message: &str);
    /// One particle burst at a relative position of the overlay.
    fn burst(&mut self, x: f64, y: f64);
    /// Hides the overlay and drops any particles still on screen.
    fn hide_fireworks(&mut self);

    fn speak(&mut self, text: &str) -> SpeechOutcome;
    fn stop_speaking(&mut self);

    fn apply_theme(&mut self, theme: Theme);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_names() {
        assert_eq!(Theme::from_name("light"), Theme::Light);
        assert_eq!(Theme::from_name("sepia"), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().as_str(), "light");
        assert_eq!(Theme::default(), Theme::Dark);
    }
}
