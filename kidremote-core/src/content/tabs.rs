use std::fmt;

use crate::content::NormalizedContent;

pub const DEFAULT_TAB: &str = "remote";
const FALLBACK_ICON: &str = "📱";

/// Screen areas whose visibility follows the active tab.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Section {
    RemoteColumn,
    QuickColumn,
    QuickLaunchGrid,
    LightControls,
    MagicColumn,
}

pub const ALL_SECTIONS: &[Section] = &[
    Section::RemoteColumn,
    Section::QuickColumn,
    Section::QuickLaunchGrid,
    Section::LightControls,
    Section::MagicColumn,
];

pub struct TabDefinition {
    pub id: &'static str,
    pub default_label: &'static str,
    pub default_icon: &'static str,
    pub sections: &'static [Section],
}

pub const TAB_DEFINITIONS: &[TabDefinition] = &[
    TabDefinition {
        id: "remote",
        default_label: "Remote",
        default_icon: "🎮",
        sections: &[Section::RemoteColumn],
    },
    TabDefinition {
        id: "apps",
        default_label: "Roku",
        default_icon: "📺",
        sections: &[Section::QuickColumn, Section::QuickLaunchGrid],
    },
    TabDefinition {
        id: "lights",
        default_label: "Lights",
        default_icon: "💡",
        sections: &[Section::LightControls],
    },
    TabDefinition {
        id: "magic",
        default_label: "Magic Time",
        default_icon: "⏱️",
        sections: &[Section::MagicColumn],
    },
];

pub fn definition(id: &str) -> Option<&'static TabDefinition> {
    TAB_DEFINITIONS.iter().find(|def| def.id == id)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabView {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub sections: Vec<Section>,
}

impl From<&TabDefinition> for TabView {
    fn from(def: &TabDefinition) -> Self {
        Self {
            id: def.id.to_string(),
            label: def.default_label.to_string(),
            icon: def.default_icon.to_string(),
            sections: def.sections.to_vec(),
        }
    }
}

/// Tabs of the loaded document with display defaults filled in, or the four
/// built-in tabs when nothing has been loaded yet.  Unknown ids are kept but
/// own no sections.
pub fn tabs_for_rendering(content: Option<&NormalizedContent>) -> Vec<TabView> {
    let Some(content) = content else {
        return TAB_DEFINITIONS.iter().map(TabView::from).collect();
    };
    content
        .tabs
        .iter()
        .map(|tab| {
            let def = definition(&tab.id);
            TabView {
                id: tab.id.clone(),
                label: tab
                    .label
                    .clone()
                    .or_else(|| def.map(|d| d.default_label.to_string()))
                    .unwrap_or_else(|| tab.id.clone()),
                icon: tab
                    .icon
                    .clone()
                    .or_else(|| def.map(|d| d.default_icon.to_string()))
                    .unwrap_or_else(|| FALLBACK_ICON.to_string()),
                sections: def.map(|d| d.sections.to_vec()).unwrap_or_default(),
            }
        })
        .collect()
}

/// The requested tab if it is on screen, otherwise the remote tab.
pub fn resolve_active_tab<'a>(requested: &'a str, tabs: &[TabView]) -> &'a str {
    if tabs.iter().any(|tab| tab.id == requested) {
        requested
    } else {
        DEFAULT_TAB
    }
}

/// Sections shown for `active`, falling back to the first tab's.
pub fn visible_sections(active: &str, tabs: &[TabView]) -> Vec<Section> {
    tabs.iter()
        .find(|tab| tab.id == active)
        .or_else(|| tabs.first())
        .map(|tab| tab.sections.clone())
        .unwrap_or_default()
}

/// One line per tab for the settings panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabSummary {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub button_count: usize,
    pub quick_launch_count: usize,
}

impl fmt::Display for TabSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}] Content: {} buttons", self.icon, self.label, self.id, self.button_count)?;
        if self.quick_launch_count > 0 {
            write!(f, ", {} quick launch items", self.quick_launch_count)?;
        }
        Ok(())
    }
}

pub fn tab_summaries(content: Option<&NormalizedContent>) -> Vec<TabSummary> {
    tabs_for_rendering(content)
        .into_iter()
        .map(|view| {
            let entry = content.and_then(|c| c.tab(&view.id));
            TabSummary {
                button_count: entry.map_or(0, |e| e.button_count),
                quick_launch_count: entry.map_or(0, |e| e.quick_launch_count),
                id: view.id,
                label: view.label,
                icon: view.icon,
            }
        })
        .collect()
}
