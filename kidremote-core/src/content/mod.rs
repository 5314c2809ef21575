//! Kid-mode content: fetching the configuration document, normalizing it
//! into buttons and quick-launch items, and the tab layout.

pub mod cloud;
pub mod fetch;
pub mod normalize;
pub mod tabs;

use serde_json::{Map, Value};

use crate::handlers::HandlerId;

pub use self::{
    fetch::{load_content, ContentProvider, ContentSource, DefaultProvider, LoadedContent},
    normalize::{apply_content, NormalizedContent},
};

pub const FALLBACK_ACTION_KEY: &str = "__quick_action__";

/// A curated shortcut, usually a video, shown ahead of the app buttons.
#[derive(Clone, Debug, PartialEq)]
pub struct QuickLaunchItem {
    /// Always populated after normalization.
    pub id: String,
    pub label: String,
    pub kind: Option<String>,
    pub video_id: Option<String>,
    pub thumbnail: Option<String>,
    pub app_name: Option<String>,
    pub handler: Option<String>,
    pub resolved_handler: Option<HandlerId>,
    pub args: Vec<Value>,
}

impl QuickLaunchItem {
    pub fn is_youtube(&self) -> bool {
        self.kind.as_deref() == Some("youtube")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppLaunch {
    pub app_id: Option<String>,
    pub app_name: Option<String>,
    pub label: Option<String>,
    pub params: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HandlerCall {
    pub handler: HandlerId,
    pub args: Vec<Value>,
}

/// What activating a button does, decided once at normalization time.
/// Checked in declaration order: a quick-launch passthrough wins over an
/// app launch, which wins over a named handler.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    QuickLaunch(Box<QuickLaunchItem>),
    LaunchApp(AppLaunch),
    Handler(HandlerCall),
    UnknownHandler(String),
    Nothing,
}

/// How a button is drawn, decided purely by whether it has a thumbnail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardStyle {
    Thumbnail { src: String },
    Icon { emoji: String },
}

pub const DEFAULT_EMOJI: &str = "🔘";

#[derive(Clone, Debug, PartialEq)]
pub struct ButtonSpec {
    pub id: Option<String>,
    pub label: String,
    pub emoji: Option<String>,
    pub thumbnail: Option<String>,
    pub category: Option<String>,
    pub favorite_label_id: Option<String>,
    pub action: Action,
    /// Identity used by the cooldown gate.
    pub key: String,
    /// The document entry this button came from, kept for the editor.
    pub raw: Value,
}

impl ButtonSpec {
    pub fn style(&self) -> CardStyle {
        match &self.thumbnail {
            Some(src) => CardStyle::Thumbnail { src: src.clone() },
            None => CardStyle::Icon {
                emoji: self
                    .emoji
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EMOJI.to_string()),
            },
        }
    }

    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail.is_some()
    }

    /// Presents a quick-launch item as a button of the quick-access column.
    pub fn from_quick_launch(item: &QuickLaunchItem) -> Self {
        Self {
            id: Some(format!("{}-button", item.id)),
            label: item.label.clone(),
            emoji: None,
            thumbnail: item.thumbnail.clone(),
            category: None,
            favorite_label_id: None,
            action: Action::QuickLaunch(Box::new(item.clone())),
            key: item.id.clone(),
            raw: Value::Null,
        }
    }
}
