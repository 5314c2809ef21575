//! Turns normalized content into the view models the surface draws.  The
//! controller keeps the button list behind every column so a tap at an
//! index maps back to its `ButtonSpec`.

use std::fmt;

use crate::content::{ButtonSpec, CardStyle, NormalizedContent};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ColumnId {
    Remote,
    Quick,
    Magic,
}

impl ColumnId {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "remote" => Some(ColumnId::Remote),
            "quick" | "apps" => Some(ColumnId::Quick),
            "magic" => Some(ColumnId::Magic),
            _ => None,
        }
    }

    /// Placeholder for an empty column.  The remote column just stays blank.
    fn empty_message(self) -> Option<&'static str> {
        match self {
            ColumnId::Remote => None,
            ColumnId::Quick => Some("No kid buttons configured yet."),
            ColumnId::Magic => Some("No magic buttons configured yet."),
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnId::Remote => f.write_str("remote"),
            ColumnId::Quick => f.write_str("quick"),
            ColumnId::Magic => f.write_str("magic"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardKind {
    /// Image-backed card with a caption over it.
    Thumbnail { src: String, caption: String },
    /// Emoji above a label.
    Icon {
        emoji: String,
        label: String,
        label_id: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub id: Option<String>,
    /// Accessible name; empty when the button has no label.
    pub aria_label: String,
    pub kind: CardKind,
}

impl Card {
    pub fn from_button(button: &ButtonSpec) -> Self {
        let kind = match button.style() {
            CardStyle::Thumbnail { src } => CardKind::Thumbnail {
                src,
                caption: non_empty_or(&button.label, "Watch"),
            },
            CardStyle::Icon { emoji } => CardKind::Icon {
                emoji,
                label: non_empty_or(&button.label, "Button"),
                label_id: button.favorite_label_id.clone(),
            },
        };
        Self {
            id: button.id.clone(),
            aria_label: button.label.clone(),
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnView {
    Empty { message: Option<&'static str> },
    Cards(Vec<Card>),
}

impl ColumnView {
    pub fn new(column: ColumnId, buttons: &[ButtonSpec]) -> Self {
        if buttons.is_empty() {
            ColumnView::Empty {
                message: column.empty_message(),
            }
        } else {
            ColumnView::Cards(buttons.iter().map(Card::from_button).collect())
        }
    }
}

/// Quick-launch items first, then app buttons with a thumbnail, then the
/// rest of the app buttons.
pub fn quick_column(content: &NormalizedContent) -> Vec<ButtonSpec> {
    let (with_images, without_images): (Vec<_>, Vec<_>) = content
        .apps_buttons
        .iter()
        .cloned()
        .partition(ButtonSpec::has_thumbnail);
    content
        .quick_launch
        .iter()
        .map(ButtonSpec::from_quick_launch)
        .chain(with_images)
        .chain(without_images)
        .collect()
}

pub fn column_buttons(column: ColumnId, content: &NormalizedContent) -> Vec<ButtonSpec> {
    match column {
        ColumnId::Remote => content.remote_buttons.clone(),
        ColumnId::Quick => quick_column(content),
        ColumnId::Magic => content.magic_buttons.clone(),
    }
}

/// Tile of the settings-only quick-launch grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuickLaunchTile {
    pub id: String,
    pub thumbnail: String,
    pub alt: String,
    pub caption: Option<String>,
}

/// The grid is only shown while settings are unlocked and there is
/// something to show.
pub fn quick_launch_grid(
    content: &NormalizedContent,
    settings_unlocked: bool,
) -> Option<Vec<QuickLaunchTile>> {
    if !settings_unlocked || content.quick_launch.is_empty() {
        return None;
    }
    Some(
        content
            .quick_launch
            .iter()
            .map(|item| QuickLaunchTile {
                id: item.id.clone(),
                thumbnail: item.thumbnail.clone().unwrap_or_default(),
                alt: non_empty_or(&item.label, "Quick launch item"),
                caption: Some(item.label.clone()).filter(|label| !label.is_empty()),
            })
            .collect(),
    )
}

fn non_empty_or(text: &str, fallback: &str) -> String {
    if text.is_empty() {
        fallback.to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::content::{apply_content, Action};

    fn content() -> NormalizedContent {
        apply_content(json!({
            "tabs": [{
                "id": "apps",
                "buttons": [
                    { "id": "plain-1", "label": "Plain", "appId": "1" },
                    { "id": "pic-1", "label": "Pic", "appId": "2", "thumbnail": "p.jpg" },
                    { "id": "plain-2", "appId": "3", "emoji": "🐢" },
                    { "id": "pic-2", "appId": "4", "thumbnail": "q.jpg" },
                ],
                "quickLaunch": [
                    { "type": "youtube", "videoId": "abc123", "label": "Songs" },
                ],
            }]
        }))
    }

    #[test]
    fn quick_column_orders_by_richness() {
        let ids: Vec<_> = quick_column(&content())
            .into_iter()
            .map(|b| b.id.unwrap_or_default())
            .collect();
        assert_eq!(ids, ["yt-abc123-button", "pic-1", "pic-2", "plain-1", "plain-2"]);
    }

    #[test]
    fn quick_launch_buttons_keep_their_item() {
        let column = quick_column(&content());
        assert!(matches!(&column[0].action, Action::QuickLaunch(item) if item.label == "Songs"));
        assert_eq!(column[0].key, "yt-abc123");
    }

    #[test]
    fn cards_follow_thumbnail_presence() {
        let column = quick_column(&content());
        let view = ColumnView::new(ColumnId::Quick, &column);
        let ColumnView::Cards(cards) = view else {
            panic!("expected cards");
        };
        assert_eq!(
            cards[2].kind,
            CardKind::Thumbnail {
                src: "q.jpg".into(),
                caption: "Watch".into()
            }
        );
        assert_eq!(
            cards[4].kind,
            CardKind::Icon {
                emoji: "🐢".into(),
                label: "Button".into(),
                label_id: None
            }
        );
        assert_eq!(cards[4].aria_label, "");
    }

    #[test]
    fn empty_columns_show_a_message() {
        let empty = apply_content(json!({ "tabs": [] }));
        assert_eq!(
            ColumnView::new(ColumnId::Quick, &column_buttons(ColumnId::Quick, &empty)),
            ColumnView::Empty {
                message: Some("No kid buttons configured yet.")
            }
        );
        assert_eq!(
            ColumnView::new(ColumnId::Magic, &[]),
            ColumnView::Empty {
                message: Some("No magic buttons configured yet.")
            }
        );
        assert_eq!(
            ColumnView::new(ColumnId::Remote, &[]),
            ColumnView::Empty { message: None }
        );
    }

    #[test]
    fn grid_needs_unlocked_settings() {
        let content = content();
        assert_eq!(quick_launch_grid(&content, false), None);
        let tiles = quick_launch_grid(&content, true).unwrap();
        assert_eq!(tiles[0].caption.as_deref(), Some("Songs"));
        assert!(tiles[0].thumbnail.ends_with("/abc123/maxresdefault.jpg"));
    }
}
