//! Prints everything the controller wants on screen as plain text lines.

use kidremote_core::{
    content::tabs::{Section, TabView},
    render::{CardKind, ColumnId, ColumnView, QuickLaunchTile},
    surface::{SpeechOutcome, StatusVariant, Surface, Theme, TimerView},
};

#[derive(Default)]
pub struct TextSurface {
    last_countdown: String,
}

impl Surface for TextSurface {
    fn show_status(&mut self, variant: StatusVariant, message: &str) {
        println!("{} {}", variant.icon(), message);
    }

    fn hide_status(&mut self) {}

    fn render_column(&mut self, column: ColumnId, view: &ColumnView) {
        match view {
            ColumnView::Empty { message: Some(message) } => println!("[{}] {}", column, message),
            ColumnView::Empty { message: None } => println!("[{}]", column),
            ColumnView::Cards(cards) => {
                println!("[{}]", column);
                for (index, card) in cards.iter().enumerate() {
                    match &card.kind {
                        CardKind::Thumbnail { caption, .. } => {
                            println!("  {:>2}. 🖼  {}", index, caption)
                        }
                        CardKind::Icon { emoji, label, .. } => {
                            println!("  {:>2}. {} {}", index, emoji, label)
                        }
                    }
                }
            }
        }
    }

    fn render_quick_launch(&mut self, tiles: Option<&[QuickLaunchTile]>) {
        let Some(tiles) = tiles else {
            return;
        };
        println!("[quick launch]");
        for (index, tile) in tiles.iter().enumerate() {
            println!("  {:>2}. {}", index, tile.alt);
        }
    }

    fn render_tabs(&mut self, tabs: &[TabView], active: &str) {
        let bar: Vec<String> = tabs
            .iter()
            .map(|tab| {
                if tab.id == active {
                    format!("[{} {}]", tab.icon, tab.label)
                } else {
                    format!(" {} {} ", tab.icon, tab.label)
                }
            })
            .collect();
        println!("{}", bar.join(" "));
    }

    fn set_visible_sections(&mut self, sections: &[Section]) {
        log::debug!("visible sections: {:?}", sections);
    }

    fn set_settings_visible(&mut self, visible: bool) {
        if visible {
            println!("⚙️  advanced controls visible");
        }
    }

    fn set_hold_progress(&mut self, offset: f64) {
        log::debug!("hold ring offset {:.1}", offset);
    }

    fn show_pin_pad(&mut self, visible: bool) {
        if visible {
            println!("🔒 enter PIN with `pin <digits>`");
        }
    }

    fn set_pin_display(&mut self, text: &str, _error: bool) {
        println!("🔒 {}", text);
    }

    fn set_pin_status(&mut self, text: &str) {
        println!("🔑 {}", text);
    }

    fn set_content_info(&mut self, text: &str) {
        println!("📦 {}", text);
    }

    fn show_config_editor(&mut self, document: &str) {
        println!("{}", document);
    }

    fn show_cloud_state(&mut self, state: &str) {
        println!("{}", state);
    }

    fn show_timer(&mut self, view: &TimerView) {
        println!("{} {} ({})", view.emoji, view.label, view.original);
    }

    fn update_timer(&mut self, countdown: &str) {
        // Frames arrive far faster than the display changes.
        if countdown != self.last_countdown {
            log::debug!("timer {}", countdown);
            self.last_countdown = countdown.to_string();
        }
    }

    fn hide_timer(&mut self) {
        self.last_countdown.clear();
    }

    fn show_fireworks(&mut self, message: &str) {
        println!("🎆 {}", message);
    }

    fn burst(&mut self, x: f64, y: f64) {
        log::debug!("burst at {:.2}, {:.2}", x, y);
    }

    fn hide_fireworks(&mut self) {}

    fn speak(&mut self, text: &str) -> SpeechOutcome {
        println!("🔊 {}", text);
        SpeechOutcome::Started
    }

    fn stop_speaking(&mut self) {}

    fn apply_theme(&mut self, theme: Theme) {
        println!("🎨 {} theme", theme);
    }
}
