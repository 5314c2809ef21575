use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use serde_json::{Map, Value};

use kidremote_protocol::roku::YOUTUBE_APP_ID;

use crate::{
    content::{Action, AppLaunch, ButtonSpec, HandlerCall, QuickLaunchItem},
    surface::StatusVariant,
};

pub const QUICK_ACTION_COOLDOWN: Duration = Duration::from_millis(1000);

const COOLDOWN_MESSAGE: &str = "Hang on, that action is already starting...";

/// Side effects requested by a button press, performed by the controller.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Status(StatusVariant, String),
    Speak(String),
    LaunchApp(AppLaunch),
    RunHandler(HandlerCall),
}

/// Per-key debounce: a key is accepted at most once per cooldown window.
#[derive(Default)]
pub struct Cooldown {
    last_accepted: HashMap<String, Instant>,
}

impl Cooldown {
    pub fn try_accept(&mut self, key: &str, now: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(key) {
            if now.saturating_duration_since(*last) < QUICK_ACTION_COOLDOWN {
                return false;
            }
        }
        self.last_accepted.insert(key.to_string(), now);
        true
    }
}

#[derive(Default)]
pub struct Dispatcher {
    cooldown: Cooldown,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, button: &ButtonSpec, now: Instant) -> Vec<Effect> {
        match &button.action {
            Action::QuickLaunch(item) => self.quick_launch(item, now),
            Action::LaunchApp(app) => {
                if !self.cooldown.try_accept(&button.key, now) {
                    return vec![cooldown_status()];
                }
                let mut effects = Vec::with_capacity(2);
                let announce = app
                    .app_name
                    .as_deref()
                    .or(app.label.as_deref())
                    .unwrap_or_default()
                    .trim();
                if !announce.is_empty() {
                    effects.push(Effect::Speak(format!("Opening {}", announce)));
                }
                effects.push(Effect::LaunchApp(app.clone()));
                effects
            }
            Action::Handler(call) => vec![Effect::RunHandler(call.clone())],
            Action::UnknownHandler(name) => {
                log::warn!("handler \"{}\" is not available", name);
                vec![Effect::Status(
                    StatusVariant::Error,
                    "That action is not ready yet.".to_string(),
                )]
            }
            Action::Nothing => {
                log::warn!("button \"{}\" has no handler", button.key);
                Vec::new()
            }
        }
    }

    pub fn quick_launch(&mut self, item: &QuickLaunchItem, now: Instant) -> Vec<Effect> {
        if !self.cooldown.try_accept(&item.id, now) {
            return vec![cooldown_status()];
        }
        let mut effects = Vec::with_capacity(2);
        let announce = if item.label.trim().is_empty() {
            item.app_name.as_deref().unwrap_or_default().trim()
        } else {
            item.label.trim()
        };
        if !announce.is_empty() {
            let kind = item.kind.as_deref().unwrap_or_default().to_lowercase();
            let verb = if kind == "youtube" || kind == "video" {
                "Playing"
            } else {
                "Opening"
            };
            effects.push(Effect::Speak(format!("{} {}", verb, announce)));
        }

        match (&item.video_id, item.resolved_handler) {
            (Some(video_id), _) if item.is_youtube() => {
                effects.push(Effect::LaunchApp(youtube_launch(video_id)));
            }
            (_, Some(handler)) => effects.push(Effect::RunHandler(HandlerCall {
                handler,
                args: item.args.clone(),
            })),
            _ => effects.push(Effect::Status(
                StatusVariant::Error,
                "Quick launch is missing an action.".to_string(),
            )),
        }
        effects
    }
}

/// Launch request that plays `video_id` in the TV's YouTube app.
pub fn youtube_launch(video_id: &str) -> AppLaunch {
    let mut params = Map::new();
    params.insert("contentId".into(), Value::from(video_id));
    params.insert("mediaType".into(), Value::from("live"));
    AppLaunch {
        app_id: Some(YOUTUBE_APP_ID.to_string()),
        app_name: None,
        label: Some("YouTube".to_string()),
        params,
    }
}

fn cooldown_status() -> Effect {
    Effect::Status(StatusVariant::Info, COOLDOWN_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{content::apply_content, handlers::HandlerId};

    fn buttons(doc: Value) -> Vec<ButtonSpec> {
        apply_content(json!({ "tabs": [{ "id": "remote", "buttons": doc }] })).remote_buttons
    }

    #[test]
    fn repeat_within_cooldown_is_suppressed() {
        let button = &buttons(json!([{ "appId": "12", "appName": "Netflix" }]))[0];
        let mut dispatcher = Dispatcher::new();
        let start = Instant::now();

        let first = dispatcher.dispatch(button, start);
        assert_eq!(first[0], Effect::Speak("Opening Netflix".into()));
        assert!(matches!(&first[1], Effect::LaunchApp(app) if app.app_id.as_deref() == Some("12")));

        let second = dispatcher.dispatch(button, start + Duration::from_millis(999));
        assert_eq!(second, vec![cooldown_status()]);

        let third = dispatcher.dispatch(button, start + Duration::from_millis(1000));
        assert_eq!(third.len(), 2);
    }

    #[test]
    fn rejected_press_does_not_extend_the_window() {
        let mut cooldown = Cooldown::default();
        let start = Instant::now();
        assert!(cooldown.try_accept("k", start));
        assert!(!cooldown.try_accept("k", start + Duration::from_millis(600)));
        assert!(cooldown.try_accept("k", start + Duration::from_millis(1100)));
        assert!(cooldown.try_accept("other", start + Duration::from_millis(1100)));
    }

    #[test]
    fn youtube_quick_launch_plays_video() {
        let item = crate::content::normalize::normalize_quick_launch_item(
            &json!({ "type": "youtube", "videoId": "abc123", "label": "Songs" }),
            0,
        );
        let effects = Dispatcher::new().quick_launch(&item, Instant::now());
        assert_eq!(effects[0], Effect::Speak("Playing Songs".into()));
        let Effect::LaunchApp(app) = &effects[1] else {
            panic!("expected launch");
        };
        assert_eq!(app.app_id.as_deref(), Some("837"));
        assert_eq!(app.params["contentId"], "abc123");
        assert_eq!(app.params["mediaType"], "live");
    }

    #[test]
    fn quick_launch_without_action_reports_error() {
        let item = crate::content::normalize::normalize_quick_launch_item(
            &json!({ "label": "Zoo", "handler": "feedTheLions" }),
            0,
        );
        let effects = Dispatcher::new().quick_launch(&item, Instant::now());
        assert_eq!(
            effects,
            vec![
                Effect::Speak("Opening Zoo".into()),
                Effect::Status(StatusVariant::Error, "Quick launch is missing an action.".into()),
            ]
        );
    }

    #[test]
    fn quick_launch_runs_named_handler() {
        let item = crate::content::normalize::normalize_quick_launch_item(
            &json!({ "handler": "startToddlerTimer", "args": [60, "Nap"] }),
            0,
        );
        let effects = Dispatcher::new().quick_launch(&item, Instant::now());
        assert_eq!(
            effects,
            vec![Effect::RunHandler(HandlerCall {
                handler: HandlerId::StartTimer,
                args: vec![json!(60), json!("Nap")],
            })]
        );
    }

    #[test]
    fn handlers_skip_the_cooldown() {
        let button = &buttons(json!([{ "handler": "speakTts", "args": "hi" }]))[0];
        let mut dispatcher = Dispatcher::new();
        let now = Instant::now();
        assert_eq!(dispatcher.dispatch(button, now).len(), 1);
        assert_eq!(dispatcher.dispatch(button, now).len(), 1);
    }

    #[test]
    fn unknown_and_missing_handlers() {
        let list = buttons(json!([{ "handler": "alert" }, { "label": "Nothing" }]));
        let mut dispatcher = Dispatcher::new();
        let now = Instant::now();
        assert_eq!(
            dispatcher.dispatch(&list[0], now),
            vec![Effect::Status(StatusVariant::Error, "That action is not ready yet.".into())]
        );
        assert!(dispatcher.dispatch(&list[1], now).is_empty());
    }

    #[test]
    fn app_announcement_falls_back_to_label() {
        let button = &buttons(json!([{ "appId": "5", "label": "  PBS Kids " }]))[0];
        let effects = Dispatcher::new().dispatch(button, Instant::now());
        assert_eq!(effects[0], Effect::Speak("Opening PBS Kids".into()));
    }
}
