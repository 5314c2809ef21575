use serde_json::{json, Map, Value};

use crate::{
    content::{
        Action, AppLaunch, ButtonSpec, HandlerCall, QuickLaunchItem, FALLBACK_ACTION_KEY,
    },
    gate::is_valid_pin,
    handlers::HandlerId,
    util::{now_rfc3339, unix_millis},
};

/// A tab as it appeared in the document.  Display defaults are applied later
/// by `tabs::tabs_for_rendering`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabEntry {
    pub id: String,
    pub label: Option<String>,
    pub icon: Option<String>,
    pub button_count: usize,
    pub quick_launch_count: usize,
}

/// In-memory form of a configuration document.  Every load replaces the
/// previous value wholesale.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedContent {
    /// The document exactly as loaded, kept for editing round trips.
    pub raw: Value,
    pub tabs: Vec<TabEntry>,
    pub remote_buttons: Vec<ButtonSpec>,
    pub apps_buttons: Vec<ButtonSpec>,
    pub magic_buttons: Vec<ButtonSpec>,
    pub quick_launch: Vec<QuickLaunchItem>,
    /// `settings.parentalPin`, if the document carries a valid one.
    pub remote_pin: Option<String>,
    /// Problems noticed while normalizing, e.g. unknown handler names.
    pub warnings: Vec<String>,
}

impl Default for NormalizedContent {
    fn default() -> Self {
        apply_content(json!({ "tabs": [] }))
    }
}

impl NormalizedContent {
    /// Remote, apps and magic buttons, in that order.
    pub fn all_buttons(&self) -> impl Iterator<Item = &ButtonSpec> {
        self.remote_buttons
            .iter()
            .chain(&self.apps_buttons)
            .chain(&self.magic_buttons)
    }

    pub fn tab(&self, id: &str) -> Option<&TabEntry> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    /// Document to show in the config editor: the loaded one if it is a
    /// proper document, otherwise one rebuilt from the normalized buttons.
    pub fn editor_document(&self) -> Value {
        if self.raw.get("tabs").is_some_and(Value::is_array) {
            self.raw.clone()
        } else {
            self.rebuild_document()
        }
    }

    pub fn rebuild_document(&self) -> Value {
        let by_category = |wanted: &[Option<&str>]| -> Vec<Value> {
            self.all_buttons()
                .filter(|button| wanted.contains(&button.category.as_deref()))
                .map(|button| button.raw.clone())
                .collect()
        };
        let quick_launch: Vec<Value> = self.quick_launch.iter().map(quick_launch_json).collect();
        let tabs = vec![
            json!({
                "id": "remote", "label": "Remote", "icon": "🎮",
                "buttons": by_category(&[Some("kidMode-remote"), None]),
            }),
            json!({
                "id": "apps", "label": "Roku", "icon": "📺",
                "buttons": by_category(&[Some("kidMode-content")]),
                "quickLaunch": quick_launch,
            }),
            json!({
                "id": "lights", "label": "Lights", "icon": "💡",
                "buttons": by_category(&[Some("lights")]),
            }),
            json!({
                "id": "magic", "label": "Magic Time", "icon": "⏱️",
                "buttons": by_category(&[Some("magic")]),
            }),
        ];
        let tabs: Vec<Value> = tabs
            .into_iter()
            .filter(|tab| {
                let has = |field: &str| tab[field].as_array().is_some_and(|a| !a.is_empty());
                has("buttons") || has("quickLaunch")
            })
            .collect();
        json!({
            "tabs": tabs,
            "version": "1.0.0",
            "lastUpdated": now_rfc3339(),
        })
    }
}

/// Turns a raw configuration document into buttons and quick-launch items.
/// Never fails: missing or malformed fields fall back to empty values.
pub fn apply_content(doc: Value) -> NormalizedContent {
    let mut warnings = Vec::new();

    let remote_pin = match doc.get("settings").and_then(|s| s.get("parentalPin")) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let pin = value.as_str().filter(|pin| is_valid_pin(pin));
            if pin.is_none() {
                warnings.push(format!("ignoring invalid settings.parentalPin {}", value));
            }
            pin.map(str::to_string)
        }
    };

    let raw_tabs: &[Value] = doc
        .get("tabs")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let tabs = raw_tabs
        .iter()
        .filter_map(|tab| {
            let id = str_field(tab, "id")?;
            Some(TabEntry {
                id,
                label: str_field(tab, "label"),
                icon: str_field(tab, "icon"),
                button_count: array_field(tab, "buttons").len(),
                quick_launch_count: array_field(tab, "quickLaunch").len(),
            })
        })
        .collect();

    let find_tab = |id: &str| {
        raw_tabs
            .iter()
            .find(|tab| tab.get("id").and_then(Value::as_str) == Some(id))
    };
    let mut buttons_of = |id: &str| -> Vec<ButtonSpec> {
        find_tab(id)
            .map(|tab| array_field(tab, "buttons"))
            .unwrap_or_default()
            .iter()
            .map(|raw| normalize_button(raw, &mut warnings))
            .collect()
    };
    let remote_buttons = buttons_of("remote");
    let apps_buttons = buttons_of("apps");
    let magic_buttons = buttons_of("magic");

    let now = unix_millis();
    let quick_launch = find_tab("apps")
        .map(|tab| array_field(tab, "quickLaunch"))
        .unwrap_or_default()
        .iter()
        .map(|raw| {
            let item = normalize_quick_launch_item(raw, now);
            if let (Some(name), None) = (&item.handler, item.resolved_handler) {
                warnings.push(format!(
                    "quick launch \"{}\" uses unknown handler \"{}\"",
                    item.id, name
                ));
            }
            item
        })
        .collect();

    for warning in &warnings {
        log::warn!("content: {}", warning);
    }

    NormalizedContent {
        raw: doc,
        tabs,
        remote_buttons,
        apps_buttons,
        magic_buttons,
        quick_launch,
        remote_pin,
        warnings,
    }
}

/// Fills in the derived fields of a quick-launch item.  `now_millis` is only
/// used for the last-resort id of an item with neither video nor label.
pub fn normalize_quick_launch_item(raw: &Value, now_millis: u128) -> QuickLaunchItem {
    let kind = str_field(raw, "type");
    let video_id = str_field(raw, "videoId");
    let label = str_field(raw, "label").unwrap_or_default();
    let is_youtube = kind.as_deref() == Some("youtube");

    let id = str_field(raw, "id").unwrap_or_else(|| match (&video_id, is_youtube) {
        (Some(video_id), true) => format!("yt-{}", video_id),
        _ if !label.is_empty() => format!("ql-{}", slugify(&label)),
        _ => format!("ql-{}", now_millis),
    });

    let thumbnail = str_field(raw, "thumbnail").or_else(|| match (&video_id, is_youtube) {
        (Some(video_id), true) => Some(youtube_thumbnail(video_id)),
        _ => None,
    });

    let handler = str_field(raw, "handler");
    let resolved_handler = handler.as_deref().and_then(HandlerId::from_name);

    QuickLaunchItem {
        id,
        label,
        kind,
        video_id,
        thumbnail,
        app_name: str_field(raw, "appName"),
        handler,
        resolved_handler,
        args: normalize_args(raw.get("args")),
    }
}

pub fn youtube_thumbnail(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", video_id)
}

/// Lower-cases and replaces every run of whitespace with a single `-`.
fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut in_space = false;
    for ch in label.chars() {
        if ch.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
        } else {
            slug.extend(ch.to_lowercase());
            in_space = false;
        }
    }
    slug
}

fn normalize_button(raw: &Value, warnings: &mut Vec<String>) -> ButtonSpec {
    let id = str_field(raw, "id");
    let label = str_field(raw, "label");
    let app_id = str_field(raw, "appId");
    let app_name = str_field(raw, "appName");

    let key = id
        .clone()
        .or_else(|| app_id.clone())
        .or_else(|| app_name.clone())
        .or_else(|| label.clone())
        .unwrap_or_else(|| FALLBACK_ACTION_KEY.to_string());

    let action = if let Some(item) = raw.get("launchItem").filter(|v| is_truthy(v)) {
        Action::QuickLaunch(Box::new(normalize_quick_launch_item(item, unix_millis())))
    } else if app_id.is_some() || app_name.is_some() {
        Action::LaunchApp(AppLaunch {
            app_id,
            app_name,
            label: label.clone(),
            params: raw
                .get("params")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        })
    } else {
        match str_field(raw, "handler") {
            None => {
                warnings.push(format!("button \"{}\" has no action", key));
                Action::Nothing
            }
            Some(name) => match HandlerId::from_name(&name) {
                Some(handler) => {
                    let mut args = normalize_args(raw.get("args"));
                    if handler == HandlerId::LightRoutine && args.is_empty() {
                        if let Some(routine) = raw
                            .get("routine")
                            .and_then(Value::as_array)
                            .filter(|steps| !steps.is_empty())
                        {
                            args = vec![Value::Array(routine.clone())];
                        }
                    }
                    Action::Handler(HandlerCall { handler, args })
                }
                None => {
                    warnings.push(format!("button \"{}\" uses unknown handler \"{}\"", key, name));
                    Action::UnknownHandler(name)
                }
            },
        }
    };

    ButtonSpec {
        id,
        label: label.unwrap_or_default(),
        emoji: str_field(raw, "emoji"),
        thumbnail: str_field(raw, "thumbnail"),
        category: str_field(raw, "category"),
        favorite_label_id: str_field(raw, "favoriteLabelId"),
        action,
        key,
        raw: raw.clone(),
    }
}

/// Arrays pass through, any other value (`null` included) becomes a
/// one-element list, absence is empty.
pub fn normalize_args(args: Option<&Value>) -> Vec<Value> {
    match args {
        None => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

fn quick_launch_json(item: &QuickLaunchItem) -> Value {
    let mut map = Map::new();
    map.insert("id".into(), item.id.clone().into());
    map.insert("label".into(), item.label.clone().into());
    let optional = [
        ("type", &item.kind),
        ("videoId", &item.video_id),
        ("thumbnail", &item.thumbnail),
        ("appName", &item.app_name),
        ("handler", &item.handler),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            map.insert(name.into(), value.clone().into());
        }
    }
    if !item.args.is_empty() {
        map.insert("args".into(), Value::Array(item.args.clone()));
    }
    Value::Object(map)
}

/// Non-empty string field.
fn str_field(value: &Value, name: &str) -> Option<String> {
    value
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn array_field<'a>(value: &'a Value, name: &str) -> &'a [Value] {
    value
        .get(name)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
