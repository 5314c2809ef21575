//! The single owner of all mutable application state.
//!
//! Input arrives as `Msg`s on the actor channel, blocking work (content
//! loads, device I/O, cloud uploads) runs on a small thread pool and reports
//! back with another `Msg`.  Whatever result arrives last wins.  Every
//! recurring or delayed callback lives in one `TimerSlot`, so re-arming a
//! concern always replaces its previous deadline.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam_channel::Sender;
use serde_json::{Map, Value};
use threadpool::ThreadPool;

use kidremote_protocol::govee::{CloudCommand, Message};

use crate::{
    actor::{Act, Actor},
    bridge::Bridge,
    content::{
        apply_content,
        cloud::{validate_config_json, validate_passphrase, CloudConfigClient},
        load_content,
        tabs::{resolve_active_tab, tab_summaries, tabs_for_rendering, visible_sections, DEFAULT_TAB},
        AppLaunch, ContentProvider, ContentSource, HandlerCall, LoadedContent, NormalizedContent,
    },
    discovery::{self, Scan},
    dispatch::{youtube_launch, Dispatcher, Effect},
    error::Error,
    gate::{self, GateEvent, SettingsGate, HOLD_TICK, PIN_ERROR_CLEAR},
    handlers::{number_arg, text_arg, HandlerId},
    lights::{self, CloudTarget, LanTarget, DEFAULT_BRIGHTNESS},
    overlay::{
        fireworks::{self, BURST_INTERVAL},
        timer::{
            format_timer_duration, magic_timer_label, sanitize_seconds, TimerTick, FRAME_INTERVAL,
            IDLE_COUNTDOWN,
        },
        FireworksOverlay, TimerOverlay,
    },
    registry::DeviceRegistry,
    render::{column_buttons, quick_launch_grid, ColumnId, ColumnView},
    storage::{keys, Storage, StorageHandle},
    surface::{SpeechOutcome, StatusVariant, Surface, Theme},
    timers::{TimerSlot, Timers},
};

pub const TOAST_DURATION: Duration = Duration::from_millis(3000);
const SPEECH_STATUS_DELAY: Duration = Duration::from_millis(1400);
const SPEECH_WARMUP_STATUS_DELAY: Duration = Duration::from_millis(2000);
const MAGIC_FIREWORKS_SECS: f64 = 8.0;
const MAGIC_FIREWORKS_MESSAGE: &str = "Fireworks Celebration!";
const WORKER_THREADS: usize = 4;

const COLUMNS: [ColumnId; 3] = [ColumnId::Remote, ColumnId::Quick, ColumnId::Magic];

pub enum Msg {
    /// Apply the stored theme, load content and look for devices.
    Start,
    Tap { column: ColumnId, index: usize },
    /// A tile of the settings-only quick-launch grid.
    QuickLaunchTile(usize),
    SelectTab(String),
    GearPress,
    GearRelease,
    GearClick,
    PinDigit(char),
    PinCancel,
    SetLocalPin(String),
    ClearLocalPin,
    Refresh,
    /// Put the active document into the config editor.
    LoadEditor,
    SetPassphrase(String),
    SaveConfig(String),
    SelectTimerEmoji(String),
    SetLightTarget { host: String, port: Option<u16> },
    SetGoveeApiKey(String),
    SetRokuIp(String),
    CheckLightStatus,
    ListCloudLights,
    SetCloudTarget { device: String, model: String },
    /// `None` flips the last known cloud power state.
    CloudPower(Option<bool>),
    /// `None` uses the default brightness.
    CloudBrightness(Option<f64>),
    CloudColor(String),
    CloudState,
    Invoke(HandlerCall),
    ContentLoaded {
        loaded: Box<LoadedContent>,
        then: Option<(StatusVariant, String)>,
    },
    ConfigSaved(Result<(), String>),
    /// A startup scan got past the Wi-Fi check.
    DiscoveryStarted,
    DiscoveryFinished(Result<Option<Scan>, String>),
    LaunchFailed(String),
    LightsDone(Result<String, String>),
    CloudDevicesLoaded(Result<Vec<Value>, String>),
    CloudSent {
        applied: CloudApplied,
        result: Result<String, String>,
    },
    CloudStateFetched(Result<Value, String>),
    Tick,
    Shutdown,
}

impl Msg {
    pub fn invoke(handler: HandlerId, args: Vec<Value>) -> Self {
        Msg::Invoke(HandlerCall { handler, args })
    }
}

/// What a cloud control request changes once the cloud accepts it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloudApplied {
    Power(bool),
    Brightness(u8),
    Color,
}

/// Collaborators the controller talks to.
pub struct Services {
    pub surface: Box<dyn Surface>,
    pub bridge: Arc<dyn Bridge>,
    pub provider: Arc<dyn ContentProvider>,
    pub cloud: Arc<CloudConfigClient>,
    pub storage: StorageHandle,
    pub discovery_timeout: Duration,
}

type HandlerFn = fn(&mut Controller, &[Value]);

fn handler_fn(id: HandlerId) -> HandlerFn {
    match id {
        HandlerId::StartTimer => Controller::on_start_timer,
        HandlerId::MagicTimer => Controller::on_magic_timer,
        HandlerId::CancelTimer => Controller::on_cancel_timer,
        HandlerId::StartFireworks => Controller::on_start_fireworks,
        HandlerId::MagicFireworks => Controller::on_magic_fireworks,
        HandlerId::StopFireworks => Controller::on_stop_fireworks,
        HandlerId::Speak => Controller::on_speak,
        HandlerId::MagicSpeak => Controller::on_magic_speak,
        HandlerId::StopSpeaking => Controller::on_stop_speaking,
        HandlerId::LaunchYouTube => Controller::on_launch_youtube,
        HandlerId::LaunchApp => Controller::on_launch_app,
        HandlerId::LightsOn => Controller::on_lights_on,
        HandlerId::LightsOff => Controller::on_lights_off,
        HandlerId::LightsToggle => Controller::on_lights_toggle,
        HandlerId::LightBrightness => Controller::on_light_brightness,
        HandlerId::LightColor => Controller::on_light_color,
        HandlerId::LightPreset => Controller::on_light_preset,
        HandlerId::LightRoutine => Controller::on_light_routine,
        HandlerId::ToggleTheme => Controller::on_toggle_theme,
        HandlerId::DiscoverDevices => Controller::on_discover_devices,
    }
}

pub struct Controller {
    this: Sender<Msg>,
    surface: Box<dyn Surface>,
    bridge: Arc<dyn Bridge>,
    provider: Arc<dyn ContentProvider>,
    cloud: Arc<CloudConfigClient>,
    storage: StorageHandle,
    discovery_timeout: Duration,
    pool: ThreadPool,

    now: Instant,
    timers: Timers,
    gate: SettingsGate,
    timer: TimerOverlay,
    fireworks: FireworksOverlay,
    dispatcher: Dispatcher,
    content: Option<NormalizedContent>,
    source: ContentSource,
    registry: DeviceRegistry,
    theme: Theme,
    active_tab: String,
    columns: HashMap<ColumnId, Vec<crate::content::ButtonSpec>>,
    lights_on: bool,
    cloud_target: Option<CloudTarget>,
    cloud_power: bool,
    pending_speech: Option<String>,
}

impl Controller {
    pub fn new(this: Sender<Msg>, services: Services) -> Self {
        let Services {
            surface,
            bridge,
            provider,
            cloud,
            storage,
            discovery_timeout,
        } = services;
        let registry = DeviceRegistry::load(&storage);
        Self {
            this,
            surface,
            bridge,
            provider,
            cloud,
            storage,
            discovery_timeout,
            pool: ThreadPool::with_name("controller_worker".into(), WORKER_THREADS),
            now: Instant::now(),
            timers: Timers::default(),
            gate: SettingsGate::default(),
            timer: TimerOverlay::default(),
            fireworks: FireworksOverlay::default(),
            dispatcher: Dispatcher::new(),
            content: None,
            source: ContentSource::Empty,
            registry,
            theme: Theme::default(),
            active_tab: DEFAULT_TAB.to_string(),
            columns: HashMap::new(),
            lights_on: false,
            cloud_target: None,
            cloud_power: false,
            pending_speech: None,
        }
    }

    /// Handles `msg` as if it arrived at `now`.
    pub fn handle_at(&mut self, msg: Msg, now: Instant) -> Act<Self> {
        self.now = now;
        match msg {
            Msg::Start => self.start(),
            Msg::Tap { column, index } => self.tap(column, index),
            Msg::QuickLaunchTile(index) => self.quick_launch_tile(index),
            Msg::SelectTab(id) => {
                self.active_tab = id;
                self.render_tabs();
            }
            Msg::GearPress => {
                let events = self.gate.press(now);
                self.apply_gate_events(events);
                if self.gate.is_holding() {
                    self.timers.set(TimerSlot::Hold, now + HOLD_TICK);
                }
            }
            Msg::GearRelease => {
                self.timers.clear(TimerSlot::Hold);
                let events = self.gate.release();
                self.apply_gate_events(events);
            }
            Msg::GearClick => {
                let events = self.gate.gear_click();
                self.apply_gate_events(events);
            }
            Msg::PinDigit(digit) => {
                let local = self.storage.get(keys::PARENTAL_PIN);
                let remote = self.content.as_ref().and_then(|c| c.remote_pin.as_deref());
                let pin = gate::active_pin(local.as_deref(), remote).to_string();
                let events = self.gate.enter_digit(digit, &pin);
                self.apply_gate_events(events);
            }
            Msg::PinCancel => {
                self.timers.clear(TimerSlot::PinClear);
                let events = self.gate.cancel_pin();
                self.apply_gate_events(events);
            }
            Msg::SetLocalPin(value) => self.set_local_pin(&value),
            Msg::ClearLocalPin => {
                self.storage.remove(keys::PARENTAL_PIN);
                self.render_settings_info();
                self.show_status(StatusVariant::Info, "PIN reset to the cloud/default value.");
            }
            Msg::Refresh => self.load(true, None),
            Msg::LoadEditor => self.load_editor(),
            Msg::SetPassphrase(text) => self.set_passphrase(&text),
            Msg::SaveConfig(text) => self.save_config(&text),
            Msg::SelectTimerEmoji(emoji) => {
                let (emoji, animation) = self.timer.select_emoji(&emoji);
                log::debug!("timer emoji {} (animation {})", emoji, animation);
            }
            Msg::SetLightTarget { host, port } => self.set_light_target(&host, port),
            Msg::SetGoveeApiKey(key) => {
                store_or_remove(&self.storage, keys::GOVEE_API_KEY, &key);
                self.show_status(StatusVariant::Success, "Govee API key saved.");
            }
            Msg::SetRokuIp(ip) => {
                store_or_remove(&self.storage, keys::ROKU_IP, &ip);
                self.show_status(StatusVariant::Success, "TV address saved.");
            }
            Msg::CheckLightStatus => self.check_light_status(),
            Msg::ListCloudLights => self.list_cloud_lights(),
            Msg::SetCloudTarget { device, model } => match CloudTarget::new(&device, &model) {
                Some(target) => {
                    log::info!("cloud target {} ({})", target.device, target.model);
                    self.cloud_target = Some(target);
                    self.show_status(StatusVariant::Success, "Cloud light selected.");
                }
                None => self.show_status(StatusVariant::Error, "Select a device and model first."),
            },
            Msg::CloudPower(on) => {
                let on = on.unwrap_or(!self.cloud_power);
                self.send_cloud(CloudCommand::turn(on), CloudApplied::Power(on));
            }
            Msg::CloudBrightness(level) => {
                let level = level
                    .filter(|level| level.is_finite() && *level > 0.0)
                    .map_or(DEFAULT_BRIGHTNESS, |level| level.round().clamp(1.0, 100.0) as u8);
                self.send_cloud(CloudCommand::brightness(level), CloudApplied::Brightness(level));
            }
            Msg::CloudColor(hex) => match lights::hex_to_rgb(&hex) {
                Some(rgb) => self.send_cloud(CloudCommand::color(rgb), CloudApplied::Color),
                None => self.show_status(StatusVariant::Error, "Pick a valid color."),
            },
            Msg::CloudState => self.fetch_cloud_state(),
            Msg::Invoke(call) => self.run_handler(call.handler, &call.args),
            Msg::ContentLoaded { loaded, then } => self.content_loaded(*loaded, then),
            Msg::ConfigSaved(result) => self.config_saved(result),
            Msg::DiscoveryStarted => self.show_status(StatusVariant::Info, "Looking for devices..."),
            Msg::DiscoveryFinished(result) => self.discovery_finished(result),
            Msg::LaunchFailed(err) => {
                log::error!("failed to launch app: {}", err);
                self.show_status(StatusVariant::Error, "Failed to launch app on TV.");
            }
            Msg::LightsDone(Ok(message)) => self.show_status(StatusVariant::Success, &message),
            Msg::LightsDone(Err(message)) => self.show_status(StatusVariant::Error, &message),
            Msg::CloudDevicesLoaded(result) => self.cloud_devices_loaded(result),
            Msg::CloudSent { applied, result } => self.cloud_sent(applied, result),
            Msg::CloudStateFetched(result) => self.cloud_state_fetched(result),
            Msg::Tick => {
                for slot in self.timers.take_due(now) {
                    self.on_timer(slot);
                }
            }
            Msg::Shutdown => return Act::Shutdown,
        }
        match self.timers.next_deadline() {
            Some(deadline) => Act::WaitUntil {
                deadline,
                timeout_msg: Msg::Tick,
            },
            None => Act::Continue,
        }
    }

    fn start(&mut self) {
        self.theme = self
            .storage
            .get_non_empty(keys::THEME)
            .map(|name| Theme::from_name(&name))
            .unwrap_or_default();
        self.surface.apply_theme(self.theme);
        self.surface.set_settings_visible(false);
        self.surface.update_timer(IDLE_COUNTDOWN);
        self.render_all();
        self.load(false, None);
        self.discover(false);
    }

    fn tap(&mut self, column: ColumnId, index: usize) {
        let Some(button) = self.columns.get(&column).and_then(|b| b.get(index)).cloned() else {
            log::warn!("no button {} in the {} column", index, column);
            return;
        };
        let effects = self.dispatcher.dispatch(&button, self.now);
        self.apply_effects(effects);
    }

    fn quick_launch_tile(&mut self, index: usize) {
        let item = self
            .content
            .as_ref()
            .and_then(|content| content.quick_launch.get(index))
            .cloned();
        let Some(item) = item else {
            log::warn!("no quick launch item {}", index);
            return;
        };
        let effects = self.dispatcher.quick_launch(&item, self.now);
        self.apply_effects(effects);
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Status(variant, message) => self.show_status(variant, &message),
                Effect::Speak(text) => self.speak(&text),
                Effect::LaunchApp(app) => self.launch(app),
                Effect::RunHandler(call) => self.run_handler(call.handler, &call.args),
            }
        }
    }

    fn run_handler(&mut self, handler: HandlerId, args: &[Value]) {
        log::info!("running {}", handler);
        handler_fn(handler)(self, args);
    }

    fn on_timer(&mut self, slot: TimerSlot) {
        match slot {
            TimerSlot::Hold => {
                let events = self.gate.tick(self.now);
                self.apply_gate_events(events);
                if self.gate.is_holding() {
                    self.timers.set(TimerSlot::Hold, self.now + HOLD_TICK);
                }
            }
            TimerSlot::Toast => self.surface.hide_status(),
            TimerSlot::TimerFrame => match self.timer.tick(self.now) {
                TimerTick::Idle => {}
                TimerTick::Remaining(countdown) => {
                    self.surface.update_timer(&countdown);
                    self.timers.set(TimerSlot::TimerFrame, self.now + FRAME_INTERVAL);
                }
                TimerTick::Finished { label } => {
                    self.cancel_timer(true);
                    self.speak(&format!("{} is done!", label));
                    self.show_status(StatusVariant::Success, "Timer finished!");
                }
            },
            TimerSlot::FireworksBurst => {
                self.burst();
                self.timers.set(TimerSlot::FireworksBurst, self.now + BURST_INTERVAL);
            }
            TimerSlot::FireworksEnd => self.stop_fireworks(true),
            TimerSlot::PinClear => {
                let events = self.gate.clear_pin();
                self.apply_gate_events(events);
            }
            TimerSlot::SpeechStatus => {
                if let Some(text) = self.pending_speech.take() {
                    self.show_status(StatusVariant::Success, &format!("Said: \"{}\"", text));
                }
            }
        }
    }

    fn show_status(&mut self, variant: StatusVariant, message: &str) {
        self.surface.show_status(variant, message);
        self.timers.set(TimerSlot::Toast, self.now + TOAST_DURATION);
    }

    fn render_all(&mut self) {
        self.render_tabs();
        let empty = NormalizedContent::default();
        let content = self.content.as_ref().unwrap_or(&empty);
        for column in COLUMNS {
            let buttons = column_buttons(column, content);
            self.surface
                .render_column(column, &ColumnView::new(column, &buttons));
            self.columns.insert(column, buttons);
        }
        self.render_quick_launch();
    }

    fn render_tabs(&mut self) {
        let tabs = tabs_for_rendering(self.content.as_ref());
        let active = resolve_active_tab(&self.active_tab, &tabs).to_string();
        self.surface.render_tabs(&tabs, &active);
        self.surface
            .set_visible_sections(&visible_sections(&active, &tabs));
    }

    fn render_quick_launch(&mut self) {
        let grid = self
            .content
            .as_ref()
            .and_then(|content| quick_launch_grid(content, self.gate.is_unlocked()));
        self.surface.render_quick_launch(grid.as_deref());
    }

    fn apply_gate_events(&mut self, events: Vec<GateEvent>) {
        for event in events {
            match event {
                GateEvent::HoldProgress { offset } => self.surface.set_hold_progress(offset),
                GateEvent::PinPad { open } => self.surface.show_pin_pad(open),
                GateEvent::PinDisplay { text, error } => self.surface.set_pin_display(&text, error),
                GateEvent::PinRejected => {
                    self.timers.set(TimerSlot::PinClear, self.now + PIN_ERROR_CLEAR);
                }
                GateEvent::Unlocked => {
                    self.timers.clear(TimerSlot::Hold);
                    self.surface.set_settings_visible(true);
                    self.render_quick_launch();
                    self.show_status(
                        StatusVariant::Success,
                        "Settings unlocked! Advanced controls are now visible.",
                    );
                }
                GateEvent::Locked => {
                    self.timers.clear(TimerSlot::Hold);
                    self.surface.set_settings_visible(false);
                    self.render_quick_launch();
                    self.show_status(
                        StatusVariant::Info,
                        "Advanced controls hidden. Hold the gear button to unlock again.",
                    );
                }
                GateEvent::Hint(hint) => self.show_status(StatusVariant::Info, hint),
            }
        }
    }

    /// PIN source and content source lines of the settings panel.
    fn render_settings_info(&mut self) {
        let local = self.storage.get(keys::PARENTAL_PIN);
        let remote = self.content.as_ref().and_then(|c| c.remote_pin.as_deref());
        self.surface
            .set_pin_status(&gate::pin_status_text(local.as_deref(), remote));
        let passphrase = self.passphrase();
        self.surface
            .set_content_info(&self.source.info_text(passphrase.as_deref()));
    }

    fn set_local_pin(&mut self, value: &str) {
        match gate::sanitize_pin(value) {
            Some(pin) => {
                self.storage.set(keys::PARENTAL_PIN, pin);
                self.render_settings_info();
                self.show_status(StatusVariant::Success, "PIN updated for this device.");
            }
            None => self.show_status(StatusVariant::Error, "PIN must be exactly 4 digits."),
        }
    }

    fn passphrase(&self) -> Option<String> {
        self.storage.get_non_empty(keys::CONTENT_PASSPHRASE)
    }

    /// Loads content on the pool.  `then` is shown after the load's own
    /// status messages.
    fn load(&mut self, force_refresh: bool, then: Option<(StatusVariant, String)>) {
        let provider = self.provider.clone();
        let cloud_base = self.cloud.base().to_string();
        let passphrase = self.passphrase();
        let this = self.this.clone();
        self.pool.execute(move || {
            let loaded = load_content(&*provider, passphrase.as_deref(), &cloud_base, force_refresh);
            let _ = this.send(Msg::ContentLoaded {
                loaded: Box::new(loaded),
                then,
            });
        });
    }

    fn content_loaded(&mut self, loaded: LoadedContent, then: Option<(StatusVariant, String)>) {
        let LoadedContent {
            document,
            source,
            statuses,
        } = loaded;
        self.content = Some(apply_content(document));
        self.source = source;
        for summary in tab_summaries(self.content.as_ref()) {
            log::info!("{}", summary);
        }
        self.render_all();
        self.render_settings_info();
        for (variant, message) in statuses.into_iter().chain(then) {
            self.show_status(variant, &message);
        }
    }

    fn load_editor(&mut self) {
        let document = match &self.content {
            Some(content) => content.editor_document(),
            None => NormalizedContent::default().rebuild_document(),
        };
        match serde_json::to_string_pretty(&document) {
            Ok(text) => {
                self.surface.show_config_editor(&text);
                self.show_status(
                    StatusVariant::Info,
                    "Current config loaded into editor. Make your changes and click Save to Cloud.",
                );
            }
            Err(err) => log::error!("failed to format config for the editor: {}", err),
        }
    }

    fn set_passphrase(&mut self, text: &str) {
        let passphrase = text.trim();
        if passphrase.is_empty() {
            self.storage.remove(keys::CONTENT_PASSPHRASE);
            self.load(
                true,
                Some((
                    StatusVariant::Info,
                    "Passphrase cleared. Using bundled defaults.".to_string(),
                )),
            );
            return;
        }
        if let Err(message) = validate_passphrase(passphrase) {
            self.show_status(StatusVariant::Error, &message);
            return;
        }
        self.storage.set(keys::CONTENT_PASSPHRASE, passphrase);
        self.load(
            true,
            Some((
                StatusVariant::Success,
                "Passphrase saved! Loading config from cloud...".to_string(),
            )),
        );
    }

    fn save_config(&mut self, text: &str) {
        let Some(passphrase) = self.passphrase() else {
            self.show_status(
                StatusVariant::Error,
                "No passphrase set. Enter a passphrase first.",
            );
            return;
        };
        if text.trim().is_empty() {
            self.show_status(
                StatusVariant::Error,
                "Editor is empty. Load current config or paste your JSON first.",
            );
            return;
        }
        if let Err(message) = validate_config_json(text) {
            self.show_status(StatusVariant::Error, &message);
            return;
        }
        let document: Value = match serde_json::from_str(text) {
            Ok(document) => document,
            Err(err) => {
                self.show_status(StatusVariant::Error, &format!("Invalid JSON: {}", err));
                return;
            }
        };
        self.show_status(StatusVariant::Info, "Saving to cloud...");
        let cloud = self.cloud.clone();
        let this = self.this.clone();
        self.pool.execute(move || {
            let result = cloud.save(&passphrase, &document).map_err(|err| match err {
                Error::UnexpectedResponse(message) => message,
                err => err.to_string(),
            });
            let _ = this.send(Msg::ConfigSaved(result));
        });
    }

    fn config_saved(&mut self, result: Result<(), String>) {
        match result {
            Ok(()) => {
                self.show_status(StatusVariant::Success, "Config saved to cloud! Refreshing...");
                self.load(
                    true,
                    Some((
                        StatusVariant::Success,
                        "Config saved and refreshed successfully!".to_string(),
                    )),
                );
            }
            Err(message) => {
                log::error!("failed to save config to cloud: {}", message);
                self.show_status(StatusVariant::Error, &format!("Failed to save: {}", message));
            }
        }
    }

    /// Scans for devices on the pool.  A requested scan announces itself
    /// right away, the startup scan only once it is on Wi-Fi.
    fn discover(&mut self, requested: bool) {
        if requested {
            self.show_status(StatusVariant::Info, "Looking for devices...");
        }
        let bridge = self.bridge.clone();
        let timeout = self.discovery_timeout;
        let this = self.this.clone();
        self.pool.execute(move || {
            let started = || {
                if !requested {
                    let _ = this.send(Msg::DiscoveryStarted);
                }
            };
            let result = discovery::scan(&*bridge, timeout, started).map_err(|err| err.to_string());
            let _ = this.send(Msg::DiscoveryFinished(result));
        });
    }

    fn discovery_finished(&mut self, result: Result<Option<Scan>, String>) {
        let scan = match result {
            Ok(Some(scan)) => scan,
            Ok(None) => return,
            Err(err) => {
                log::error!("device discovery failed: {}", err);
                self.show_status(StatusVariant::Error, "Device discovery failed.");
                return;
            }
        };
        let outcome = discovery::register(&mut self.registry, scan);
        self.registry.save(&self.storage);
        if outcome.should_sync {
            let cloud = self.cloud.clone();
            let passphrase = self.passphrase();
            let registry = self.registry.clone();
            self.pool.execute(move || {
                discovery::sync_to_cloud(&cloud, passphrase.as_deref(), &registry);
            });
        }
        match outcome.status_message() {
            Some(message) => self.show_status(StatusVariant::Success, &message),
            None => log::info!("discovery complete, no new devices found"),
        }
    }

    fn launch(&mut self, app: AppLaunch) {
        let Some(app_id) = app.app_id.filter(|id| !id.is_empty()) else {
            log::error!("app {:?} has no app id", app.app_name.or(app.label));
            self.show_status(StatusVariant::Error, "Failed to launch app on TV.");
            return;
        };
        let bridge = self.bridge.clone();
        let this = self.this.clone();
        self.pool.execute(move || {
            if let Err(err) = bridge.roku_launch_app(&app_id, &app.params) {
                let _ = this.send(Msg::LaunchFailed(err.to_string()));
            }
        });
    }

    fn speak(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.show_status(StatusVariant::Error, "Nothing to say yet.");
            return;
        }
        self.surface.stop_speaking();
        self.timers.clear(TimerSlot::SpeechStatus);
        let delay = match self.surface.speak(text) {
            SpeechOutcome::Failed => {
                self.pending_speech = None;
                self.show_status(StatusVariant::Error, "Could not speak that phrase.");
                return;
            }
            SpeechOutcome::Started => {
                self.show_status(StatusVariant::Info, &format!("Saying \"{}\"...", text));
                SPEECH_STATUS_DELAY
            }
            SpeechOutcome::WarmingUp => {
                self.show_status(StatusVariant::Info, "Warming up the voice...");
                SPEECH_WARMUP_STATUS_DELAY
            }
        };
        self.pending_speech = Some(text.to_string());
        self.timers.set(TimerSlot::SpeechStatus, self.now + delay);
    }

    fn start_timer(&mut self, seconds: Option<f64>, label: Option<&str>) {
        self.timers.clear(TimerSlot::TimerFrame);
        let view = self.timer.start(seconds, label, self.now);
        self.surface.show_timer(&view);
        let countdown = self.timer.countdown(self.now);
        self.surface.update_timer(&countdown);
        self.timers.set(TimerSlot::TimerFrame, self.now + FRAME_INTERVAL);
        let message = format!(
            "Started {} for {}.",
            view.label,
            format_timer_duration(sanitize_seconds(seconds))
        );
        self.show_status(StatusVariant::Success, &message);
    }

    fn cancel_timer(&mut self, silent: bool) {
        self.timer.cancel();
        self.timers.clear(TimerSlot::TimerFrame);
        self.surface.hide_timer();
        self.surface.update_timer(IDLE_COUNTDOWN);
        if !silent {
            self.show_status(StatusVariant::Info, "Timer cancelled.");
        }
    }

    fn start_fireworks(&mut self, seconds: Option<f64>, message: Option<&str>) {
        self.stop_fireworks(true);
        let message = self.fireworks.start(seconds, message, self.now);
        self.surface.show_fireworks(&message);
        self.burst();
        self.timers.set(TimerSlot::FireworksBurst, self.now + BURST_INTERVAL);
        if let Some(end) = self.fireworks.ends_at() {
            self.timers.set(TimerSlot::FireworksEnd, end);
        }
        self.speak(&message);
        self.show_status(StatusVariant::Success, "Fireworks launched!");
    }

    fn stop_fireworks(&mut self, silent: bool) {
        self.fireworks.stop();
        self.timers.clear(TimerSlot::FireworksBurst);
        self.timers.clear(TimerSlot::FireworksEnd);
        self.surface.hide_fireworks();
        if !silent {
            self.show_status(StatusVariant::Info, "Fireworks finished.");
        }
    }

    fn burst(&mut self) {
        for burst in fireworks::bursts(&mut rand::rng()) {
            self.surface.burst(burst.x, burst.y);
        }
    }

    /// Sends one LAN command to the configured light on the pool.
    fn send_light(&mut self, message: Message) {
        let target = match LanTarget::from_storage(&self.storage) {
            Ok(target) => target,
            Err(err) => {
                self.show_status(StatusVariant::Error, &err.to_string());
                return;
            }
        };
        let bridge = self.bridge.clone();
        let this = self.this.clone();
        self.pool.execute(move || {
            let cmd = message.cmd.clone();
            let result = target
                .send(&*bridge, message)
                .map(|()| format!("Sent {} to {}:{}", cmd, target.host, target.port))
                .map_err(|err| format!("Light command failed: {}", err));
            let _ = this.send(Msg::LightsDone(result));
        });
    }

    fn set_light_target(&mut self, host: &str, port: Option<u16>) {
        let host = host.trim();
        if host.is_empty() {
            self.show_status(StatusVariant::Error, "Add the light IP first.");
            return;
        }
        self.storage.set(keys::GOVEE_IP, host);
        match port.filter(|port| *port != 0) {
            Some(port) => self.storage.set(keys::GOVEE_PORT, port.to_string()),
            None => self.storage.remove(keys::GOVEE_PORT),
        }
        self.show_status(StatusVariant::Success, "Light address saved.");
    }

    fn check_light_status(&mut self) {
        let target = match LanTarget::from_storage(&self.storage) {
            Ok(target) => target,
            Err(err) => {
                self.show_status(StatusVariant::Error, &err.to_string());
                return;
            }
        };
        let bridge = self.bridge.clone();
        let this = self.this.clone();
        self.pool.execute(move || {
            let result = bridge
                .govee_status(&target.host, Some(target.port))
                .map(|status| lights::status_text(&status))
                .map_err(|err| format!("Status check failed: {}", err));
            let _ = this.send(Msg::LightsDone(result));
        });
    }

    fn list_cloud_lights(&mut self) {
        let Some(api_key) = self.storage.get_non_empty(keys::GOVEE_API_KEY) else {
            self.show_status(StatusVariant::Error, "Add your Govee API key first.");
            return;
        };
        let bridge = self.bridge.clone();
        let this = self.this.clone();
        self.pool.execute(move || {
            let result = bridge
                .govee_cloud_devices(&api_key)
                .map(|raw| lights::normalize_cloud_devices(&raw))
                .map_err(|err| format!("Cloud lookup failed: {}", err));
            let _ = this.send(Msg::CloudDevicesLoaded(result));
        });
    }

    /// The first listed light becomes the cloud target unless one is chosen.
    fn cloud_devices_loaded(&mut self, result: Result<Vec<Value>, String>) {
        let devices = match result {
            Ok(devices) => devices,
            Err(message) => {
                self.show_status(StatusVariant::Error, &message);
                return;
            }
        };
        for device in &devices {
            log::info!("cloud light: {}", device);
        }
        if self.cloud_target.is_none() {
            self.cloud_target = devices.iter().find_map(CloudTarget::from_device);
        }
        self.show_status(
            StatusVariant::Success,
            &format!("Found {} cloud lights.", devices.len()),
        );
    }

    fn cloud_access(&mut self) -> Option<(String, CloudTarget)> {
        let Some(api_key) = self.storage.get_non_empty(keys::GOVEE_API_KEY) else {
            self.show_status(StatusVariant::Error, "Save your API key first.");
            return None;
        };
        let Some(target) = self.cloud_target.clone() else {
            self.show_status(StatusVariant::Error, "Select a device and model first.");
            return None;
        };
        Some((api_key, target))
    }

    fn send_cloud(&mut self, command: CloudCommand, applied: CloudApplied) {
        let Some((api_key, target)) = self.cloud_access() else {
            return;
        };
        let bridge = self.bridge.clone();
        let this = self.this.clone();
        self.pool.execute(move || {
            let result = bridge
                .govee_cloud_control(&api_key, &target.device, &target.model, &command.to_value())
                .map(|_| {
                    log::info!("cloud {} sent to {}", command.name, target.device);
                    format!("Cloud: {} sent.", command.name)
                })
                .map_err(|err| err.to_string());
            let _ = this.send(Msg::CloudSent { applied, result });
        });
    }

    fn cloud_sent(&mut self, applied: CloudApplied, result: Result<String, String>) {
        match result {
            Ok(message) => {
                match applied {
                    CloudApplied::Power(on) => self.cloud_power = on,
                    CloudApplied::Brightness(level) => {
                        self.storage.set(keys::GOVEE_BRIGHTNESS, level.to_string())
                    }
                    CloudApplied::Color => {}
                }
                self.show_status(StatusVariant::Success, &message);
            }
            Err(message) => {
                log::error!("cloud command {:?} failed: {}", applied, message);
                self.show_status(StatusVariant::Error, &message);
            }
        }
    }

    fn fetch_cloud_state(&mut self) {
        let Some((api_key, target)) = self.cloud_access() else {
            return;
        };
        let bridge = self.bridge.clone();
        let this = self.this.clone();
        self.pool.execute(move || {
            let result = bridge
                .govee_cloud_state(&api_key, &target.device, &target.model)
                .map_err(|err| err.to_string());
            let _ = this.send(Msg::CloudStateFetched(result));
        });
    }

    fn cloud_state_fetched(&mut self, result: Result<Value, String>) {
        match result {
            Ok(state) => {
                if let Some(on) = lights::cloud_power_state(&state) {
                    self.cloud_power = on;
                }
                let text = serde_json::to_string_pretty(&state).unwrap_or_else(|_| state.to_string());
                self.surface.show_cloud_state(&text);
                self.show_status(StatusVariant::Success, "Fetched cloud state.");
            }
            Err(message) => {
                log::error!("cloud state failed: {}", message);
                self.show_status(StatusVariant::Error, &message);
            }
        }
    }

    fn set_lights(&mut self, on: bool) {
        self.lights_on = on;
        self.send_light(Message::turn(on));
    }

    fn on_start_timer(&mut self, args: &[Value]) {
        self.start_timer(number_arg(args, 0), text_arg(args, 1));
    }

    fn on_magic_timer(&mut self, args: &[Value]) {
        let seconds = number_arg(args, 0).unwrap_or(f64::NAN);
        match magic_timer_label(seconds) {
            Ok(label) => self.start_timer(Some(seconds), Some(&label)),
            Err(message) => self.show_status(StatusVariant::Error, message),
        }
    }

    fn on_cancel_timer(&mut self, _: &[Value]) {
        self.cancel_timer(false);
    }

    fn on_start_fireworks(&mut self, args: &[Value]) {
        self.start_fireworks(number_arg(args, 0), text_arg(args, 1));
    }

    fn on_magic_fireworks(&mut self, _: &[Value]) {
        self.start_fireworks(Some(MAGIC_FIREWORKS_SECS), Some(MAGIC_FIREWORKS_MESSAGE));
    }

    fn on_stop_fireworks(&mut self, _: &[Value]) {
        self.stop_fireworks(false);
    }

    fn on_speak(&mut self, args: &[Value]) {
        self.speak(text_arg(args, 0).unwrap_or_default());
    }

    fn on_magic_speak(&mut self, args: &[Value]) {
        let phrase = text_arg(args, 0).map(str::trim).unwrap_or_default();
        if phrase.is_empty() {
            self.show_status(StatusVariant::Error, "Type something to say first.");
            return;
        }
        self.speak(phrase);
    }

    fn on_stop_speaking(&mut self, _: &[Value]) {
        self.surface.stop_speaking();
        self.timers.clear(TimerSlot::SpeechStatus);
        self.pending_speech = None;
        self.show_status(StatusVariant::Info, "Voice stopped.");
    }

    fn on_launch_youtube(&mut self, args: &[Value]) {
        match text_arg(args, 0).map(str::trim).filter(|id| !id.is_empty()) {
            Some(video_id) => self.launch(youtube_launch(video_id)),
            None => log::warn!("youtube launch without a video id"),
        }
    }

    fn on_launch_app(&mut self, args: &[Value]) {
        let app = match args.first() {
            Some(Value::Object(config)) => AppLaunch {
                app_id: config.get("appId").and_then(scalar_text),
                app_name: config.get("appName").and_then(scalar_text),
                label: config.get("label").and_then(scalar_text),
                params: config
                    .get("params")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            },
            Some(other) => AppLaunch {
                app_id: scalar_text(other),
                app_name: None,
                label: None,
                params: Map::new(),
            },
            None => {
                log::warn!("app launch without a config");
                return;
            }
        };
        self.launch(app);
    }

    fn on_lights_on(&mut self, _: &[Value]) {
        self.set_lights(true);
    }

    fn on_lights_off(&mut self, _: &[Value]) {
        self.set_lights(false);
    }

    fn on_lights_toggle(&mut self, _: &[Value]) {
        self.set_lights(!self.lights_on);
    }

    fn on_light_brightness(&mut self, args: &[Value]) {
        let value = number_arg(args, 0)
            .filter(|value| value.is_finite())
            .map(|value| value.round().clamp(1.0, 100.0) as u8)
            .unwrap_or_else(|| lights::stored_brightness(&self.storage));
        self.storage.set(keys::GOVEE_BRIGHTNESS, value.to_string());
        self.send_light(Message::brightness(value));
    }

    fn on_light_color(&mut self, args: &[Value]) {
        match text_arg(args, 0).and_then(lights::hex_to_rgb) {
            Some(rgb) => self.send_light(Message::color(rgb)),
            None => self.show_status(StatusVariant::Error, "Pick a valid color."),
        }
    }

    fn on_light_preset(&mut self, args: &[Value]) {
        let color = lights::preset_color(text_arg(args, 0).unwrap_or_default());
        self.send_light(Message::color(color));
    }

    fn on_light_routine(&mut self, args: &[Value]) {
        let steps = lights::parse_routine(args);
        if steps.is_empty() {
            log::warn!("light routine without steps");
            return;
        }
        let target = match LanTarget::from_storage(&self.storage) {
            Ok(target) => target,
            Err(err) => {
                self.show_status(StatusVariant::Error, &err.to_string());
                return;
            }
        };
        let bridge = self.bridge.clone();
        let this = self.this.clone();
        self.pool.execute(move || {
            let result = lights::run_routine(&*bridge, &target, &steps)
                .map(|sent| format!("Light routine finished ({} commands).", sent))
                .map_err(|err| format!("Light routine failed: {}", err));
            let _ = this.send(Msg::LightsDone(result));
        });
    }

    fn on_toggle_theme(&mut self, _: &[Value]) {
        self.theme = self.theme.toggled();
        self.storage.set(keys::THEME, self.theme.as_str());
        self.surface.apply_theme(self.theme);
    }

    fn on_discover_devices(&mut self, _: &[Value]) {
        self.discover(true);
    }
}

fn store_or_remove(storage: &Storage, key: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        storage.remove(key);
    } else {
        storage.set(key, value);
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl Actor for Controller {
    type Message = Msg;
    type Error = Error;

    fn handle(&mut self, msg: Msg) -> Result<Act<Self>, Error> {
        Ok(self.handle_at(msg, Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::{unbounded, Receiver};
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::{
        bridge::mock::MockBridge,
        content::tabs::{Section, TabView},
        registry::{Device, DeviceKind},
        render::QuickLaunchTile,
        surface::TimerView,
    };

    type Log = Arc<Mutex<Vec<String>>>;

    struct RecordingSurface {
        log: Log,
        speech: SpeechOutcome,
    }

    impl RecordingSurface {
        fn push(&self, line: String) {
            self.log.lock().push(line);
        }
    }

    impl Surface for RecordingSurface {
        fn show_status(&mut self, variant: StatusVariant, message: &str) {
            self.push(format!("status {:?}: {}", variant, message));
        }
        fn hide_status(&mut self) {
            self.push("hide status".into());
        }
        fn render_column(&mut self, column: ColumnId, view: &ColumnView) {
            let count = match view {
                ColumnView::Empty { .. } => 0,
                ColumnView::Cards(cards) => cards.len(),
            };
            self.push(format!("column {}: {}", column, count));
        }
        fn render_quick_launch(&mut self, tiles: Option<&[QuickLaunchTile]>) {
            self.push(format!("grid {:?}", tiles.map(<[_]>::len)));
        }
        fn render_tabs(&mut self, tabs: &[TabView], active: &str) {
            self.push(format!("tabs {} active {}", tabs.len(), active));
        }
        fn set_visible_sections(&mut self, sections: &[Section]) {
            self.push(format!("sections {:?}", sections));
        }
        fn set_settings_visible(&mut self, visible: bool) {
            self.push(format!("settings {}", visible));
        }
        fn set_hold_progress(&mut self, offset: f64) {
            self.push(format!("hold {}", offset));
        }
        fn show_pin_pad(&mut self, visible: bool) {
            self.push(format!("pin pad {}", visible));
        }
        fn set_pin_display(&mut self, text: &str, error: bool) {
            self.push(format!("pin {} {}", text, error));
        }
        fn set_pin_status(&mut self, text: &str) {
            self.push(format!("pin status {}", text));
        }
        fn set_content_info(&mut self, text: &str) {
            self.push(format!("content info {}", text));
        }
        fn show_config_editor(&mut self, document: &str) {
            let document: Value = serde_json::from_str(document).unwrap();
            self.push(format!("editor {}", document));
        }
        fn show_cloud_state(&mut self, state: &str) {
            let state: Value = serde_json::from_str(state).unwrap();
            self.push(format!("cloud state {}", state));
        }
        fn show_timer(&mut self, view: &TimerView) {
            self.push(format!("show timer {} {}", view.label, view.original));
        }
        fn update_timer(&mut self, countdown: &str) {
            self.push(format!("countdown {}", countdown));
        }
        fn hide_timer(&mut self) {
            self.push("hide timer".into());
        }
        fn show_fireworks(&mut self, message: &str) {
            self.push(format!("show fireworks {}", message));
        }
        fn burst(&mut self, _: f64, _: f64) {
            self.push("burst".into());
        }
        fn hide_fireworks(&mut self) {
            self.push("hide fireworks".into());
        }
        fn speak(&mut self, text: &str) -> SpeechOutcome {
            self.push(format!("speak {}", text));
            self.speech
        }
        fn stop_speaking(&mut self) {}
        fn apply_theme(&mut self, theme: Theme) {
            self.push(format!("theme {}", theme));
        }
    }

    struct StaticProvider(Value);

    impl ContentProvider for StaticProvider {
        fn fetch_url(&self, _: &str) -> Result<Value, Error> {
            Err(Error::HttpStatus(503))
        }

        fn fetch_local(&self, name: &str) -> Result<Option<Value>, Error> {
            Ok((name == crate::content::fetch::BUNDLED_CONFIG_FILE).then(|| self.0.clone()))
        }
    }

    struct Harness {
        controller: Controller,
        results: Receiver<Msg>,
        log: Log,
        bridge: Arc<MockBridge>,
        storage: StorageHandle,
        now: Instant,
    }

    impl Harness {
        fn new(bridge: MockBridge) -> Self {
            Self::with_speech(bridge, SpeechOutcome::Started)
        }

        fn with_speech(bridge: MockBridge, speech: SpeechOutcome) -> Self {
            let (this, results) = unbounded();
            let log = Log::default();
            let bridge = Arc::new(bridge);
            let storage = Storage::in_memory();
            let services = Services {
                surface: Box::new(RecordingSurface {
                    log: log.clone(),
                    speech,
                }),
                bridge: bridge.clone(),
                provider: Arc::new(StaticProvider(document())),
                cloud: Arc::new(CloudConfigClient::new("http://127.0.0.1:9/api/config", None)),
                storage: storage.clone(),
                discovery_timeout: Duration::ZERO,
            };
            Self {
                controller: Controller::new(this, services),
                results,
                log,
                bridge,
                storage,
                now: Instant::now(),
            }
        }

        fn send(&mut self, msg: Msg) -> Act<Controller> {
            self.controller.handle_at(msg, self.now)
        }

        fn advance(&mut self, by: Duration) {
            self.now += by;
            self.controller.handle_at(Msg::Tick, self.now);
        }

        /// Feeds the next worker result back into the controller.
        fn pump(&mut self) {
            let msg = self
                .results
                .recv_timeout(Duration::from_secs(5))
                .expect("worker result");
            self.send(msg);
        }

        fn loaded(bridge: MockBridge) -> Self {
            let mut harness = Self::new(bridge);
            harness.send(Msg::Refresh);
            harness.pump();
            harness.advance(TOAST_DURATION);
            harness.log.lock().clear();
            harness
        }

        fn take_log(&self) -> Vec<String> {
            std::mem::take(&mut *self.log.lock())
        }

        fn statuses(&self) -> Vec<String> {
            self.take_log()
                .into_iter()
                .filter(|line| line.starts_with("status"))
                .collect()
        }
    }

    fn document() -> Value {
        json!({
            "tabs": [
                { "id": "remote", "buttons": [] },
                { "id": "apps", "buttons": [
                    { "id": "netflix", "label": "Netflix", "appId": "12", "appName": "Netflix" }
                ], "quickLaunch": [
                    { "type": "youtube", "videoId": "abc123", "label": "Bluey" }
                ] },
                { "id": "magic", "buttons": [
                    { "id": "snack", "label": "Snack", "handler": "startToddlerTimer", "args": [5, "Snack"] },
                    { "id": "oops", "label": "Oops", "handler": "doesNotExist" }
                ] }
            ],
            "settings": { "parentalPin": "2468" }
        })
    }

    #[test]
    fn loading_renders_every_column() {
        let mut h = Harness::new(MockBridge::default());
        h.send(Msg::Refresh);
        h.pump();
        let log = h.take_log();
        assert!(log.contains(&"tabs 3 active remote".to_string()));
        assert!(log.contains(&"column remote: 0".to_string()));
        assert!(log.contains(&"column quick: 2".to_string()));
        assert!(log.contains(&"column magic: 2".to_string()));
        assert!(log.contains(&"status Info: Kid-mode buttons loaded from bundled defaults.".to_string()));
        assert!(log.contains(&"pin status Using PIN from cloud config.".to_string()));
        assert!(log
            .iter()
            .any(|line| line.starts_with("content info Using bundled kid-mode buttons")));
    }

    #[test]
    fn pin_status_follows_local_pin() {
        let mut h = Harness::loaded(MockBridge::default());
        h.send(Msg::SetLocalPin("1357".into()));
        assert_eq!(
            h.take_log()[0],
            "pin status Using device-specific PIN (••••) on this device."
        );
        h.send(Msg::ClearLocalPin);
        assert_eq!(h.take_log()[0], "pin status Using PIN from cloud config.");
    }

    #[test]
    fn editor_gets_the_loaded_document() {
        let mut h = Harness::new(MockBridge::default());
        h.send(Msg::LoadEditor);
        let log = h.take_log();
        assert!(log[0].starts_with(r#"editor {"lastUpdated":"#));
        assert!(log[0].contains(r#""tabs":[]"#));

        let mut h = Harness::loaded(MockBridge::default());
        h.send(Msg::LoadEditor);
        assert_eq!(
            h.take_log(),
            vec![
                format!("editor {}", document()),
                "status Info: Current config loaded into editor. Make your changes and click Save to Cloud."
                    .to_string(),
            ]
        );
    }

    #[test]
    fn magic_button_starts_and_cancel_resets_timer() {
        let mut h = Harness::loaded(MockBridge::default());
        h.send(Msg::Tap {
            column: ColumnId::Magic,
            index: 0,
        });
        let log = h.take_log();
        assert!(log.contains(&"show timer Snack 0:05".to_string()));
        assert!(log.contains(&"countdown 00:05".to_string()));
        assert!(log.contains(&"status Success: Started Snack for 5 sec.".to_string()));

        h.send(Msg::invoke(HandlerId::CancelTimer, Vec::new()));
        let log = h.take_log();
        assert_eq!(
            log,
            vec![
                "hide timer".to_string(),
                "countdown 00:00".to_string(),
                "status Info: Timer cancelled.".to_string(),
            ]
        );
        assert!(!h.controller.timers.is_set(TimerSlot::TimerFrame));
    }

    #[test]
    fn finished_timer_announces_itself() {
        let mut h = Harness::loaded(MockBridge::default());
        h.send(Msg::invoke(HandlerId::StartTimer, vec![json!(2), json!("Nap")]));
        h.take_log();
        h.advance(Duration::from_millis(2100));
        let log = h.take_log();
        assert!(log.contains(&"hide timer".to_string()));
        assert!(log.contains(&"speak Nap is done!".to_string()));
        assert_eq!(log.last().map(String::as_str), Some("status Success: Timer finished!"));
    }

    #[test]
    fn unknown_handler_reports_error() {
        let mut h = Harness::loaded(MockBridge::default());
        h.send(Msg::Tap {
            column: ColumnId::Magic,
            index: 1,
        });
        assert_eq!(h.statuses(), vec!["status Error: That action is not ready yet."]);
    }

    #[test]
    fn repeated_app_tap_is_debounced() {
        let mut h = Harness::loaded(MockBridge::default());
        let netflix = ColumnId::Quick;
        h.send(Msg::Tap {
            column: netflix,
            index: 1,
        });
        h.send(Msg::Tap {
            column: netflix,
            index: 1,
        });
        h.controller.pool.join();
        assert_eq!(h.bridge.launched.lock().len(), 1);
        assert_eq!(
            h.statuses().last().map(String::as_str),
            Some("status Info: Hang on, that action is already starting...")
        );

        h.now += Duration::from_millis(1000);
        h.send(Msg::Tap {
            column: netflix,
            index: 1,
        });
        h.controller.pool.join();
        assert_eq!(h.bridge.launched.lock().len(), 2);
    }

    #[test]
    fn quick_launch_plays_youtube() {
        let mut h = Harness::loaded(MockBridge::default());
        h.send(Msg::Tap {
            column: ColumnId::Quick,
            index: 0,
        });
        h.controller.pool.join();
        let launched = h.bridge.launched.lock();
        assert_eq!(launched[0].0, "837");
        assert_eq!(launched[0].1["contentId"], "abc123");
        drop(launched);
        assert!(h.take_log().contains(&"speak Playing Bluey".to_string()));
    }

    #[test]
    fn failed_launch_shows_error() {
        let mut h = Harness::loaded(MockBridge {
            fail_launch: true,
            ..MockBridge::default()
        });
        h.send(Msg::Tap {
            column: ColumnId::Quick,
            index: 1,
        });
        h.pump();
        assert_eq!(
            h.statuses().last().map(String::as_str),
            Some("status Error: Failed to launch app on TV.")
        );
    }

    #[test]
    fn hold_and_remote_pin_unlock_settings() {
        let mut h = Harness::loaded(MockBridge::default());
        h.send(Msg::GearPress);
        h.advance(Duration::from_millis(1000));
        h.advance(Duration::from_millis(1000));
        assert!(h.take_log().contains(&"pin pad true".to_string()));

        for digit in "2468".chars() {
            h.send(Msg::PinDigit(digit));
        }
        let log = h.take_log();
        assert!(log.contains(&"settings true".to_string()));
        assert!(log.contains(&"grid Some(1)".to_string()));
        assert!(h.controller.gate.is_unlocked());

        h.send(Msg::GearClick);
        assert!(h.take_log().contains(&"settings false".to_string()));
    }

    #[test]
    fn wrong_pin_clears_after_a_second() {
        let mut h = Harness::loaded(MockBridge::default());
        h.send(Msg::GearPress);
        h.advance(Duration::from_millis(2000));
        for digit in "1234".chars() {
            h.send(Msg::PinDigit(digit));
        }
        assert!(h.take_log().contains(&"pin ✖ Wrong PIN true".to_string()));
        h.advance(PIN_ERROR_CLEAR);
        assert_eq!(h.take_log(), vec!["pin ○○○○ false".to_string()]);
    }

    #[test]
    fn toast_hides_after_three_seconds() {
        let mut h = Harness::loaded(MockBridge::default());
        h.send(Msg::GearClick);
        h.take_log();
        h.advance(Duration::from_millis(2999));
        assert!(h.take_log().is_empty());
        h.advance(Duration::from_millis(1));
        assert_eq!(h.take_log(), vec!["hide status".to_string()]);
    }

    #[test]
    fn speech_status_follows_up() {
        let mut h = Harness::with_speech(MockBridge::default(), SpeechOutcome::WarmingUp);
        h.send(Msg::invoke(HandlerId::MagicSpeak, vec![json!("  hello  ")]));
        assert_eq!(h.statuses(), vec!["status Info: Warming up the voice..."]);
        h.advance(Duration::from_millis(2000));
        assert_eq!(h.statuses(), vec!["status Success: Said: \"hello\""]);

        h.send(Msg::invoke(HandlerId::MagicSpeak, vec![json!(" ")]));
        assert_eq!(h.statuses(), vec!["status Error: Type something to say first."]);
    }

    #[test]
    fn fireworks_burst_until_they_end() {
        let mut h = Harness::loaded(MockBridge::default());
        h.send(Msg::invoke(HandlerId::MagicFireworks, Vec::new()));
        let log = h.take_log();
        assert!(log.contains(&"show fireworks Fireworks Celebration!".to_string()));
        assert!(log.contains(&"status Success: Fireworks launched!".to_string()));
        h.advance(BURST_INTERVAL);
        assert!(h.take_log().contains(&"burst".to_string()));
        h.advance(Duration::from_secs(8));
        assert!(h.take_log().contains(&"hide fireworks".to_string()));
        assert!(!h.controller.timers.is_set(TimerSlot::FireworksBurst));
    }

    #[test]
    fn short_passphrase_is_rejected_without_saving() {
        let mut h = Harness::new(MockBridge::default());
        h.send(Msg::SetPassphrase("too short".into()));
        assert_eq!(
            h.statuses(),
            vec!["status Error: Passphrase must have at least 5 words (found 2)"]
        );
        assert_eq!(h.storage.get(keys::CONTENT_PASSPHRASE), None);
    }

    #[test]
    fn local_pin_must_have_four_digits() {
        let mut h = Harness::new(MockBridge::default());
        h.send(Msg::SetLocalPin("12".into()));
        h.send(Msg::SetLocalPin("9-8-7-6".into()));
        assert_eq!(
            h.statuses(),
            vec![
                "status Error: PIN must be exactly 4 digits.",
                "status Success: PIN updated for this device.",
            ]
        );
        assert_eq!(h.storage.get(keys::PARENTAL_PIN).as_deref(), Some("9876"));
    }

    #[test]
    fn discovery_registers_new_devices() {
        let tv = Device {
            id: "X004".into(),
            host: "192.168.1.20".into(),
            ..Device::default()
        };
        let mut h = Harness::new(MockBridge {
            wifi: true,
            roku: Some(vec![tv]),
            govee: None,
            ..MockBridge::default()
        });
        h.send(Msg::invoke(HandlerId::DiscoverDevices, Vec::new()));
        h.pump();
        assert_eq!(
            h.statuses(),
            vec![
                "status Info: Looking for devices...",
                "status Success: Found 1 new devices!",
            ]
        );
        let saved = DeviceRegistry::load(&h.storage);
        assert!(saved.get(DeviceKind::Roku, "X004").is_some());
    }

    #[test]
    fn startup_scan_announces_itself_on_wifi() {
        let mut h = Harness::new(MockBridge::online());
        h.send(Msg::Start);
        for _ in 0..3 {
            h.pump();
        }
        assert!(h
            .statuses()
            .contains(&"status Info: Looking for devices...".to_string()));

        let mut h = Harness::new(MockBridge::default());
        h.send(Msg::Start);
        h.pump();
        h.pump();
        assert!(!h
            .statuses()
            .contains(&"status Info: Looking for devices...".to_string()));
    }

    #[test]
    fn cloud_controls_need_key_and_target() {
        let mut h = Harness::new(MockBridge {
            cloud_devices: vec![json!({ "device": "AA:BB", "model": "H6159" })],
            cloud_state: json!({ "data": { "properties": [{ "powerState": "off" }] } }),
            ..MockBridge::default()
        });
        h.send(Msg::CloudPower(None));
        h.send(Msg::SetGoveeApiKey("secret".into()));
        h.send(Msg::CloudState);
        h.send(Msg::SetCloudTarget {
            device: " ".into(),
            model: "H6159".into(),
        });
        assert_eq!(
            h.statuses(),
            vec![
                "status Error: Save your API key first.",
                "status Success: Govee API key saved.",
                "status Error: Select a device and model first.",
                "status Error: Select a device and model first.",
            ]
        );

        h.send(Msg::ListCloudLights);
        h.pump();
        assert_eq!(h.statuses(), vec!["status Success: Found 1 cloud lights."]);
        assert_eq!(
            h.controller.cloud_target,
            CloudTarget::new("AA:BB", "H6159")
        );
        h.send(Msg::CloudColor("teal".into()));
        assert_eq!(h.statuses(), vec!["status Error: Pick a valid color."]);
    }

    #[test]
    fn cloud_power_brightness_and_state() {
        let mut h = Harness::new(MockBridge {
            cloud_state: json!({ "data": { "properties": [{ "powerState": "off" }] } }),
            ..MockBridge::default()
        });
        h.send(Msg::SetGoveeApiKey("secret".into()));
        h.send(Msg::SetCloudTarget {
            device: "AA:BB".into(),
            model: "H6159".into(),
        });
        h.take_log();

        h.send(Msg::CloudPower(None));
        h.pump();
        assert_eq!(h.statuses(), vec!["status Success: Cloud: turn sent."]);
        assert!(h.controller.cloud_power);

        h.send(Msg::CloudState);
        h.pump();
        let log = h.take_log();
        assert!(log.contains(&format!(
            "cloud state {}",
            json!({ "data": { "properties": [{ "powerState": "off" }] } })
        )));
        assert!(log.contains(&"status Success: Fetched cloud state.".to_string()));
        assert!(!h.controller.cloud_power);

        h.send(Msg::CloudPower(None));
        h.pump();
        h.send(Msg::CloudBrightness(Some(150.0)));
        h.pump();
        h.send(Msg::CloudColor("#00ff00".into()));
        h.pump();
        let sent = h.bridge.cloud_sent.lock().clone();
        assert_eq!(
            sent.iter().map(|(_, _, cmd)| cmd.clone()).collect::<Vec<_>>(),
            vec![
                json!({ "name": "turn", "value": "on" }),
                json!({ "name": "turn", "value": "on" }),
                json!({ "name": "brightness", "value": 100 }),
                json!({ "name": "color", "value": { "r": 0, "g": 255, "b": 0 } }),
            ]
        );
        assert!(sent.iter().all(|(device, model, _)| device == "AA:BB" && model == "H6159"));
        assert_eq!(h.storage.get(keys::GOVEE_BRIGHTNESS).as_deref(), Some("100"));
    }

    #[test]
    fn lights_need_a_target() {
        let mut h = Harness::new(MockBridge::default());
        h.send(Msg::invoke(HandlerId::LightsOn, Vec::new()));
        assert_eq!(h.statuses(), vec!["status Error: Add the light IP first."]);

        h.storage.set(keys::GOVEE_IP, "192.168.1.40");
        h.send(Msg::invoke(HandlerId::LightsToggle, Vec::new()));
        h.pump();
        assert_eq!(h.bridge.sent_commands(), vec!["turn"]);
        assert_eq!(
            h.statuses(),
            vec!["status Success: Sent turn to 192.168.1.40:4003"]
        );
        assert!(h.controller.lights_on);
    }

    #[test]
    fn light_status_and_cloud_list() {
        let mut h = Harness::new(MockBridge::default());
        h.send(Msg::ListCloudLights);
        assert_eq!(h.statuses(), vec!["status Error: Add your Govee API key first."]);

        h.send(Msg::SetLightTarget {
            host: " 192.168.1.40 ".into(),
            port: Some(4010),
        });
        h.send(Msg::CheckLightStatus);
        h.pump();
        assert_eq!(
            h.statuses(),
            vec![
                "status Success: Light address saved.",
                "status Success: online: no, power: -, brightness: -, color: -",
            ]
        );
        assert_eq!(h.storage.get(keys::GOVEE_PORT).as_deref(), Some("4010"));

        h.send(Msg::SetGoveeApiKey("secret".into()));
        h.send(Msg::ListCloudLights);
        h.pump();
        assert_eq!(
            h.statuses().last().map(String::as_str),
            Some("status Success: Found 0 cloud lights.")
        );
    }

    #[test]
    fn theme_toggle_is_persisted() {
        let mut h = Harness::new(MockBridge::default());
        h.send(Msg::invoke(HandlerId::ToggleTheme, Vec::new()));
        assert_eq!(h.take_log(), vec!["theme light".to_string()]);
        assert_eq!(h.storage.get(keys::THEME).as_deref(), Some("light"));
    }

    #[test]
    fn pending_deadline_drives_the_actor() {
        let mut h = Harness::loaded(MockBridge::default());
        let act = h.send(Msg::invoke(HandlerId::StartTimer, vec![json!(60)]));
        assert!(matches!(
            act,
            Act::WaitUntil { deadline, timeout_msg: Msg::Tick } if deadline == h.now + FRAME_INTERVAL
        ));
        assert!(matches!(h.send(Msg::Shutdown), Act::Shutdown));
    }
}
