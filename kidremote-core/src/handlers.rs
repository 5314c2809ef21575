//! Closed set of named operations that content buttons may invoke.

use std::fmt;

use serde_json::Value;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HandlerId {
    StartTimer,
    MagicTimer,
    CancelTimer,
    StartFireworks,
    MagicFireworks,
    StopFireworks,
    Speak,
    MagicSpeak,
    StopSpeaking,
    LaunchYouTube,
    LaunchApp,
    LightsOn,
    LightsOff,
    LightsToggle,
    LightBrightness,
    LightColor,
    LightPreset,
    LightRoutine,
    ToggleTheme,
    DiscoverDevices,
}

pub struct HandlerInfo {
    pub id: HandlerId,
    pub name: &'static str,
    pub description: &'static str,
}

pub const CATALOG: &[HandlerInfo] = &[
    HandlerInfo {
        id: HandlerId::StartTimer,
        name: "startToddlerTimer",
        description: "Countdown overlay. Args: seconds, label.",
    },
    HandlerInfo {
        id: HandlerId::MagicTimer,
        name: "handleMagicTimerStart",
        description: "Countdown with an automatic \"N minute timer\" label. Args: seconds.",
    },
    HandlerInfo {
        id: HandlerId::CancelTimer,
        name: "cancelToddlerTimer",
        description: "Cancel the running countdown.",
    },
    HandlerInfo {
        id: HandlerId::StartFireworks,
        name: "startFireworksShow",
        description: "Fireworks overlay. Args: seconds, message.",
    },
    HandlerInfo {
        id: HandlerId::MagicFireworks,
        name: "handleMagicFireworks",
        description: "Eight second fireworks celebration.",
    },
    HandlerInfo {
        id: HandlerId::StopFireworks,
        name: "stopFireworksShow",
        description: "Stop the fireworks overlay.",
    },
    HandlerInfo {
        id: HandlerId::Speak,
        name: "speakTts",
        description: "Say a phrase out loud. Args: text.",
    },
    HandlerInfo {
        id: HandlerId::MagicSpeak,
        name: "handleMagicSpeak",
        description: "Say a typed phrase, rejecting empty text. Args: text.",
    },
    HandlerInfo {
        id: HandlerId::StopSpeaking,
        name: "stopMagicSpeak",
        description: "Stop talking.",
    },
    HandlerInfo {
        id: HandlerId::LaunchYouTube,
        name: "launchSpecificYouTube",
        description: "Play a YouTube video on the TV. Args: videoId.",
    },
    HandlerInfo {
        id: HandlerId::LaunchApp,
        name: "launchConfiguredApp",
        description: "Launch a TV app. Args: {appId, params, label}.",
    },
    HandlerInfo {
        id: HandlerId::LightsOn,
        name: "lightsOn",
        description: "Turn the LAN light on.",
    },
    HandlerInfo {
        id: HandlerId::LightsOff,
        name: "lightsOff",
        description: "Turn the LAN light off.",
    },
    HandlerInfo {
        id: HandlerId::LightsToggle,
        name: "lightsToggle",
        description: "Toggle the LAN light.",
    },
    HandlerInfo {
        id: HandlerId::LightBrightness,
        name: "lightBrightness",
        description: "Set LAN light brightness. Args: percent.",
    },
    HandlerInfo {
        id: HandlerId::LightColor,
        name: "lightColor",
        description: "Set LAN light color. Args: \"#rrggbb\".",
    },
    HandlerInfo {
        id: HandlerId::LightPreset,
        name: "lightPreset",
        description: "Apply a named color preset (warm, blue, sunset, white).",
    },
    HandlerInfo {
        id: HandlerId::LightRoutine,
        name: "lightRoutine",
        description: "Run light steps in order. Args: [steps] or a `routine` field.",
    },
    HandlerInfo {
        id: HandlerId::ToggleTheme,
        name: "toggleTheme",
        description: "Switch between the light and dark theme.",
    },
    HandlerInfo {
        id: HandlerId::DiscoverDevices,
        name: "discoverDevices",
        description: "Look for TVs and lights on the network.",
    },
];

impl HandlerId {
    pub fn from_name(name: &str) -> Option<Self> {
        CATALOG
            .iter()
            .find(|info| info.name == name)
            .map(|info| info.id)
    }

    pub fn info(self) -> &'static HandlerInfo {
        CATALOG
            .iter()
            .find(|info| info.id == self)
            .unwrap_or(&CATALOG[0])
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric argument, accepting numbers and numeric strings.
pub fn number_arg(args: &[Value], index: usize) -> Option<f64> {
    match args.get(index)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn text_arg(args: &[Value], index: usize) -> Option<&str> {
    args.get(index).and_then(Value::as_str)
}
