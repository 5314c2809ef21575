mod terminal;

use std::{
    fs,
    io::{self, BufRead},
    sync::Arc,
    time::Duration,
};

use env_logger::{Builder, Env};
use serde_json::Value;

use kidremote_core::{
    actor::Actor,
    bridge::NativeBridge,
    config::Config,
    content::{cloud::CloudConfigClient, DefaultProvider},
    controller::{Controller, Msg, Services},
    handlers::{HandlerId, CATALOG},
    render::ColumnId,
    storage::Storage,
};

use crate::terminal::TextSurface;

const ENV_LOG: &str = "KIDREMOTE_LOG";
const ENV_LOG_STYLE: &str = "KIDREMOTE_LOG_STYLE";

const HELP: &str = "\
commands:
  tap <remote|quick|magic> <n>   press a button
  quick <n>                      press a quick-launch tile (settings only)
  tab <id>                       switch tab
  hold / release / gear          settings gear
  pin <digits>                   type on the PIN pad, `pin cancel` closes it
  setpin <digits> / resetpin     device PIN override
  refresh                        reload kid-mode content
  passphrase [words...]          set or clear the cloud passphrase
  editor                         print the current config for editing
  upload <file>                  save a config document to the cloud
  timer <secs> [label] / cancel  countdown timer
  emoji <emoji>                  timer spinner emoji
  fireworks / stopfireworks
  say <text> / hush
  discover                       look for TVs and lights
  theme                          toggle light/dark
  lights on|off|toggle|status|cloud
  color <#rrggbb> / preset <name> / brightness <1-100>
  light ip <host> [port] / light key <api key> / tv ip <host>
  cloud on|off|toggle|state      cloud light control (after `lights cloud`)
  cloud brightness <n> / cloud color <#rrggbb>
  cloud target <device> <model>  pick the cloud light by hand
  run <handler> [json args]      invoke any handler
  handlers                       list handlers
  quit";

fn main() {
    // Setup logging from the env variables, with defaults.
    Builder::from_env(
        Env::new()
            .filter_or(ENV_LOG, "info")
            .write_style(ENV_LOG_STYLE),
    )
    .init();

    let config = Config::load_or_create();
    let proxy = Config::proxy();
    let storage = match Config::storage_path() {
        Some(path) => Storage::open(path),
        None => {
            log::warn!("no config directory, settings will not be kept");
            Storage::in_memory()
        }
    };

    let services = Services {
        surface: Box::new(TextSurface::default()),
        bridge: Arc::new(NativeBridge::new(
            storage.clone(),
            &config.govee_cloud_base,
            proxy.as_deref(),
        )),
        provider: Arc::new(DefaultProvider::new(
            config.content_dir.clone(),
            proxy.as_deref(),
        )),
        cloud: Arc::new(CloudConfigClient::new(
            config.cloud_config_base.clone(),
            proxy.as_deref(),
        )),
        storage,
        discovery_timeout: Duration::from_millis(config.discovery_timeout_ms),
    };
    let controller = Controller::spawn_default(move |this| Controller::new(this, services));
    if controller.send(Msg::Start).is_err() {
        log::error!("controller stopped before start");
        return;
    }

    println!("type `help` for a list of commands");
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("failed to read stdin: {}", err);
                break;
            }
        };
        match parse_command(&line) {
            Ok(Command::Send(msgs)) => {
                if msgs.into_iter().any(|msg| controller.send(msg).is_err()) {
                    break;
                }
            }
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Handlers) => {
                for info in CATALOG {
                    println!("  {:<24} {}", info.name, info.description);
                }
            }
            Ok(Command::Nothing) => {}
            Ok(Command::Quit) => break,
            Err(err) => println!("{}", err),
        }
    }
    let _ = controller.send(Msg::Shutdown);
    controller.join();
}

enum Command {
    Send(Vec<Msg>),
    Help,
    Handlers,
    Nothing,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();
    let msg = match (word, args.as_slice()) {
        ("", _) => return Ok(Command::Nothing),
        ("help", _) => return Ok(Command::Help),
        ("handlers", _) => return Ok(Command::Handlers),
        ("quit" | "exit", _) => return Ok(Command::Quit),
        ("tap", [column, index]) => Msg::Tap {
            column: ColumnId::from_name(column).ok_or("unknown column")?,
            index: parse_index(index)?,
        },
        ("quick", [index]) => Msg::QuickLaunchTile(parse_index(index)?),
        ("tab", [id]) => Msg::SelectTab(id.to_string()),
        ("hold", []) => Msg::GearPress,
        ("release", []) => Msg::GearRelease,
        ("gear", []) => Msg::GearClick,
        ("pin", ["cancel"]) => Msg::PinCancel,
        ("pin", [digits]) => {
            return Ok(Command::Send(digits.chars().map(Msg::PinDigit).collect()));
        }
        ("setpin", [digits]) => Msg::SetLocalPin(digits.to_string()),
        ("resetpin", []) => Msg::ClearLocalPin,
        ("refresh", []) => Msg::Refresh,
        ("editor", []) => Msg::LoadEditor,
        ("passphrase", _) => Msg::SetPassphrase(rest.to_string()),
        ("upload", [path]) => {
            let text = fs::read_to_string(path).map_err(|err| format!("{}: {}", path, err))?;
            Msg::SaveConfig(text)
        }
        ("timer", [secs, label @ ..]) => Msg::invoke(
            HandlerId::StartTimer,
            vec![Value::from(parse_number(secs)?), Value::from(label.join(" "))],
        ),
        ("cancel", []) => Msg::invoke(HandlerId::CancelTimer, Vec::new()),
        ("emoji", [emoji]) => Msg::SelectTimerEmoji(emoji.to_string()),
        ("fireworks", []) => Msg::invoke(HandlerId::MagicFireworks, Vec::new()),
        ("stopfireworks", []) => Msg::invoke(HandlerId::StopFireworks, Vec::new()),
        ("say", _) => Msg::invoke(HandlerId::Speak, vec![Value::from(rest)]),
        ("hush", []) => Msg::invoke(HandlerId::StopSpeaking, Vec::new()),
        ("discover", []) => Msg::invoke(HandlerId::DiscoverDevices, Vec::new()),
        ("theme", []) => Msg::invoke(HandlerId::ToggleTheme, Vec::new()),
        ("lights", ["on"]) => Msg::invoke(HandlerId::LightsOn, Vec::new()),
        ("lights", ["off"]) => Msg::invoke(HandlerId::LightsOff, Vec::new()),
        ("lights", ["toggle"]) => Msg::invoke(HandlerId::LightsToggle, Vec::new()),
        ("lights", ["status"]) => Msg::CheckLightStatus,
        ("lights", ["cloud"]) => Msg::ListCloudLights,
        ("color", [hex]) => Msg::invoke(HandlerId::LightColor, vec![Value::from(*hex)]),
        ("preset", [name]) => Msg::invoke(HandlerId::LightPreset, vec![Value::from(*name)]),
        ("brightness", [value]) => Msg::invoke(
            HandlerId::LightBrightness,
            vec![Value::from(parse_number(value)?)],
        ),
        ("light", ["ip", host]) => Msg::SetLightTarget {
            host: host.to_string(),
            port: None,
        },
        ("light", ["ip", host, port]) => Msg::SetLightTarget {
            host: host.to_string(),
            port: Some(port.parse().map_err(|_| "port must be a number")?),
        },
        ("light", ["key", key]) => Msg::SetGoveeApiKey(key.to_string()),
        ("tv", ["ip", host]) => Msg::SetRokuIp(host.to_string()),
        ("cloud", ["on"]) => Msg::CloudPower(Some(true)),
        ("cloud", ["off"]) => Msg::CloudPower(Some(false)),
        ("cloud", ["toggle"]) => Msg::CloudPower(None),
        ("cloud", ["state"]) => Msg::CloudState,
        ("cloud", ["brightness", value]) => Msg::CloudBrightness(Some(parse_number(value)?)),
        ("cloud", ["color", hex]) => Msg::CloudColor(hex.to_string()),
        ("cloud", ["target", device, model]) => Msg::SetCloudTarget {
            device: device.to_string(),
            model: model.to_string(),
        },
        ("run", [name, ..]) => {
            let handler = HandlerId::from_name(name).ok_or("unknown handler")?;
            let json = rest[name.len()..].trim();
            let args = if json.is_empty() {
                Vec::new()
            } else {
                match serde_json::from_str(json).map_err(|err| err.to_string())? {
                    Value::Array(args) => args,
                    other => vec![other],
                }
            };
            Msg::invoke(handler, args)
        }
        _ => return Err(format!("unknown command `{}`, try `help`", line)),
    };
    Ok(Command::Send(vec![msg]))
}

fn parse_index(text: &str) -> Result<usize, String> {
    text.parse().map_err(|_| format!("`{}` is not a button number", text))
}

fn parse_number(text: &str) -> Result<f64, String> {
    text.parse().map_err(|_| format!("`{}` is not a number", text))
}
