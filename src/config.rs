use std::fs;
use serde::Deserialize;
use toml;

#[allow(non_camel_case_types)]
type ms = u64;

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct BridgeConfig {
    /// Number of times per second to poll for line signals and timer
    /// expirations. Higher is better, but will also consume more CPU cycles.
    pub tick_rate: f64,

    /// Timing windows for the line decoder.
    pub timing: TimingConfig,

    /// GPIO configuration.
    pub gpio: GpioConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            timing: Default::default(),
            gpio: Default::default(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct TimingConfig {
    /// Maximum gap (ms) between rotary pulses belonging to the same digit.
    /// A longer silence ends the rotation and dials the counted digit.
    pub rotation_timeout_ms: ms,

    /// Time (ms) the line must stay on-hook before the hang-up is treated
    /// as genuine rather than as part of a hook-flash gesture.
    pub hookflash_down_ms: ms,

    /// Time (ms) the line must stay off-hook before an open hook-flash
    /// gesture is resolved into a digit.
    pub hookflash_up_ms: ms,

    /// Digit dialed for each rotary pulse count, indexed by count minus one.
    /// The default layout dials `0` for ten pulses; dials with non-standard
    /// plates (e.g. reversed) can override this.
    pub digit_layout: String,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rotation_timeout_ms: 300,
            hookflash_down_ms: 500,
            hookflash_up_ms: 500,
            digit_layout: String::from("1234567890"),
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct GpioConfig {
    /// Input configuration.
    pub inputs: GpioInputsConfig,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct GpioInputsConfig {
    /// Input configuration for the hook switch.
    pub hook: InputPinConfig,

    /// Input configuration for the rotary dial pulse contact.
    pub dial_pulse: InputPinConfig,

    /// Input configuration for the ground key. Omit this key on subsets
    /// without the button.
    pub ground_key: Option<InputPinConfig>,
}

impl Default for GpioInputsConfig {
    fn default() -> Self {
        Self {
            hook: InputPinConfig { pin: 14, bounce_ms: Some(50), pull: None },
            dial_pulse: InputPinConfig { pin: 15, bounce_ms: Some(80), pull: None },
            ground_key: None,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct InputPinConfig {
    /// BCM pin number of the input.
    pub pin: u8,

    /// Bounce time (ms) of the input.
    pub bounce_ms: Option<ms>,

    /// Name of the pull resistor to use. Defaults to "up"; the line contacts
    /// switch to ground.
    pub pull: Option<String>,
}

pub fn load_config(path: &str) -> BridgeConfig {
    let config_str = fs::read_to_string(path).expect("Unable to read config file");
    let config: BridgeConfig = toml::from_str(&config_str).expect("Unable to parse config file");
    config
}
