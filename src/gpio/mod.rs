#![cfg(feature = "rpi")]
#![allow(dead_code)]

mod debounce;
mod pull;

pub use debounce::*;
pub use pull::*;

use std::sync::mpsc;
use std::time::Duration;
use log::info;
use rppal::gpio::Gpio;
use crate::config::{BridgeConfig, InputPinConfig};
use crate::decoder::LineInputSignal;

/// Provides an interface for the subset's line-signaling pins.
///
/// Each line is debounced in software with its configured bounce time and
/// reported as a logical signal; electrical polarity (which level means
/// "contact closed") is resolved here from the pull configuration, so the
/// decoder never sees raw levels.
pub struct LineGpioInterface {
    gpio: Gpio,
    /// Pin for the hook switch input.
    in_hook: SoftInputPin,
    /// Resting (open-contact) level of the hook line.
    hook_rest: bool,
    /// Pin for the rotary pulse contact input.
    in_dial_pulse: SoftInputPin,
    /// Resting level of the pulse line.
    dial_pulse_rest: bool,
    /// Pin for the ground key input, if the subset has one.
    in_ground_key: Option<SoftInputPin>,
    /// Resting level of the ground key line.
    ground_key_rest: bool,
}

fn line_input(gpio: &Gpio, config: &InputPinConfig) -> Result<(SoftInputPin, bool), rppal::gpio::Error> {
    let pull = Pull::from(&config.pull);
    let pin = make_input_pin(gpio.get(config.pin)?, pull);
    let input = pin.debounce(Duration::from_millis(config.bounce_ms.unwrap_or(0)))?;
    Ok((input, pull.resting_level()))
}

impl LineGpioInterface {
    pub fn new(config: &BridgeConfig) -> Result<Self, rppal::gpio::Error> {
        let gpio = Gpio::new()?;
        let inputs = &config.gpio.inputs;

        let (in_hook, hook_rest) = line_input(&gpio, &inputs.hook)?;
        let (in_dial_pulse, dial_pulse_rest) = line_input(&gpio, &inputs.dial_pulse)?;
        let (in_ground_key, ground_key_rest) = match &inputs.ground_key {
            Some(ground_key) => {
                let (input, rest) = line_input(&gpio, ground_key)?;
                (Some(input), rest)
            }
            None => (None, true),
        };

        info!(
            "Line GPIO initialized (hook {}, dial pulse {}, ground key {}).",
            in_hook.pin(),
            in_dial_pulse.pin(),
            in_ground_key.as_ref().map(|p| p.pin().to_string()).unwrap_or_else(|| String::from("absent"))
        );

        Ok(Self {
            gpio,
            in_hook,
            hook_rest,
            in_dial_pulse,
            dial_pulse_rest,
            in_ground_key,
            ground_key_rest,
        })
    }

    /// Reports whether the hook switch currently reads on-hook.
    ///
    /// The handset resting on the hook leaves the contact open, so the line
    /// sits at its resting level.
    pub fn is_on_hook(&self) -> bool {
        self.in_hook.is_high() == self.hook_rest
    }

    /// Attaches edge listeners and returns the channel they feed.
    pub fn listen(&mut self) -> mpsc::Receiver<LineInputSignal> {
        let (tx, rx) = mpsc::channel();

        // Hook switch, both edges.
        let sender = tx.clone();
        let rest = self.hook_rest;
        self.in_hook.set_on_changed(move |level| {
            sender.send(LineInputSignal::HookState(level == rest)).ok();
        });

        // Rotary pulse contact. Only the pulse-forming edge is reported;
        // the preceding break is implied.
        let sender = tx.clone();
        let rest = self.dial_pulse_rest;
        self.in_dial_pulse.set_on_changed(move |level| {
            if level == rest {
                sender.send(LineInputSignal::DialPulse).ok();
            }
        });

        // Ground key, both edges. Pressing grounds the line.
        if let Some(in_ground_key) = &mut self.in_ground_key {
            let sender = tx.clone();
            let rest = self.ground_key_rest;
            in_ground_key.set_on_changed(move |level| {
                sender.send(LineInputSignal::GroundKey(level != rest)).ok();
            });
        }

        info!("Line GPIO listeners attached.");
        rx
    }
}
