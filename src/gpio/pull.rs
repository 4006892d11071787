use rppal::gpio::{InputPin, Pin};
use log::warn;

/// Internal pull resistor applied to a line input.
#[derive(Copy, Clone, Debug)]
pub enum Pull {
    None,
    Up,
    Down
}

impl From<&str> for Pull {
    fn from(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "down" => Pull::Down,
            "none" => Pull::None,
            "up" | _ => Pull::Up
        }
    }
}

impl From<&Option<String>> for Pull {
    fn from(name: &Option<String>) -> Self {
        match name {
            Some(name) => Pull::from(name.as_str()),
            // The subset's contacts switch to ground.
            None => Pull::Up
        }
    }
}

impl Pull {
    /// Logic level the line rests at while its contact is open.
    pub fn resting_level(self) -> bool {
        match self {
            Pull::Down => false,
            Pull::Up | Pull::None => true
        }
    }
}

pub fn make_input_pin(pin: Pin, pull: Pull) -> InputPin {
    match pull {
        Pull::Up => pin.into_input_pullup(),
        Pull::Down => pin.into_input_pulldown(),
        Pull::None => {
            warn!("Input pin {} is floating; expecting an external pull resistor.", pin.pin());
            pin.into_input()
        }
    }
}
