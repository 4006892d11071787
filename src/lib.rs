//! Decodes the line signaling of an analog telephone subset into semantic
//! line events, for use by a bridge between the analog line and a digital
//! network.
//!
//! The subset exposes three binary lines: the hook switch, the rotary dial
//! pulse contact, and (on some European handsets) a momentary ground key.
//! Raw edges on these lines are interpreted through timing windows by
//! [`decoder::LineDecoder`] to distinguish genuine hook transitions, rotary
//! pulse trains, and hook-flash gestures.

pub mod config;
pub mod decoder;
pub mod devinput;
pub mod gpio;

pub use config::{load_config, BridgeConfig, TimingConfig};
pub use decoder::{LineDecoder, LineEvent, LineInputSignal};
