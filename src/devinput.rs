#![cfg(feature = "devmode")]

//! Keyboard-driven stand-in for the line GPIO, for development off-hardware.

use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use log::{info, warn};
use crate::decoder::LineInputSignal;

/// Spawns a reader thread translating stdin commands into line signals.
///
/// `h` lifts the handset, `H` puts it back on the hook, `p` produces one
/// dial pulse, `g` presses the ground key and `G` releases it. Commands can
/// be chained on one line (`H h` flashes the hook, `ppp` dials a 3).
pub fn listen() -> mpsc::Receiver<LineInputSignal> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break
            };
            for ch in line.chars() {
                let signal = match ch {
                    'h' => LineInputSignal::HookState(false),
                    'H' => LineInputSignal::HookState(true),
                    'p' => LineInputSignal::DialPulse,
                    'g' => LineInputSignal::GroundKey(true),
                    'G' => LineInputSignal::GroundKey(false),
                    ' ' => continue,
                    other => {
                        warn!("Unknown line command '{}'", other);
                        continue;
                    }
                };
                if tx.send(signal).is_err() {
                    return;
                }
            }
        }
    });
    info!("Dev input attached (h/H hook, p pulse, g/G ground key).");
    rx
}
