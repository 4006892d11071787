use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use rppal::gpio::{InputPin, Level, Trigger};

/// Enables a raw input pin to be wrapped into a software-debounced input.
pub trait Debounce {
    fn debounce(self, settle: Duration) -> Result<SoftInputPin, rppal::gpio::Error>;
}

type ChangeCallback = Box<dyn FnMut(bool) + Send + 'static>;

/// Wrapper around `rppal::gpio::InputPin` that suppresses contact bounce
/// and reports settled level changes to a callback.
///
/// Edge interrupts post raw levels to a handler thread; a change is accepted
/// only if it differs from the last settled level and arrives outside the
/// settle window following the previous accepted change.
pub struct SoftInputPin {
    pin: InputPin,
    shared: Arc<Mutex<SoftInputState>>,
}

struct SoftInputState {
    settle: Duration,
    last_change: Instant,
    level: bool,
    callback: Option<ChangeCallback>,
}

impl SoftInputPin {
    fn new(mut pin: InputPin, settle: Duration) -> Result<Self, rppal::gpio::Error> {
        let level = pin.is_high();
        let shared = Arc::new(Mutex::new(SoftInputState {
            settle,
            last_change: Instant::now(),
            level,
            callback: None,
        }));

        let (tx, rx) = mpsc::channel();
        pin.set_async_interrupt(Trigger::Both, move |level| {
            tx.send(level == Level::High).ok();
        })?;

        let shared_handler = Arc::clone(&shared);
        thread::spawn(move || {
            while let Ok(raw) = rx.recv() {
                let mut state = shared_handler.lock().unwrap();
                if raw == state.level {
                    continue;
                }
                // Transitions inside the settle window are contact bounce.
                if state.last_change.elapsed() < state.settle {
                    continue;
                }
                state.level = raw;
                state.last_change = Instant::now();
                if let Some(callback) = state.callback.as_mut() {
                    callback(raw);
                }
            }
        });

        Ok(Self { pin, shared })
    }

    /// Registers the callback invoked on each settled level change.
    pub fn set_on_changed<C>(&mut self, callback: C)
    where C: FnMut(bool) + Send + 'static {
        self.shared.lock().unwrap().callback = Some(Box::new(callback));
    }

    /// Last settled level of the input.
    pub fn is_high(&self) -> bool {
        self.shared.lock().unwrap().level
    }

    /// BCM pin number of the underlying input.
    pub fn pin(&self) -> u8 {
        self.pin.pin()
    }
}

impl Debounce for InputPin {
    fn debounce(self, settle: Duration) -> Result<SoftInputPin, rppal::gpio::Error> {
        SoftInputPin::new(self, settle)
    }
}
