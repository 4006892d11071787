use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use log::info;
use simplelog::{ColorChoice, Config as LogConfig, LevelFilter, TermLogger, TerminalMode};

use pots_bridge::config::load_config;
use pots_bridge::decoder::{LineDecoder, LineEvent};

const CONFIG_PATH: &str = "./res/bridge_config.toml";

fn main() {
    TermLogger::init(LevelFilter::Info, LogConfig::default(), TerminalMode::Mixed, ColorChoice::Auto)
        .expect("Unable to initialize logger");

    let config = load_config(CONFIG_PATH);
    info!("Config loaded: {}", CONFIG_PATH);

    let (event_tx, event_rx) = mpsc::channel();
    let mut decoder = LineDecoder::new(&config.timing, event_tx);

    #[cfg(feature = "rpi")]
    let _gpio = {
        let mut gpio = pots_bridge::gpio::LineGpioInterface::new(&config)
            .expect("Unable to initialize line GPIO");
        decoder.listen(gpio.listen());
        // A handset lifted before startup produces no edge; fold the level in.
        decoder.sync_hook_level(gpio.is_on_hook());
        gpio
    };

    #[cfg(all(feature = "devmode", not(feature = "rpi")))]
    decoder.listen(pots_bridge::devinput::listen());

    #[cfg(not(any(feature = "rpi", feature = "devmode")))]
    log::warn!("Built without an input source; enable the `rpi` or `devmode` feature.");

    let running = Arc::new(AtomicBool::new(true));
    let running_ctl = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_ctl.store(false, Ordering::SeqCst);
    })
    .expect("Unable to register shutdown handler");

    let tick_interval = Duration::from_secs_f64(1.0 / config.tick_rate);
    info!("Line decoder running.");

    while running.load(Ordering::SeqCst) {
        decoder.tick();
        while let Ok(event) = event_rx.try_recv() {
            match event {
                LineEvent::OffHook => info!("Subscriber went off-hook"),
                LineEvent::OnHook => info!("Subscriber hung up"),
                LineEvent::DigitDialed(digit) => info!("Digit dialed: {}", digit),
            }
        }
        spin_sleep::sleep(tick_interval);
    }

    info!("Shutting down.");
}
