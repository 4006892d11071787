mod timer;

use std::sync::mpsc;
use std::time::Duration;

use log::{debug, info, trace, warn};

use crate::config::TimingConfig;

pub use timer::{DelayTimer, TimerFired, TimerKind};

/// Input signals delivered by the line's edge sources.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineInputSignal {
    /// The hook switch changed. `true` means the handset is on-hook.
    HookState(bool),
    /// The rotary dial produced one pulse.
    DialPulse,
    /// The ground key changed. `true` means the key is pressed.
    GroundKey(bool),
}

/// Semantic events published to the line's subscriber.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// The handset went off-hook for a new session.
    OffHook,
    /// The handset genuinely returned on-hook, ending the session.
    OnHook,
    /// A digit was dialed, by rotary pulses (`0`-`9`) or by hook flashes
    /// (`#` for one flash, `*` for two).
    DigitDialed(char),
}

/// Coarse line activity derived from the decoder counters.
///
/// Purely informational; all transitions are driven by the counters alone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineActivity {
    /// No pulse train or flash gesture is open.
    Idle,
    /// A rotary pulse train is being counted.
    Dialing,
    /// An on-hook was registered and its flash window is still open.
    FlashPending,
}

/// Decodes debounced line edges into semantic line events.
///
/// The decoder holds two counters and three single-shot timers. A hook (or
/// ground key) transition to on-hook opens a flash window instead of ending
/// the session outright; only when the line stays down for the full down
/// window is the hang-up genuine. Dial pulses are counted until the rotation
/// watchdog sees a long enough gap, at which point the count is mapped to a
/// digit.
///
/// All state is owned by this value and mutated from `&mut self` reactions;
/// drive it from a single loop (see [`tick`](LineDecoder::tick)).
pub struct LineDecoder {
    /// Dial pulses counted since the last end of rotation.
    pulse_counter: u32,
    /// On-hook entries counted while a flash window was open.
    hookflash_counter: u32,
    rotation_timer: DelayTimer,
    hookflash_down_timer: DelayTimer,
    hookflash_up_timer: DelayTimer,
    /// Pulse-count-to-digit mapping for the attached dial plate.
    digit_layout: String,
    /// Edge signal source, attached with [`listen`](LineDecoder::listen).
    input: Option<mpsc::Receiver<LineInputSignal>>,
    /// Expirations posted by the timer threads.
    timer_rx: mpsc::Receiver<TimerFired>,
    /// Event sink; publication is fire-and-forget.
    output: mpsc::Sender<LineEvent>,
}

impl LineDecoder {
    pub fn new(timing: &TimingConfig, output: mpsc::Sender<LineEvent>) -> Self {
        let (timer_tx, timer_rx) = mpsc::channel();
        Self {
            pulse_counter: 0,
            hookflash_counter: 0,
            rotation_timer: DelayTimer::new(
                TimerKind::Rotation,
                Duration::from_millis(timing.rotation_timeout_ms),
                timer_tx.clone(),
            ),
            hookflash_down_timer: DelayTimer::new(
                TimerKind::HookflashDown,
                Duration::from_millis(timing.hookflash_down_ms),
                timer_tx.clone(),
            ),
            hookflash_up_timer: DelayTimer::new(
                TimerKind::HookflashUp,
                Duration::from_millis(timing.hookflash_up_ms),
                timer_tx,
            ),
            digit_layout: timing.digit_layout.clone(),
            input: None,
            timer_rx,
            output,
        }
    }

    /// Attaches the edge signal source.
    pub fn listen(&mut self, input: mpsc::Receiver<LineInputSignal>) {
        self.input = Some(input);
    }

    /// Folds in the hook level read at startup.
    ///
    /// A handset lifted before the decoder starts produces no edge to react
    /// to, so an off-hook level is turned into a synthetic off-hook entry.
    pub fn sync_hook_level(&mut self, on_hook: bool) {
        if !on_hook {
            info!("Hook already off at startup.");
            self.enter_off_hook();
        }
    }

    /// Processes pending edge signals and timer expirations.
    pub fn tick(&mut self) {
        loop {
            let signal = match self.input.as_ref().map(|rx| rx.try_recv()) {
                Some(Ok(signal)) => signal,
                _ => break,
            };
            self.handle_input(signal);
        }
        while let Ok(fired) = self.timer_rx.try_recv() {
            self.handle_timer(fired);
        }
    }

    /// Reacts to one edge signal.
    pub fn handle_input(&mut self, signal: LineInputSignal) {
        match signal {
            LineInputSignal::HookState(true) => self.enter_on_hook(),
            LineInputSignal::HookState(false) => self.enter_off_hook(),
            LineInputSignal::DialPulse => self.count_pulse(),
            // The ground key simulates a brief hang-up without releasing
            // the hook, so it feeds the same state machine.
            LineInputSignal::GroundKey(true) => self.enter_on_hook(),
            LineInputSignal::GroundKey(false) => self.enter_off_hook(),
        }
    }

    /// Current activity, for observability only.
    pub fn activity(&self) -> LineActivity {
        if self.hookflash_counter > 0 {
            LineActivity::FlashPending
        } else if self.pulse_counter > 0 {
            LineActivity::Dialing
        } else {
            LineActivity::Idle
        }
    }

    fn handle_timer(&mut self, fired: TimerFired) {
        let live = match fired.kind {
            TimerKind::Rotation => self.rotation_timer.accepts(&fired),
            TimerKind::HookflashDown => self.hookflash_down_timer.accepts(&fired),
            TimerKind::HookflashUp => self.hookflash_up_timer.accepts(&fired),
        };
        if !live {
            trace!("Discarded stale {:?} expiration (gen {})", fired.kind, fired.generation);
            return;
        }
        match fired.kind {
            TimerKind::Rotation => self.end_of_rotation(),
            TimerKind::HookflashDown => self.hookflash_down_timeout(),
            TimerKind::HookflashUp => self.hookflash_up_timeout(),
        }
    }

    fn enter_on_hook(&mut self) {
        self.hookflash_counter += 1;
        // The hook going down abandons any pulse train in progress.
        self.rotation_timer.cancel();
        trace!("Hook down (flash count {})", self.hookflash_counter);
        self.hookflash_down_timer.rearm();
    }

    fn enter_off_hook(&mut self) {
        if self.hookflash_counter == 0 {
            // First off-hook of a fresh session.
            info!("Line went off-hook.");
            self.publish(LineEvent::OffHook);
            self.pulse_counter = 0;
        } else {
            // The line came back up inside the flash window; the gesture
            // stays open until the up window runs out.
            self.hookflash_down_timer.cancel();
            trace!("Hook up within flash window");
            self.hookflash_up_timer.rearm();
        }
    }

    fn count_pulse(&mut self) {
        self.pulse_counter += 1;
        trace!("Dial pulse {}", self.pulse_counter);
        self.rotation_timer.rearm();
    }

    fn end_of_rotation(&mut self) {
        let pulses = self.pulse_counter;
        self.pulse_counter = 0;
        match self.pulses_to_digit(pulses) {
            Some(digit) => {
                debug!("End of rotation: {} pulses -> '{}'", pulses, digit);
                self.publish(LineEvent::DigitDialed(digit));
            }
            None => warn!("End of rotation with unmappable pulse count {}; ignored", pulses),
        }
    }

    fn hookflash_down_timeout(&mut self) {
        // The line stayed down for the whole window: a genuine hang-up.
        self.hookflash_up_timer.cancel();
        self.hookflash_counter = 0;
        info!("Line went on-hook.");
        self.publish(LineEvent::OnHook);
    }

    fn hookflash_up_timeout(&mut self) {
        debug!("{} hook flash(es) detected", self.hookflash_counter);
        match self.hookflash_counter {
            1 => self.publish(LineEvent::DigitDialed('#')),
            2 => self.publish(LineEvent::DigitDialed('*')),
            n => debug!("Flash burst of {} ignored", n),
        }
        self.hookflash_counter = 0;
    }

    fn pulses_to_digit(&self, pulses: u32) -> Option<char> {
        self.digit_layout.chars().nth((pulses as usize).checked_sub(1)?)
    }

    fn publish(&self, event: LineEvent) {
        // The subscriber may have gone away; delivery is at-most-once.
        self.output.send(event).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    const ROTATION_MS: u64 = 30;
    const DOWN_MS: u64 = 50;
    const UP_MS: u64 = 50;

    fn timing() -> TimingConfig {
        TimingConfig {
            rotation_timeout_ms: ROTATION_MS,
            hookflash_down_ms: DOWN_MS,
            hookflash_up_ms: UP_MS,
            digit_layout: String::from("1234567890"),
        }
    }

    fn decoder() -> (LineDecoder, mpsc::Receiver<LineEvent>) {
        let (tx, rx) = mpsc::channel();
        (LineDecoder::new(&timing(), tx), rx)
    }

    /// Keeps ticking the decoder for `ms` so queued expirations get applied.
    fn settle(decoder: &mut LineDecoder, ms: u64) {
        let deadline = Instant::now() + Duration::from_millis(ms);
        while Instant::now() < deadline {
            decoder.tick();
            thread::sleep(Duration::from_millis(2));
        }
        decoder.tick();
    }

    #[test]
    fn fresh_off_hook_emits_and_resets_pulses() {
        let (mut decoder, rx) = decoder();
        decoder.pulse_counter = 4;
        decoder.handle_input(LineInputSignal::HookState(false));
        assert_eq!(rx.try_recv(), Ok(LineEvent::OffHook));
        assert_eq!(decoder.pulse_counter, 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn startup_sync_detects_lifted_handset() {
        let (mut decoder, rx) = decoder();
        decoder.sync_hook_level(true);
        assert!(rx.try_recv().is_err());
        decoder.sync_hook_level(false);
        assert_eq!(rx.try_recv(), Ok(LineEvent::OffHook));
    }

    #[test]
    fn stale_rotation_expiration_is_ignored() {
        let (mut decoder, rx) = decoder();
        decoder.handle_input(LineInputSignal::DialPulse);
        // Let the rotation watchdog expire and queue its notice, then
        // abandon the train before the decoder gets to process it.
        thread::sleep(Duration::from_millis(3 * ROTATION_MS));
        decoder.handle_input(LineInputSignal::HookState(true));
        decoder.tick();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn held_on_hook_resets_the_flash_counter() {
        let (mut decoder, rx) = decoder();
        decoder.handle_input(LineInputSignal::HookState(true));
        assert_eq!(decoder.hookflash_counter, 1);
        settle(&mut decoder, 3 * DOWN_MS);
        assert_eq!(rx.try_recv(), Ok(LineEvent::OnHook));
        assert_eq!(decoder.hookflash_counter, 0);
    }

    #[test]
    fn ground_key_feeds_the_hook_state_machine() {
        let (mut decoder, rx) = decoder();
        decoder.handle_input(LineInputSignal::GroundKey(true));
        assert_eq!(decoder.hookflash_counter, 1);
        decoder.handle_input(LineInputSignal::GroundKey(false));
        settle(&mut decoder, 3 * UP_MS);
        assert_eq!(rx.try_recv(), Ok(LineEvent::DigitDialed('#')));
        assert_eq!(decoder.hookflash_counter, 0);
    }

    #[test]
    fn flash_burst_of_three_resolves_to_nothing() {
        let (mut decoder, rx) = decoder();
        for _ in 0..3 {
            decoder.handle_input(LineInputSignal::HookState(true));
            decoder.handle_input(LineInputSignal::HookState(false));
        }
        settle(&mut decoder, 3 * UP_MS);
        assert!(rx.try_recv().is_err());
        assert_eq!(decoder.hookflash_counter, 0);
    }

    #[test]
    fn overlong_pulse_train_is_discarded() {
        let (mut decoder, rx) = decoder();
        decoder.handle_input(LineInputSignal::HookState(false));
        assert_eq!(rx.try_recv(), Ok(LineEvent::OffHook));
        for _ in 0..11 {
            decoder.handle_input(LineInputSignal::DialPulse);
        }
        settle(&mut decoder, 3 * ROTATION_MS);
        assert!(rx.try_recv().is_err());
        assert_eq!(decoder.pulse_counter, 0);
    }

    #[test]
    fn stray_pulses_are_still_counted() {
        // The hardware cannot tell a stray pulse source apart, so pulses
        // arriving outside a session still dial a digit.
        let (mut decoder, rx) = decoder();
        decoder.handle_input(LineInputSignal::DialPulse);
        settle(&mut decoder, 3 * ROTATION_MS);
        assert_eq!(rx.try_recv(), Ok(LineEvent::DigitDialed('1')));
    }

    #[test]
    fn digit_layout_maps_pulse_counts() {
        let (tx, _rx) = mpsc::channel();
        let mut custom = timing();
        custom.digit_layout = String::from("0987654321");
        let decoder = LineDecoder::new(&custom, tx);
        assert_eq!(decoder.pulses_to_digit(1), Some('0'));
        assert_eq!(decoder.pulses_to_digit(10), Some('1'));
        assert_eq!(decoder.pulses_to_digit(0), None);
        assert_eq!(decoder.pulses_to_digit(11), None);
    }

    #[test]
    fn activity_tracks_counters() {
        let (mut decoder, _rx) = decoder();
        assert_eq!(decoder.activity(), LineActivity::Idle);
        decoder.handle_input(LineInputSignal::DialPulse);
        assert_eq!(decoder.activity(), LineActivity::Dialing);
        decoder.handle_input(LineInputSignal::HookState(true));
        assert_eq!(decoder.activity(), LineActivity::FlashPending);
    }
}
