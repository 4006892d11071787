use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Identifies which decoder timer produced an expiration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Gap watchdog for the rotary pulse train.
    Rotation,
    /// The line must stay on-hook this long for a genuine hang-up.
    HookflashDown,
    /// The line must stay off-hook this long to close a flash gesture.
    HookflashUp,
}

/// Expiration notice posted by a timer thread.
#[derive(Copy, Clone, Debug)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

/// A cancelable single-shot delay.
///
/// Each armed instance carries a generation number. Canceling or rearming
/// bumps the generation, so an expiration posted by a superseded instance
/// fails the [`accepts`](DelayTimer::accepts) check and gets dropped by the
/// receiver. The sleeping thread itself is never interrupted; invalidation
/// is enough, and at most one instance per kind is ever live.
pub struct DelayTimer {
    kind: TimerKind,
    duration: Duration,
    generation: u64,
    tx: mpsc::Sender<TimerFired>,
}

impl DelayTimer {
    pub fn new(kind: TimerKind, duration: Duration, tx: mpsc::Sender<TimerFired>) -> Self {
        Self {
            kind,
            duration,
            generation: 0,
            tx,
        }
    }

    /// Invalidates any outstanding instance and starts a fresh one.
    pub fn rearm(&mut self) {
        self.generation += 1;
        let fired = TimerFired {
            kind: self.kind,
            generation: self.generation,
        };
        let tx = self.tx.clone();
        let duration = self.duration;
        thread::spawn(move || {
            spin_sleep::sleep(duration);
            // The decoder may have shut down in the meantime.
            tx.send(fired).ok();
        });
    }

    /// Invalidates any outstanding instance without starting a new one.
    pub fn cancel(&mut self) {
        self.generation += 1;
    }

    /// Indicates whether an expiration belongs to the live instance.
    pub fn accepts(&self, fired: &TimerFired) -> bool {
        fired.kind == self.kind && fired.generation == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECV_WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn expiration_of_live_instance_is_accepted() {
        let (tx, rx) = mpsc::channel();
        let mut timer = DelayTimer::new(TimerKind::Rotation, Duration::from_millis(10), tx);
        timer.rearm();
        let fired = rx.recv_timeout(RECV_WINDOW).unwrap();
        assert!(timer.accepts(&fired));
    }

    #[test]
    fn rearm_supersedes_previous_instance() {
        let (tx, rx) = mpsc::channel();
        let mut timer = DelayTimer::new(TimerKind::Rotation, Duration::from_millis(10), tx);
        timer.rearm();
        let first = rx.recv_timeout(RECV_WINDOW).unwrap();
        timer.rearm();
        assert!(!timer.accepts(&first));
        let second = rx.recv_timeout(RECV_WINDOW).unwrap();
        assert!(timer.accepts(&second));
    }

    #[test]
    fn cancel_invalidates_outstanding_instance() {
        let (tx, rx) = mpsc::channel();
        let mut timer = DelayTimer::new(TimerKind::HookflashDown, Duration::from_millis(10), tx);
        timer.rearm();
        timer.cancel();
        let fired = rx.recv_timeout(RECV_WINDOW).unwrap();
        assert!(!timer.accepts(&fired));
    }

    #[test]
    fn kinds_do_not_cross_accept() {
        let (tx, rx) = mpsc::channel();
        let mut down = DelayTimer::new(TimerKind::HookflashDown, Duration::from_millis(10), tx.clone());
        let up = DelayTimer::new(TimerKind::HookflashUp, Duration::from_millis(10), tx);
        down.rearm();
        let fired = rx.recv_timeout(RECV_WINDOW).unwrap();
        assert!(down.accepts(&fired));
        assert!(!up.accepts(&fired));
    }
}
