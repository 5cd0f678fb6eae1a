use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

use crate::session::SessionState;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Resize,
    /// A new snapshot from the orchestrator
    Session(SessionState),
    Score(u32),
    Highscore(u32),
    Tick,
}

/// Source of game events (keyboard, resize, orchestrator updates)
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Forward every value from an observable subscription as a game event.
/// The thread ends when either side hangs up.
pub fn forward_updates<T, F>(updates: Receiver<T>, tx: Sender<GameEvent>, wrap: F)
where
    T: Send + 'static,
    F: Fn(T) -> GameEvent + Send + 'static,
{
    thread::spawn(move || {
        for value in updates {
            if tx.send(wrap(value)).is_err() {
                break;
            }
        }
    });
}

/// Production event source: crossterm input plus whatever is forwarded
/// through `sender()`.
pub struct CrosstermEventSource {
    tx: Sender<GameEvent>,
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        let input_tx = tx.clone();
        thread::spawn(move || loop {
            let evt = match event::read() {
                // ignore key releases on platforms that report them
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    GameEvent::Key(key)
                }
                Ok(CtEvent::Resize(_, _)) => GameEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if input_tx.send(evt).is_err() {
                break;
            }
        });

        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<GameEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source fed from a plain channel
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Redraw cadence when nothing else happens
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: GameEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> GameEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => GameEvent::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Observable;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
        );
        assert!(matches!(runner.step(), GameEvent::Tick));
    }

    #[test]
    fn forwarded_updates_arrive_as_events() {
        let (tx, rx) = mpsc::channel();
        let score = Observable::new(0u32);
        forward_updates(score.subscribe(), tx, GameEvent::Score);
        score.set(4);

        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(200)),
        );
        let mut seen = Vec::new();
        for _ in 0..10 {
            match runner.step() {
                GameEvent::Score(s) => {
                    seen.push(s);
                    if s == 4 {
                        break;
                    }
                }
                GameEvent::Tick => {}
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(seen, vec![0, 4]);
    }
}
