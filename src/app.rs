use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use crate::config::{
    Settings, EVENT_COUNT_RANGE, EVENT_COUNT_STEP, GRID_SIZES, INTERVAL_SECS_RANGE, N_BACK_RANGE,
};
use crate::orchestrator::Orchestrator;
use crate::runtime::GameEvent;
use crate::session::{Modality, SessionConfig, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Home,
    Settings,
    Game,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    NBack,
    EventCount,
    IntervalSecs,
    GridSize,
}

impl SettingField {
    pub const ALL: [SettingField; 4] = [
        SettingField::NBack,
        SettingField::EventCount,
        SettingField::IntervalSecs,
        SettingField::GridSize,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SettingField::NBack => "N-Back value",
            SettingField::EventCount => "Number of events",
            SettingField::IntervalSecs => "Time between events",
            SettingField::GridSize => "Grid size",
        }
    }
}

/// Settings being edited on the settings screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsDraft {
    pub settings: Settings,
    pub selected: usize,
}

impl SettingsDraft {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            selected: 0,
        }
    }

    pub fn field(&self) -> SettingField {
        SettingField::ALL[self.selected]
    }

    pub fn value_text(&self, field: SettingField) -> String {
        let s = &self.settings;
        match field {
            SettingField::NBack => s.n_back.to_string(),
            SettingField::EventCount => s.event_count.to_string(),
            SettingField::IntervalSecs => format!("{}s", s.interval_secs()),
            SettingField::GridSize => format!("{}x{}", s.grid_size, s.grid_size),
        }
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % SettingField::ALL.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + SettingField::ALL.len() - 1) % SettingField::ALL.len();
    }

    /// Step the selected field by one, staying inside its range.
    pub fn adjust(&mut self, up: bool) {
        let field = self.field();
        let s = &mut self.settings;
        match field {
            SettingField::NBack => {
                s.n_back = step_u32(s.n_back, up, 1, *N_BACK_RANGE.start(), *N_BACK_RANGE.end())
            }
            SettingField::EventCount => {
                s.event_count = step_u32(
                    s.event_count,
                    up,
                    EVENT_COUNT_STEP,
                    *EVENT_COUNT_RANGE.start(),
                    *EVENT_COUNT_RANGE.end(),
                )
            }
            SettingField::IntervalSecs => {
                let secs = s.interval_secs();
                let next = if up {
                    (secs + 1).min(*INTERVAL_SECS_RANGE.end())
                } else {
                    secs.saturating_sub(1).max(*INTERVAL_SECS_RANGE.start())
                };
                s.event_interval_ms = next * 1000;
            }
            SettingField::GridSize => {
                let pos = GRID_SIZES
                    .iter()
                    .position(|&g| g == s.grid_size)
                    .unwrap_or(0);
                let pos = if up {
                    (pos + 1).min(GRID_SIZES.len() - 1)
                } else {
                    pos.saturating_sub(1)
                };
                s.grid_size = GRID_SIZES[pos];
            }
        }
    }
}

/// Move to the next multiple of `step` in the given direction, within `min..=max`.
fn step_u32(v: u32, up: bool, step: u32, min: u32, max: u32) -> u32 {
    let below = v - v % step;
    if up {
        (below + step).min(max)
    } else if below < v {
        below.max(min)
    } else {
        v.saturating_sub(step).max(min)
    }
}

pub struct App {
    pub orchestrator: Orchestrator,
    pub state: AppState,
    pub settings: Settings,
    pub match_percentage: u8,
    pub draft: SettingsDraft,
    /// Latest orchestrator snapshots, kept for rendering
    pub session: SessionState,
    pub score: u32,
    pub highscore: u32,
    pub modality: Modality,
    pub error: Option<String>,
}

impl App {
    pub fn new(orchestrator: Orchestrator, settings: Settings, match_percentage: u8) -> Self {
        let session = orchestrator.state();
        let score = orchestrator.score();
        let highscore = orchestrator.highscore();
        Self {
            orchestrator,
            state: AppState::Home,
            settings,
            match_percentage,
            draft: SettingsDraft::new(settings),
            modality: session.modality,
            session,
            score,
            highscore,
            error: None,
        }
    }

    pub fn session_config(&self, modality: Modality) -> SessionConfig {
        let mut cfg = SessionConfig::from_settings(&self.settings, modality);
        cfg.target_match_percentage = self.match_percentage;
        cfg
    }

    pub fn start(&mut self, modality: Modality) {
        self.modality = modality;
        match self.orchestrator.start(self.session_config(modality)) {
            Ok(()) => {
                // don't wait for the forwarded snapshot, the old one may read as finished
                self.session = self.orchestrator.state();
                self.score = self.orchestrator.score();
                self.error = None;
                self.state = AppState::Game;
            }
            Err(e) => {
                warn!("could not start session: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    /// Game screen is showing a finished session
    pub fn is_finished(&self) -> bool {
        self.state == AppState::Game && !self.session.is_running
    }

    pub fn on_event(&mut self, event: GameEvent) -> Control {
        match event {
            GameEvent::Key(key) => return self.on_key(key),
            GameEvent::Session(state) => self.session = state,
            GameEvent::Score(score) => self.score = score,
            GameEvent::Highscore(highscore) => self.highscore = highscore,
            GameEvent::Resize | GameEvent::Tick => {}
        }
        Control::Continue
    }

    fn on_key(&mut self, key: KeyEvent) -> Control {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }

        match self.state {
            AppState::Home => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Control::Quit,
                KeyCode::Char('v') => self.start(Modality::Visual),
                KeyCode::Char('a') => self.start(Modality::Audio),
                KeyCode::Char('b') => self.start(Modality::AudioVisual),
                KeyCode::Char('s') => {
                    self.draft = SettingsDraft::new(self.settings);
                    self.state = AppState::Settings;
                }
                _ => {}
            },
            AppState::Settings => match key.code {
                KeyCode::Esc => self.state = AppState::Home,
                KeyCode::Up | KeyCode::Char('k') => self.draft.select_prev(),
                KeyCode::Down | KeyCode::Char('j') => self.draft.select_next(),
                KeyCode::Left | KeyCode::Char('h') => self.draft.adjust(false),
                KeyCode::Right | KeyCode::Char('l') => self.draft.adjust(true),
                KeyCode::Enter => {
                    self.settings = self.draft.settings;
                    self.orchestrator.save_settings(&self.settings);
                    self.state = AppState::Home;
                }
                _ => {}
            },
            AppState::Game => match key.code {
                KeyCode::Esc | KeyCode::Backspace => {
                    self.orchestrator.shutdown();
                    self.state = AppState::Home;
                }
                KeyCode::Char(' ') | KeyCode::Char('m') | KeyCode::Enter => {
                    self.orchestrator.check_match();
                }
                KeyCode::Char('r') if self.is_finished() => self.start(self.modality),
                _ => {}
            },
        }
        Control::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_stays_in_range() {
        let mut draft = SettingsDraft::new(Settings::default());
        for _ in 0..10 {
            draft.adjust(true);
        }
        assert_eq!(draft.settings.n_back, 5);
        for _ in 0..10 {
            draft.adjust(false);
        }
        assert_eq!(draft.settings.n_back, 1);

        draft.select_next();
        draft.select_next();
        assert_eq!(draft.field(), SettingField::IntervalSecs);
        for _ in 0..10 {
            draft.adjust(true);
        }
        assert_eq!(draft.settings.event_interval_ms, 5000);
        assert_eq!(draft.value_text(SettingField::IntervalSecs), "5s");

        draft.select_next();
        draft.adjust(true);
        draft.adjust(true);
        draft.adjust(true);
        assert_eq!(draft.settings.grid_size, 5);
        draft.adjust(false);
        assert_eq!(draft.value_text(SettingField::GridSize), "4x4");
    }

    #[test]
    fn event_count_moves_in_steps_of_five() {
        let mut draft = SettingsDraft::new(Settings::default());
        draft.select_next();
        assert_eq!(draft.field(), SettingField::EventCount);

        draft.adjust(true);
        assert_eq!(draft.settings.event_count, 15);
        for _ in 0..10 {
            draft.adjust(true);
        }
        assert_eq!(draft.settings.event_count, 30);
        for _ in 0..10 {
            draft.adjust(false);
        }
        assert_eq!(draft.settings.event_count, 5);

        // a value from the command line snaps onto the grid
        draft.settings.event_count = 12;
        draft.adjust(true);
        assert_eq!(draft.settings.event_count, 15);
        draft.settings.event_count = 12;
        draft.adjust(false);
        assert_eq!(draft.settings.event_count, 10);
    }

    #[test]
    fn selection_wraps() {
        let mut draft = SettingsDraft::new(Settings::default());
        draft.select_prev();
        assert_eq!(draft.field(), SettingField::GridSize);
        draft.select_next();
        assert_eq!(draft.field(), SettingField::NBack);
    }
}
