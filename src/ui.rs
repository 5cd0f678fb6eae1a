pub mod grid;
pub mod screen;

use ratatui::{
    style::{Color, Modifier, Style},
    Frame,
};

use crate::{app::App, session::Feedback};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(&app.state).render(app, f);
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

/// Colour used for the match bar and the lit grid cell
fn feedback_color(feedback: Feedback) -> Color {
    match feedback {
        Feedback::None => Color::Blue,
        Feedback::Correct => Color::Green,
        Feedback::Incorrect => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use crate::audio::SilentPlayer;
    use crate::config::{MemorySettingsStore, Settings};
    use crate::orchestrator::Orchestrator;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn app() -> App {
        let orch = Orchestrator::new(
            Arc::new(MemorySettingsStore::new(Settings::default(), 12)),
            Arc::new(SilentPlayer),
        );
        App::new(orch, Settings::default(), 30)
    }

    fn rendered(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn home_shows_settings_and_highscore() {
        let text = rendered(&app());
        assert!(text.contains("N-Back"));
        assert!(text.contains("High score: 12"));
        assert!(text.contains("(v)isual"));
    }

    #[test]
    fn settings_screen_lists_fields() {
        let mut app = app();
        app.state = AppState::Settings;
        let text = rendered(&app);
        assert!(text.contains("Number of events"));
        assert!(text.contains("3x3"));
    }

    #[test]
    fn game_screen_shows_score_and_letter() {
        let mut app = app();
        app.state = AppState::Game;
        app.session.is_running = true;
        app.session.modality = crate::session::Modality::AudioVisual;
        app.session.current_visual_value = Some(5);
        app.session.current_audio_value = Some(3);
        app.session.current_index = 2;
        app.score = 4;
        let text = rendered(&app);
        assert!(text.contains("N-Back (N=2)"));
        assert!(text.contains("Score 4"));
        assert!(text.contains("Event 3/10"));
        assert!(text.contains("Letter: C"));
    }
}
