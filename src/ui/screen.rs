use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::{
    bold, dim, feedback_color, grid::StimulusGrid, italic, HORIZONTAL_MARGIN, VERTICAL_MARGIN,
};
use crate::{
    app::{App, AppState, SettingField},
    audio::letter_for,
    session::Feedback,
};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

pub struct HomeScreen;

impl Screen for HomeScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3), // title
                Constraint::Length(2), // highscore
                Constraint::Length(6), // settings summary
                Constraint::Min(0),
                Constraint::Length(1), // error
                Constraint::Length(2), // legend
            ])
            .split(f.area());

        let title = Paragraph::new(Span::styled(
            "N-Back",
            Style::default().fg(Color::Cyan).patch(bold()),
        ))
        .block(Block::default().borders(Borders::BOTTOM))
        .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        let highscore = Paragraph::new(Span::styled(
            format!("High score: {}", app.highscore),
            bold(),
        ))
        .alignment(Alignment::Center);
        f.render_widget(highscore, chunks[1]);

        let s = &app.settings;
        let summary = vec![
            Line::from(format!("N-Back value: {}", s.n_back)),
            Line::from(format!("Number of events: {}", s.event_count)),
            Line::from(format!("Time between events: {}s", s.interval_secs())),
            Line::from(format!("Grid: {}x{}", s.grid_size, s.grid_size)),
            Line::from(format!("Target match rate: {}%", app.match_percentage)),
        ];
        f.render_widget(
            Paragraph::new(summary).alignment(Alignment::Center),
            chunks[2],
        );

        if let Some(err) = &app.error {
            let error = Paragraph::new(Span::styled(
                err.as_str(),
                Style::default().fg(Color::Red),
            ))
            .alignment(Alignment::Center);
            f.render_widget(error, chunks[4]);
        }

        let legend = Paragraph::new(Span::styled(
            "(v)isual / (a)udio / (b)oth / (s)ettings / (q)uit",
            italic(),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        f.render_widget(legend, chunks[5]);
    }
}

pub struct SettingsScreen;

impl Screen for SettingsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(2),
            ])
            .split(f.area());

        let title = Paragraph::new(Span::styled("Settings", bold()))
            .block(Block::default().borders(Borders::BOTTOM))
            .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        let lines: Vec<Line> = SettingField::ALL
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let selected = i == app.draft.selected;
                let marker = if selected { "> " } else { "  " };
                let style = if selected {
                    Style::default().fg(Color::Yellow).patch(bold())
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::styled(format!("{}{:<22}", marker, field.label()), style),
                    Span::styled(format!("< {} >", app.draft.value_text(*field)), style),
                ])
            })
            .collect();
        f.render_widget(Paragraph::new(lines), chunks[1]);

        let legend = Paragraph::new(Span::styled(
            "↑/↓ select / ←/→ change / (enter) save / (esc) cancel",
            italic(),
        ))
        .alignment(Alignment::Center);
        f.render_widget(legend, chunks[2]);
    }
}

pub struct GameScreen;

impl Screen for GameScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let session = &app.session;
        let shows_letter = session.modality.has_audio();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // title
                Constraint::Length(2), // stats
                Constraint::Min(3),    // grid
                Constraint::Length(if shows_letter { 2 } else { 0 }),
                Constraint::Length(3), // match bar
                Constraint::Length(1), // legend
            ])
            .split(f.area());

        let title = Paragraph::new(Span::styled(
            format!("N-Back (N={})", app.settings.n_back),
            bold(),
        ))
        .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        let event = if session.is_presenting() {
            format!("{}/{}", session.current_index + 1, app.settings.event_count)
        } else {
            format!("-/{}", app.settings.event_count)
        };
        let stats = Paragraph::new(Line::from(vec![
            Span::styled(format!("Score {}", app.score), bold()),
            Span::raw("   "),
            Span::styled(format!("Event {}", event), bold()),
            Span::raw("   "),
            Span::styled(format!("Correct {}", session.correct_count), bold()),
        ]))
        .alignment(Alignment::Center);
        f.render_widget(stats, chunks[1]);

        if session.modality.has_visual() {
            f.render_widget(
                StimulusGrid {
                    size: app.settings.grid_size,
                    lit: session.current_visual_value,
                    feedback: session.feedback,
                },
                chunks[2],
            );
        } else if !session.is_running {
            f.render_widget(
                Paragraph::new(Span::styled("listen for the letters", dim()))
                    .alignment(Alignment::Center),
                chunks[2],
            );
        }

        if shows_letter {
            let letter = session
                .current_audio_value
                .and_then(letter_for)
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            let letter = Paragraph::new(Span::styled(
                format!("Letter: {}", letter),
                Style::default().fg(Color::Magenta).patch(bold()),
            ))
            .alignment(Alignment::Center);
            f.render_widget(letter, chunks[3]);
        }

        let (bar_text, bar_style) = if app.is_finished() {
            (
                format!("Finished - score {} / high score {}", app.score, app.highscore),
                Style::default().fg(Color::Cyan).patch(bold()),
            )
        } else {
            let label = match session.feedback {
                Feedback::None => "MATCH",
                Feedback::Correct => "CORRECT",
                Feedback::Incorrect => "WRONG",
            };
            (
                label.to_string(),
                Style::default()
                    .fg(Color::White)
                    .bg(feedback_color(session.feedback))
                    .add_modifier(Modifier::BOLD),
            )
        };
        let bar = Paragraph::new(Span::styled(bar_text, bar_style))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(bar, chunks[4]);

        let legend = if app.is_finished() {
            "(r)etry / (esc) home"
        } else {
            "(space) match / (esc) stop"
        };
        f.render_widget(
            Paragraph::new(Span::styled(legend, italic())).alignment(Alignment::Center),
            chunks[5],
        );
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Home => Box::new(HomeScreen),
        AppState::Settings => Box::new(SettingsScreen),
        AppState::Game => Box::new(GameScreen),
    }
}
