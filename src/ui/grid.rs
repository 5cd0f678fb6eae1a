use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders, Widget},
};

use super::{dim, feedback_color};
use crate::session::Feedback;

/// Square grid of visual stimulus cells. Positions are 1-based, row-major.
pub struct StimulusGrid {
    pub size: u32,
    pub lit: Option<u32>,
    pub feedback: Feedback,
}

impl StimulusGrid {
    /// 1-based cell position for a row/column pair
    pub fn position(&self, row: u32, col: u32) -> u32 {
        row * self.size + col + 1
    }
}

/// Largest centred square (in terminal cells, 2 columns per row) fitting `area`.
fn square(area: Rect) -> Rect {
    let height = area.height.min(area.width / 2);
    let width = height * 2;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

impl Widget for StimulusGrid {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.size == 0 {
            return;
        }
        let area = square(area);
        let ratios = vec![Constraint::Ratio(1, self.size); self.size as usize];

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(ratios.clone())
            .split(area);

        for (r, row_area) in rows.iter().enumerate() {
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(ratios.clone())
                .split(*row_area);

            for (c, cell_area) in cells.iter().enumerate() {
                let lit = self.lit == Some(self.position(r as u32, c as u32));
                let style = if lit {
                    Style::default().bg(feedback_color(self.feedback))
                } else {
                    dim()
                };
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(dim())
                    .style(style)
                    .render(*cell_area, buf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_row_major_from_one() {
        let grid = StimulusGrid {
            size: 3,
            lit: None,
            feedback: Feedback::None,
        };
        assert_eq!(grid.position(0, 0), 1);
        assert_eq!(grid.position(0, 2), 3);
        assert_eq!(grid.position(1, 0), 4);
        assert_eq!(grid.position(2, 2), 9);
    }

    #[test]
    fn square_fits_and_centres() {
        let sq = square(Rect::new(0, 0, 40, 10));
        assert_eq!(sq, Rect::new(10, 0, 20, 10));
        let sq = square(Rect::new(0, 0, 10, 30));
        assert_eq!(sq, Rect::new(0, 12, 10, 5));
    }

    #[test]
    fn lit_cell_gets_feedback_background() {
        let area = Rect::new(0, 0, 18, 9);
        let mut buf = Buffer::empty(area);
        StimulusGrid {
            size: 3,
            lit: Some(5),
            feedback: Feedback::Correct,
        }
        .render(area, &mut buf);
        // centre of the middle cell
        assert_eq!(buf[(9, 4)].bg, ratatui::style::Color::Green);
        assert_ne!(buf[(1, 1)].bg, ratatui::style::Color::Green);
    }
}
