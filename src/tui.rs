//! Terminal front-end for the quiz
//!
//! Renders the five game screens from session state snapshots and feeds the
//! player commands back into the session. All game logic lives in the
//! session actor; this module only draws and translates key presses.

use std::error::Error;
use std::io::stdout;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use tokio::sync::watch;

use crate::ascii;
use crate::maplink;
use crate::quiz::{Answer, GamePhase, GameState, Round, SessionHandle, OPTIONS_PER_ROUND};

const SPINNER: &[char] = &['|', '/', '-', '\\'];

/// Cached half-block rendering of the current round's photo
struct PhotoCache {
    path: std::path::PathBuf,
    size: (u16, u16),
    text: Text<'static>,
}

struct App {
    handle: SessionHandle,
    state_rx: watch::Receiver<GameState>,
    photo: Option<PhotoCache>,
    spinner_frame: usize,
    quit: bool,
}

/// Run the quiz UI until the player quits
pub fn run(handle: SessionHandle) -> Result<(), Box<dyn Error>> {
    terminal::enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let state_rx = handle.watch();
    let mut app = App {
        handle,
        state_rx,
        photo: None,
        spinner_frame: 0,
        quit: false,
    };
    let result = app.run_loop(&mut terminal);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

impl App {
    fn run_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), Box<dyn Error>> {
        loop {
            let state = self.state_rx.borrow().clone();
            terminal.draw(|frame| self.render(frame, &state))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    self.on_key(key.code, &state);
                }
            }
            self.spinner_frame = self.spinner_frame.wrapping_add(1);

            if self.quit {
                self.handle.shutdown();
                return Ok(());
            }
        }
    }

    fn on_key(&mut self, code: KeyCode, state: &GameState) {
        if matches!(code, KeyCode::Char('q') | KeyCode::Esc) {
            self.quit = true;
            return;
        }
        match state.phase {
            GamePhase::Start => {
                if code == KeyCode::Enter {
                    self.handle.start();
                }
            }
            GamePhase::LoadingRound => {
                if state.load_failed && code == KeyCode::Enter {
                    self.handle.start();
                }
            }
            GamePhase::Quiz => {
                if let Some(index) = option_key(code) {
                    self.handle.select_option(index);
                }
            }
            GamePhase::Result => {
                if matches!(code, KeyCode::Enter | KeyCode::Char('n') | KeyCode::Char(' ')) {
                    self.handle.advance();
                }
            }
            GamePhase::Summary => {
                if matches!(code, KeyCode::Enter | KeyCode::Char('r')) {
                    self.handle.reset();
                }
            }
        }
    }

    fn render(&mut self, frame: &mut Frame, state: &GameState) {
        let area = frame.area();
        frame.render_widget(
            Block::default().style(Style::default().bg(Color::Black)),
            area,
        );

        match state.phase {
            GamePhase::Start => self.render_start(frame, area),
            GamePhase::LoadingRound => self.render_loading(frame, area, state),
            GamePhase::Quiz | GamePhase::Result => self.render_round(frame, area, state),
            GamePhase::Summary => self.render_summary(frame, area, state),
        }
    }

    fn render_start(&self, frame: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(Span::styled(
                "GeoQuiz",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from("Where was this photo taken?"),
            Line::from("Pick one of four options before the clock runs out."),
            Line::default(),
            Line::from(Span::styled(
                "Enter: start    q: quit",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        render_centered(frame, area, lines);
    }

    fn render_loading(&self, frame: &mut Frame, area: Rect, state: &GameState) {
        let spinner = SPINNER[self.spinner_frame % SPINNER.len()];
        let (message, style) = if state.load_failed {
            (
                state.status_message.clone(),
                Style::default().fg(Color::Red),
            )
        } else {
            (
                format!("{spinner} {}", state.status_message),
                Style::default().fg(Color::Gray),
            )
        };
        let mut lines = vec![Line::from(Span::styled(message, style))];
        if state.load_failed {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                "Enter: try again    q: quit",
                Style::default().fg(Color::DarkGray),
            )));
        }
        render_centered(frame, area, lines);
    }

    fn render_round(&mut self, frame: &mut Frame, area: Rect, state: &GameState) {
        let [hud_area, photo_area, options_area, help_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(OPTIONS_PER_ROUND as u16 + 2),
            Constraint::Length(1),
        ])
        .areas(area);

        self.render_hud(frame, hud_area, state);
        self.render_photo(frame, photo_area, state);
        self.render_options(frame, options_area, state);

        let help = match state.phase {
            GamePhase::Quiz => "1-4/a-d: answer    q: quit",
            _ => "Enter: next    q: quit",
        };
        frame.render_widget(
            Paragraph::new(help)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            help_area,
        );
    }

    fn render_hud(&self, frame: &mut Frame, area: Rect, state: &GameState) {
        let mut spans = vec![Span::styled(
            format!(
                " Round {}/{} ",
                state.current_round_index + 1,
                state.round_count()
            ),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )];
        if state.phase == GamePhase::Quiz {
            let time_style = if state.time_left < 10 {
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Yellow)
            };
            spans.push(Span::styled(
                format!("  Time {:2}s ", state.time_left),
                time_style,
            ));
        }
        spans.push(Span::styled(
            format!("  Score {} ", state.score),
            Style::default().fg(Color::White),
        ));
        frame.render_widget(
            Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
            area,
        );
    }

    fn render_photo(&mut self, frame: &mut Frame, area: Rect, state: &GameState) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let Some(round) = state.current_round() else {
            return;
        };
        let Some(path) = round.image_path.as_deref() else {
            frame.render_widget(
                Paragraph::new("(no photo)").alignment(Alignment::Center),
                inner,
            );
            return;
        };

        let size = ascii::fit_area(inner.width, inner.height);
        let cached = self
            .photo
            .as_ref()
            .is_some_and(|c| c.path == path && c.size == size);
        if !cached {
            match ascii::render_photo(path, size.0, size.1) {
                Ok(text) => {
                    self.photo = Some(PhotoCache {
                        path: path.to_path_buf(),
                        size,
                        text,
                    });
                }
                Err(err) => {
                    frame.render_widget(
                        Paragraph::new(format!("photo unavailable: {err}"))
                            .style(Style::default().fg(Color::Red))
                            .alignment(Alignment::Center),
                        inner,
                    );
                    return;
                }
            }
        }

        if let Some(cache) = &self.photo {
            let x = inner.x + (inner.width.saturating_sub(size.0)) / 2;
            let y = inner.y + (inner.height.saturating_sub(size.1)) / 2;
            frame.render_widget(
                Paragraph::new(cache.text.clone()),
                Rect::new(x, y, size.0, size.1),
            );
        }
    }

    fn render_options(&self, frame: &mut Frame, area: Rect, state: &GameState) {
        let Some(round) = state.current_round() else {
            return;
        };
        let mut lines = Vec::with_capacity(round.location.options.len() + 2);

        for (idx, option) in round.location.options.iter().enumerate() {
            let letter = (b'A' + idx as u8) as char;
            let style = option_style(state, round, idx);
            lines.push(Line::from(Span::styled(
                format!("  {letter}) {option}"),
                style,
            )));
        }

        if state.phase == GamePhase::Result {
            lines.push(Line::default());
            let location = &round.location;
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{} ", location.name),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    maplink::search_url(location.lat, location.lng),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
        }

        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
    }

    fn render_summary(&self, frame: &mut Frame, area: Rect, state: &GameState) {
        let lines = vec![
            Line::from(Span::styled(
                "Game over!",
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(
                format!("{} / {}", state.score, state.round_count()),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(verdict(state.score, state.round_count())),
            Line::default(),
            Line::from(Span::styled(
                "Enter: play again    q: quit",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        render_centered(frame, area, lines);
    }
}

/// Map an answer key to an option index
fn option_key(code: KeyCode) -> Option<usize> {
    match code {
        KeyCode::Char(c @ '1'..='4') => Some(c as usize - '1' as usize),
        KeyCode::Char(c @ 'a'..='d') => Some(c as usize - 'a' as usize),
        _ => None,
    }
}

fn option_style(state: &GameState, round: &Round, idx: usize) -> Style {
    if state.phase != GamePhase::Result {
        return Style::default().fg(Color::White);
    }
    let is_correct = idx == round.location.correct_option_index;
    let is_selected = round.answer == Some(Answer::Choice(idx));
    if is_correct {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else if is_selected {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// Scaled thresholds: 8/10 for the expert line, 5/10 for the middle one
fn verdict(score: u32, total: usize) -> &'static str {
    let total = total.max(1);
    let score = score as usize;
    if score * 10 >= total * 8 {
        "You are a true geography expert!"
    } else if score * 2 >= total {
        "Not bad, but there is room to grow."
    } else {
        "Time to open the atlas!"
    }
}

fn render_centered(frame: &mut Frame, area: Rect, lines: Vec<Line<'_>>) {
    let height = lines.len() as u16;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let rect = Rect::new(area.x, y, area.width, height.min(area.height));
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        rect,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_keys_map_to_option_indices() {
        assert_eq!(option_key(KeyCode::Char('1')), Some(0));
        assert_eq!(option_key(KeyCode::Char('4')), Some(3));
        assert_eq!(option_key(KeyCode::Char('a')), Some(0));
        assert_eq!(option_key(KeyCode::Char('d')), Some(3));
        assert_eq!(option_key(KeyCode::Char('5')), None);
        assert_eq!(option_key(KeyCode::Enter), None);
    }

    #[test]
    fn verdict_thresholds_scale_with_round_count() {
        assert_eq!(verdict(8, 10), "You are a true geography expert!");
        assert_eq!(verdict(5, 10), "Not bad, but there is room to grow.");
        assert_eq!(verdict(4, 10), "Time to open the atlas!");
        assert_eq!(verdict(2, 2), "You are a true geography expert!");
    }
}
