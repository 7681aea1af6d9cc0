//! Layout and drawing: menu, board, sidebar, pause/quit/end-of-level overlays.

use crate::app::{Overlay, QuitOption, Screen, praise_words};
use crate::theme::Theme;
use candytrials::{Blocker, Coord, GameState, Grid, PraiseTier, Special, Tile};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each candy takes three columns: `[●]` leaves room for lock brackets.
const CELL_WIDTH: u16 = 3;
const CELL_HEIGHT: u16 = 1;
const SIDEBAR_WIDTH: u16 = 30;
/// Fade-in of refilled candies (TachyonFX).
const FADE_IN_MS: u32 = 300;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

/// `count` cells of `per` terminal cells each, clamped to `u16`.
fn span(count: usize, per: u16) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX).saturating_mul(per)
}

/// Board size in terminal cells, border included.
fn board_size(grid: &Grid) -> (u16, u16) {
    (
        span(grid.cols(), CELL_WIDTH).saturating_add(2),
        span(grid.rows(), CELL_HEIGHT).saturating_add(2),
    )
}

/// Board (with border) and sidebar, centred in `area`.
fn game_areas(area: Rect, grid: &Grid) -> (Rect, Rect) {
    let (bw, bh) = board_size(grid);
    let total_w = bw.saturating_add(SIDEBAR_WIDTH);
    let total_h = bh.max(20);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let board = Rect {
        height: bh.min(inner[0].height),
        ..inner[0]
    };
    (board, inner[1])
}

/// Inner board rect (no border); matches `draw_board`.
fn board_rect(area: Rect, grid: &Grid) -> Rect {
    let (outer, _) = game_areas(area, grid);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: span(grid.cols(), CELL_WIDTH).min(outer.width.saturating_sub(2)),
        height: span(grid.rows(), CELL_HEIGHT).min(outer.height.saturating_sub(2)),
    }
}

fn cell_origin(board: Rect, at: Coord) -> (u16, u16) {
    (
        board.x.saturating_add(span(at.col, CELL_WIDTH)),
        board.y.saturating_add(span(at.row, CELL_HEIGHT)),
    )
}

pub fn candy_glyph(special: Special) -> &'static str {
    match special {
        Special::None => "●",
        Special::StripedHorizontal => "═",
        Special::StripedVertical => "║",
        Special::Wrapped => "◙",
        Special::ColorBomb => "✸",
    }
}

/// Draw current screen. While `fresh_cells` is non-empty and animation is on, fades
/// those cells in, updating `fade_effect` / `fade_process_time`.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    overlay: &Overlay,
    fresh_cells: &[Coord],
    fade_effect: &mut Option<Effect>,
    fade_process_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, state, theme, overlay, area),
        Screen::Playing => {
            draw_game(frame, state, theme, overlay, area);
            if overlay.paused {
                draw_pause_overlay(frame, theme, area);
            }
            if !no_animation && !fresh_cells.is_empty() {
                apply_fade_in(
                    frame,
                    state,
                    theme,
                    fresh_cells,
                    fade_effect,
                    fade_process_time,
                    now,
                );
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, state, theme, overlay, area);
            draw_quit_menu(frame, theme, overlay.quit_selected);
        }
        Screen::LevelComplete => {
            draw_game(frame, state, theme, overlay, area);
            let chains = state.chains_remaining();
            draw_banner(
                frame,
                theme,
                " Trial complete ",
                theme.candy_color(candytrials::CandyColor::Green),
                vec![
                    format!("Score: {}", state.score()),
                    format!(
                        "{chains} chain{} left to break",
                        if chains == 1 { "" } else { "s" }
                    ),
                    String::new(),
                    "Enter - Next trial    Q - Menu".to_string(),
                ],
            );
        }
        Screen::GameOver => {
            draw_game(frame, state, theme, overlay, area);
            draw_banner(
                frame,
                theme,
                " Out of moves ",
                Color::Red,
                vec![
                    format!("Score: {} / {}", state.score(), state.target_score()),
                    format!("Ice left: {}", state.ice_remaining()),
                    String::new(),
                    "R - Retry    Q - Menu".to_string(),
                ],
            );
        }
        Screen::Ending => {
            draw_game(frame, state, theme, overlay, area);
            draw_banner(
                frame,
                theme,
                " The last chain is broken ",
                theme.title,
                vec![
                    format!("Final score: {}", state.score()),
                    String::new(),
                    "Enter - Menu    Q - Exit".to_string(),
                ],
            );
        }
    }
}

fn fresh_buffer_positions(board: Rect, fresh_cells: &[Coord]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &at in fresh_cells {
        let (x0, y0) = cell_origin(board, at);
        for x in x0..x0.saturating_add(CELL_WIDTH).min(board.right()) {
            for y in y0..y0.saturating_add(CELL_HEIGHT).min(board.bottom()) {
                set.insert((x, y));
            }
        }
    }
    set
}

fn apply_fade_in(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    fresh_cells: &[Coord],
    fade_effect: &mut Option<Effect>,
    fade_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(frame.area(), state.grid());
    let delta = fade_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *fade_process_time = Some(now);

    if fade_effect.is_none() {
        let fresh = fresh_buffer_positions(board, fresh_cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            fresh.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(theme.bg, theme.bg, (FADE_IN_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *fade_effect = Some(effect);
    }

    if let Some(effect) = fade_effect {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_menu(frame: &mut Frame, state: &GameState, theme: &Theme, overlay: &Overlay, area: Rect) {
    let campaign = state.campaign();
    let popup_w = 56u16;
    let popup_h = 14 + campaign.len().min(10) as u16 * 2;
    let popup = centered(area, popup_w, popup_h);

    let title = Line::from(vec![
        Span::styled(" Candy ", bold().fg(theme.candy_color(candytrials::CandyColor::Red))),
        Span::styled(" Trials ", bold().fg(theme.main_fg)),
    ]);
    let highlight = bold().fg(Color::Black).bg(theme.title);
    let normal = Style::default().fg(theme.main_fg);

    let mut lines = vec![Line::from(""), title, Line::from(""), candy_strip(theme), Line::from("")];
    lines.push(Line::from(Span::styled(
        " ─ CHOOSE A TRIAL ─ ",
        Style::default().fg(theme.div_line),
    )));
    for (number, level) in (1..).zip(campaign.iter()) {
        let style = if number == overlay.menu_level {
            highlight
        } else {
            normal
        };
        lines.push(Line::from(Span::styled(
            format!(
                " Trial {number}: {} moves, {} points, {} ice, {} locks ",
                level.moves, level.target_score, level.ice_count, level.lock_count
            ),
            style,
        )));
        lines.push(Line::from(Span::styled(
            level.description.clone(),
            Style::default().fg(theme.inactive_fg),
        )));
    }
    lines.extend([
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↕ ", Style::default().fg(theme.candy[1])),
            Span::from("CHOOSE   "),
            Span::styled(" ENTER ", Style::default().fg(theme.candy[1])),
            Span::from("PLAY   "),
            Span::styled(" Q ", Style::default().fg(Color::Rgb(255, 80, 80))),
            Span::from("QUIT"),
        ]),
    ]);

    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn candy_strip(theme: &Theme) -> Line<'static> {
    Line::from(
        candytrials::CandyColor::ALL
            .into_iter()
            .map(|c| Span::styled(" ● ", Style::default().fg(theme.candy_color(c))))
            .collect::<Vec<_>>(),
    )
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_game(frame: &mut Frame, state: &GameState, theme: &Theme, overlay: &Overlay, area: Rect) {
    let (board_outer, sidebar) = game_areas(area, state.grid());
    draw_board(frame, state, theme, overlay, board_outer);
    draw_sidebar(frame, state, theme, overlay, sidebar);
}

fn draw_board(frame: &mut Frame, state: &GameState, theme: &Theme, overlay: &Overlay, area: Rect) {
    let title = format!(" Trial {} ", state.level());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    block.render(area, frame.buffer_mut());
    let board = board_rect(frame.area(), state.grid());

    let grid = state.grid();
    let buf = frame.buffer_mut();
    for at in grid.coords() {
        let tile = &grid[at];
        let (x, y) = cell_origin(board, at);
        if x + CELL_WIDTH > board.x + board.width || y >= board.y + board.height {
            continue;
        }
        let bg = if overlay.selected == Some(at) {
            theme.title
        } else if overlay.cursor == at && !state.is_busy() {
            theme.cursor
        } else {
            theme.blocker_bg(tile.blocker)
        };
        let (left, right) = if tile.blocker == Blocker::Lock {
            ("[", "]")
        } else {
            (" ", " ")
        };
        let edge = Style::default().fg(theme.lock).bg(bg);
        buf.set_string(x, y, left, edge);
        buf.set_string(x + 1, y, candy_glyph(tile.special), candy_style(tile, theme, bg));
        buf.set_string(x + 2, y, right, edge);
    }
}

fn candy_style(tile: &Tile, theme: &Theme, bg: Color) -> Style {
    let style = Style::default().bg(bg);
    match tile.special {
        Special::None => style.fg(theme.candy_color(tile.color)),
        Special::ColorBomb => style.fg(theme.main_fg).add_modifier(Modifier::BOLD),
        _ => style
            .fg(theme.candy_color(tile.color))
            .add_modifier(Modifier::BOLD),
    }
}

fn tier_color(tier: PraiseTier, theme: &Theme) -> Color {
    match tier {
        PraiseTier::Low => theme.main_fg,
        PraiseTier::Mid => theme.candy[3],
        PraiseTier::High => theme.candy[4],
    }
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, overlay: &Overlay, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Stats
            Constraint::Length(1),
            Constraint::Length(6), // Goals (score + ice gauges)
            Constraint::Length(1),
            Constraint::Length(4), // Praise
            Constraint::Fill(1),   // Trial description + hints
        ])
        .split(area);

    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let stat = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, fg_style)])
    };
    let moves_style = if state.moves() <= 3 {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        fg_style
    };
    let stats = vec![
        stat("Trial: ", format!("{} / {}", state.level(), state.campaign().len())),
        stat("Score: ", state.score().to_string()),
        Line::from(vec![
            Span::styled("Moves: ", title_style),
            Span::styled(state.moves().to_string(), moves_style),
        ]),
        stat("Ice:   ", state.ice_remaining().to_string()),
        stat("Chains: ", state.chains_remaining().to_string()),
    ];
    Paragraph::new(Text::from(stats)).render(stats_inner, frame.buffer_mut());

    let goals_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let goals_inner = goals_block.inner(chunks[2]);
    goals_block.render(chunks[2], frame.buffer_mut());
    let goals = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); 4])
        .split(goals_inner);
    let target = state.target_score().max(1);
    let score_ratio = (f64::from(state.score()) / f64::from(target)).min(1.0);
    Paragraph::new(Line::from(Span::styled(
        format!("Target {}", state.target_score()),
        title_style,
    )))
    .render(goals[0], frame.buffer_mut());
    Gauge::default()
        .ratio(score_ratio)
        .gauge_style(Style::default().fg(theme.candy[2]))
        .render(goals[1], frame.buffer_mut());
    let total_ice = state.config().ice_count;
    let ice_ratio = if total_ice == 0 {
        1.0
    } else {
        1.0 - (f64::from(state.ice_remaining()) / total_ice as f64).min(1.0)
    };
    Paragraph::new(Line::from(Span::styled("Ice broken", title_style)))
        .render(goals[2], frame.buffer_mut());
    Gauge::default()
        .ratio(ice_ratio)
        .gauge_style(Style::default().fg(theme.ice))
        .render(goals[3], frame.buffer_mut());

    let praise_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let praise_inner = praise_block.inner(chunks[4]);
    praise_block.render(chunks[4], frame.buffer_mut());
    let mut praise_lines = Vec::new();
    if let Some(banner) = overlay.praise {
        praise_lines.push(Line::from(Span::styled(
            banner.word,
            bold().fg(tier_color(banner.tier, theme)),
        )));
    }
    if let Some(voice) = overlay.voice {
        // Deferred voice line: the strongest word of the turn's last tier.
        let words = praise_words(voice);
        praise_lines.push(Line::from(Span::styled(
            format!("♪ {}", words[words.len() - 1]),
            Style::default().fg(theme.inactive_fg),
        )));
    }
    if let Some(notice) = overlay.notice {
        praise_lines.push(Line::from(Span::styled(notice, Style::default().fg(theme.inactive_fg))));
    }
    Paragraph::new(Text::from(praise_lines))
        .alignment(Alignment::Center)
        .render(praise_inner, frame.buffer_mut());

    let hint = if overlay.selected.is_some() {
        "Pick a direction to swap, Esc to cancel"
    } else {
        "Space picks a candy · P pause · Q quit"
    };
    let footer = vec![
        Line::from(Span::styled(state.config().description.clone(), fg_style)),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(theme.inactive_fg))),
    ];
    Paragraph::new(Text::from(footer))
        .wrap(Wrap { trim: true })
        .render(chunks[5], frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P - Resume    Q - Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_banner(frame: &mut Frame, theme: &Theme, title: &str, accent: Color, body: Vec<String>) {
    let area = frame.area();
    let width = body
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count()))
        .max()
        .unwrap_or(0) as u16
        + 6;
    let popup = centered(area, width, body.len() as u16 + 5);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(title.to_string(), bold().fg(Color::Black).bg(accent))),
        Line::from(""),
    ];
    lines.extend(
        body.into_iter()
            .map(|l| Line::from(Span::styled(l, Style::default().fg(theme.main_fg)))),
    );
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let quit_rect = centered(frame.area(), 24, 8);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    Clear.render(quit_rect, frame.buffer_mut());
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];
    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            bold().fg(theme.bg).bg(theme.title)
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.y + inner.height {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}
