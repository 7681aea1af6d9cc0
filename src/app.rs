//! App: terminal init, main loop, cascade pacing and key handling.

use crate::SessionConfig;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use candytrials::{Coord, GameState, PraiseTier, Rejection, Status, Step, SwapOutcome};
use crossterm::event::{self, Event, KeyEventKind};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, info};

/// How long a praise word stays on screen.
const PRAISE_VISIBLE_MS: u64 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    LevelComplete,
    GameOver,
    Ending,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

impl QuitOption {
    fn next(self) -> Self {
        match self {
            Self::Resume => Self::MainMenu,
            Self::MainMenu => Self::Exit,
            Self::Exit => Self::Resume,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Resume => Self::Exit,
            Self::MainMenu => Self::Resume,
            Self::Exit => Self::MainMenu,
        }
    }
}

/// Words shown for each praise tier.
pub fn praise_words(tier: PraiseTier) -> &'static [&'static str] {
    const ALL: [&str; 4] = ["Tasty!", "Sweet!", "Delicious!", "Divine!"];
    match tier {
        PraiseTier::Low => &ALL[..2],
        PraiseTier::Mid => &ALL[2..],
        PraiseTier::High => &ALL,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PraiseBanner {
    pub word: &'static str,
    pub tier: PraiseTier,
    pub shown_at: Instant,
}

/// Everything the UI draws besides the game state itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub cursor: Coord,
    /// Candy picked for a swap, waiting for a direction.
    pub selected: Option<Coord>,
    pub paused: bool,
    pub quit_selected: QuitOption,
    /// Level highlighted on the menu.
    pub menu_level: u32,
    pub praise: Option<PraiseBanner>,
    /// Last voice line of a settled turn; stays up until the next swap.
    pub voice: Option<PraiseTier>,
    /// Short feedback on the last swap attempt.
    pub notice: Option<&'static str>,
}

pub struct App {
    config: SessionConfig,
    theme: Theme,
    state: GameState,
    screen: Screen,
    overlay: Overlay,
    last_pass: Instant,
    /// Words are cosmetic, so they get their own stream and leave the board's untouched.
    praise_rng: SmallRng,
    /// Fade-in of candies dropped by the latest pass.
    fade_effect: Option<Effect>,
    fade_process_time: Option<Instant>,
    fresh_cells: Vec<Coord>,
}

impl App {
    pub fn new(config: SessionConfig, theme: Theme) -> Result<Self> {
        let state = GameState::new(config.campaign.clone(), config.start_level, config.factory())?;
        let screen = if config.skip_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let praise_rng = config
            .seed
            .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
        Ok(Self {
            overlay: Overlay {
                cursor: Coord::default(),
                selected: None,
                paused: false,
                quit_selected: QuitOption::Resume,
                menu_level: config.start_level,
                praise: None,
                voice: None,
                notice: None,
            },
            config,
            theme,
            state,
            screen,
            last_pass: Instant::now(),
            praise_rng,
            fade_effect: None,
            fade_process_time: None,
            fresh_cells: Vec::new(),
        })
    }

    fn reset_view(&mut self) {
        self.overlay.cursor = Coord::default();
        self.overlay.selected = None;
        self.overlay.paused = false;
        self.overlay.praise = None;
        self.overlay.voice = None;
        self.overlay.notice = None;
        self.fade_effect = None;
        self.fade_process_time = None;
        self.fresh_cells.clear();
    }

    fn start_level(&mut self, level: u32) -> Result<()> {
        self.state.start_level(level)?;
        self.reset_view();
        self.screen = Screen::Playing;
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_millis(16);
        loop {
            let now = Instant::now();
            if self
                .overlay
                .praise
                .is_some_and(|p| now.duration_since(p.shown_at) >= Duration::from_millis(PRAISE_VISIBLE_MS))
            {
                self.overlay.praise = None;
            }

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    &self.overlay,
                    &self.fresh_cells,
                    &mut self.fade_effect,
                    &mut self.fade_process_time,
                    now,
                    self.config.no_animation,
                );
            })?;

            if self.fade_effect.as_ref().is_some_and(Effect::done) {
                self.fade_effect = None;
                self.fade_process_time = None;
                self.fresh_cells.clear();
            }

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    if key.kind == KeyEventKind::Press && !self.handle_action(key_to_action(key))? {
                        return Ok(());
                    }
                }
            }

            if self.screen == Screen::Playing
                && !self.overlay.paused
                && self.state.is_busy()
                && self.last_pass.elapsed() >= self.config.pass_delay
            {
                self.last_pass = Instant::now();
                self.advance_cascade();
            }
        }
    }

    /// Returns `false` when the app should exit.
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        match self.screen {
            Screen::Menu => match action {
                Action::Quit => return Ok(false),
                Action::Left | Action::Up => {
                    self.overlay.menu_level = self.overlay.menu_level.saturating_sub(1).max(1);
                }
                Action::Right | Action::Down => {
                    self.overlay.menu_level =
                        (self.overlay.menu_level + 1).min(self.state.campaign().len());
                }
                Action::Select => self.start_level(self.overlay.menu_level)?,
                _ => {}
            },
            Screen::Playing => self.handle_play_action(action),
            Screen::QuitMenu => match action {
                Action::Down | Action::Right => {
                    self.overlay.quit_selected = self.overlay.quit_selected.next();
                }
                Action::Up | Action::Left => {
                    self.overlay.quit_selected = self.overlay.quit_selected.prev();
                }
                Action::Select => match self.overlay.quit_selected {
                    QuitOption::Resume => self.screen = Screen::Playing,
                    QuitOption::MainMenu => {
                        self.overlay.menu_level = self.state.level();
                        self.screen = Screen::Menu;
                    }
                    QuitOption::Exit => return Ok(false),
                },
                Action::Pause | Action::Quit | Action::Cancel => self.screen = Screen::Playing,
                _ => {}
            },
            Screen::LevelComplete => match action {
                Action::Select => {
                    if self.state.advance_level()? {
                        self.reset_view();
                        self.screen = Screen::Playing;
                    }
                }
                Action::Quit => self.screen = Screen::Menu,
                _ => {}
            },
            Screen::GameOver => match action {
                Action::Restart | Action::Select => {
                    self.state.restart_level()?;
                    self.reset_view();
                    self.screen = Screen::Playing;
                }
                Action::Quit => self.screen = Screen::Menu,
                _ => {}
            },
            Screen::Ending => match action {
                Action::Select => {
                    self.overlay.menu_level = 1;
                    self.screen = Screen::Menu;
                }
                Action::Quit => return Ok(false),
                _ => {}
            },
        }
        Ok(true)
    }

    fn handle_play_action(&mut self, action: Action) {
        if self.overlay.paused {
            match action {
                Action::Pause => self.overlay.paused = false,
                Action::Quit => self.open_quit_menu(),
                _ => {}
            }
            return;
        }
        match action {
            Action::Pause => self.overlay.paused = true,
            Action::Quit => self.open_quit_menu(),
            Action::Cancel => self.overlay.selected = None,
            // Input is gated while a turn resolves.
            _ if self.state.is_busy() => {}
            Action::Select => {
                let cursor = self.overlay.cursor;
                self.overlay.selected = (self.overlay.selected != Some(cursor)).then_some(cursor);
            }
            _ => {
                let Some((d_row, d_col)) = action.direction() else {
                    return;
                };
                match self.overlay.selected.take() {
                    Some(from) => {
                        if let Some(to) = from.offset(d_row, d_col) {
                            self.try_swap(from, to);
                        }
                    }
                    None => self.move_cursor(d_row, d_col),
                }
            }
        }
    }

    fn open_quit_menu(&mut self) {
        self.screen = Screen::QuitMenu;
        self.overlay.quit_selected = QuitOption::Resume;
    }

    fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        if let Some(next) = self.overlay.cursor.offset(d_row, d_col) {
            if self.state.grid().contains(next) {
                self.overlay.cursor = next;
            }
        }
    }

    fn try_swap(&mut self, from: Coord, to: Coord) {
        let outcome = self.state.attempt_swap(from, to);
        debug!(?from, ?to, ?outcome, "swap attempted");
        self.overlay.notice = match outcome {
            SwapOutcome::Rejected(Rejection::Blocked) => Some("That candy is stuck"),
            SwapOutcome::Rejected(Rejection::OutOfBounds) => Some("Nothing to swap with"),
            SwapOutcome::Rejected(_) => None,
            SwapOutcome::Reverted => Some("No match"),
            SwapOutcome::Committed | SwapOutcome::Detonated { .. } => {
                self.overlay.cursor = to;
                self.overlay.voice = None;
                // First pass runs on the next frame.
                self.last_pass = Instant::now().checked_sub(self.config.pass_delay).unwrap_or_else(Instant::now);
                None
            }
        };
    }

    fn advance_cascade(&mut self) {
        match self.state.step() {
            Step::Idle => {}
            Step::Pass(report) => {
                if let Some(praise) = report.praise {
                    let words = praise_words(praise.tier);
                    self.overlay.praise = Some(PraiseBanner {
                        word: words[self.praise_rng.random_range(0..words.len())],
                        tier: praise.tier,
                        shown_at: Instant::now(),
                    });
                }
                self.fresh_cells = self
                    .state
                    .grid()
                    .tiles()
                    .filter(|t| t.is_new)
                    .map(|t| t.position)
                    .collect();
                self.fade_effect = None;
                self.fade_process_time = None;
            }
            Step::Settled(report) => {
                if report.voice.is_some() {
                    self.overlay.voice = report.voice;
                }
                self.screen = match report.status {
                    Status::Playing => Screen::Playing,
                    Status::Cinematic => Screen::LevelComplete,
                    Status::GameOver => Screen::GameOver,
                    Status::Ending => Screen::Ending,
                };
                if report.status != Status::Playing {
                    info!(level = self.state.level(), status = ?report.status, score = report.score, "turn ended the level");
                }
            }
        }
    }
}
