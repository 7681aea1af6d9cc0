//! Candy Trials: match-3 puzzle in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use candytrials::{Campaign, TileFactory};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Options derived from CLI that shape a play session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub campaign: Campaign,
    pub start_level: u32,
    pub seed: Option<u64>,
    /// Pause between cascade passes while a turn resolves.
    pub pass_delay: Duration,
    pub no_animation: bool,
    pub skip_menu: bool,
}

impl SessionConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let campaign = match &args.level_file {
            Some(path) => Campaign::load(path)
                .with_context(|| format!("loading levels from {}", path.display()))?,
            None => Campaign::builtin(),
        };
        // Fail before the terminal is taken over.
        campaign
            .get(args.level)
            .with_context(|| format!("starting level {}", args.level))?;
        Ok(Self {
            campaign,
            start_level: args.level,
            seed: args.seed,
            pass_delay: Duration::from_millis(args.pass_delay_ms),
            no_animation: args.no_animation,
            skip_menu: args.no_menu,
        })
    }

    pub fn factory(&self) -> TileFactory {
        self.seed
            .map_or_else(TileFactory::from_entropy, TileFactory::from_seed)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!(error = %e, "theme not loaded, using defaults");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    let config = SessionConfig::from_args(&args)?;
    info!(levels = config.campaign.len(), start = config.start_level, seed = ?config.seed, "session starting");
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// Route tracing output to a file; the terminal belongs to the UI.
fn init_logging(path: &Path) -> Result<()> {
    let log_file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

/// Match-3 candy puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "candytrials",
    version,
    about = "Match-3 candy puzzle in the terminal. Swap neighbours to line up three or more of a colour.",
    long_about = "Candy Trials is a match-3 puzzle played in the terminal.\n\n\
        Swap two neighbouring candies to line up three or more of the same colour. Lines of \
        four make striped candies, L and T shapes make wrapped candies, five in a row makes a \
        colour bomb. Reach the target score and break all the ice before your moves run out.\n\n\
        CONTROLS:\n  Arrows/hjkl  Move cursor    Space/Enter  Pick candy, then a direction swaps\n  \
        Esc          Cancel pick    P            Pause    Q  Quit menu\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Level to start on (1-based).
    #[arg(short, long, default_value = "1", value_name = "N")]
    pub level: u32,

    /// Level file with one `[level]` section per level. Uses the built-in trials if not set.
    #[arg(long, value_name = "FILE")]
    pub level_file: Option<PathBuf>,

    /// Seed for candy generation; the same seed replays the same boards.
    #[arg(short, long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable the fade-in of new candies.
    #[arg(long)]
    pub no_animation: bool,

    /// Delay in ms between cascade passes.
    #[arg(long, default_value = "350", value_name = "MS")]
    pub pass_delay_ms: u64,

    /// Skip main menu and start the level immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Where to write the log (filter with RUST_LOG).
    #[arg(long, default_value = "candytrials.log", value_name = "FILE")]
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        Args::parse_from(std::iter::once("candytrials").chain(extra.iter().copied()))
    }

    #[test]
    fn defaults_use_the_builtin_campaign() {
        let config = SessionConfig::from_args(&args(&[])).unwrap();
        assert_eq!(config.campaign, Campaign::builtin());
        assert_eq!(config.start_level, 1);
        assert_eq!(config.pass_delay, Duration::from_millis(350));
        assert!(!config.skip_menu);
    }

    #[test]
    fn unknown_start_level_fails_early() {
        assert!(SessionConfig::from_args(&args(&["--level", "7"])).is_err());
    }

    #[test]
    fn seeded_sessions_replay() {
        let config = SessionConfig::from_args(&args(&["--seed", "99", "--palette", "colourblind"])).unwrap();
        let (mut a, mut b) = (config.factory(), config.factory());
        for _ in 0..20 {
            assert_eq!(a.random_color(), b.random_color());
        }
        assert_eq!(args(&["--palette", "contrast"]).palette, Palette::HighContrast);
    }
}
