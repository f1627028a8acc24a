//! Mood Diary CLI
//!
//! Command-line front end for the mood diary:
//! - Account: sign up, log in/out, profile, password, profile picture
//! - Mood calendar: month and year views, set/show moods, sync
//! - Statistics: monthly tag and color counts (table, json, csv)
//! - Diaries and the sticker shop

use anyhow::{bail, Context};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use mood_diary::account::{self, Account, SignupForm};
use mood_diary::calendar::{weekday_labels, CalendarState, MonthGrid, MonthKey};
use mood_diary::config::{generate_default_config, Config, LoggingConfig};
use mood_diary::context::{today, AppContext};
use mood_diary::diary::{DiaryDraft, DiaryService};
use mood_diary::mood::{self, LoadOutcome, MoodAttrs, StickerId};
use mood_diary::stickers::StickerShop;
use mood_diary::{Error, ErrorKind};

#[derive(Parser)]
#[command(name = "mood-diary")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Personal mood diary: mood calendar, diaries and stickers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: platform config dir, then ./config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account
    Signup {
        /// Login id
        user_id: String,
        /// Display name
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        password: String,
        /// Repeat the password
        #[arg(long)]
        confirm: String,
    },

    /// Log in and store the session locally
    Login {
        user_id: String,
        #[arg(short, long)]
        password: String,
    },

    /// Log out and clear the local session
    Logout,

    /// Show the logged-in profile
    Whoami,

    /// Change password
    Passwd {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },

    /// Upload a profile picture
    Avatar {
        /// Image file
        path: PathBuf,
    },

    /// Show a month of the mood calendar
    Calendar {
        /// Month to show (YYYY-MM, default: current month)
        #[arg(short, long)]
        month: Option<MonthKey>,
    },

    /// Show a year overview
    Year {
        /// Year (default: current year)
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Set or inspect daily moods
    Mood {
        #[command(subcommand)]
        command: MoodCommand,
    },

    /// Tag and color statistics per month
    Stats {
        /// Restrict to one month (YYYY-MM)
        #[arg(short, long)]
        month: Option<MonthKey>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Diary entries
    Diary {
        #[command(subcommand)]
        command: DiaryCommand,
    },

    /// Sticker shop
    Stickers {
        #[command(subcommand)]
        command: StickerCommand,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum MoodCommand {
    /// Set color, tag and/or sticker for a day
    Set {
        /// Day (YYYY-MM-DD)
        date: NaiveDate,
        /// Color as #RRGGBB or palette index 1-7
        #[arg(short, long)]
        color: Option<String>,
        #[arg(short, long)]
        tag: Option<String>,
        /// Owned sticker id
        #[arg(short, long)]
        sticker: Option<StickerId>,
    },
    /// Show the mood of a day
    Show { date: NaiveDate },
    /// Replace local moods with the server's
    Sync,
}

#[derive(Subcommand)]
pub enum DiaryCommand {
    /// List diaries, newest first
    List,
    /// Show one diary
    Show { id: String },
    /// Write a diary
    Add {
        /// Day (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        content: String,
        /// One-line review
        #[arg(short, long)]
        one: Option<String>,
    },
    /// Edit a diary; omitted fields keep their value
    Edit {
        id: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
        #[arg(short, long)]
        one: Option<String>,
    },
    /// Delete a diary
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum StickerCommand {
    /// Show the catalogue and owned stickers
    List,
    /// Buy a sticker
    Buy { sticker_id: StickerId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_deref());
    }

    let mut config = Config::load_default(cli.config.as_deref())?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    init_logging(&config.logging)?;

    tracing::debug!("Mood Diary v{}", env!("CARGO_PKG_VERSION"));

    let mut ctx = AppContext::open(config)?;
    let result = run(cli.command, &mut ctx).await;

    if let Err(err) = &result {
        if let Some(Error::SessionExpired) = err.downcast_ref::<Error>() {
            ctx.expire_session()?;
            bail!("Your session has expired; run `mood-diary login` again");
        }
        if let Some(e) = err.downcast_ref::<Error>() {
            if e.kind() == ErrorKind::AuthRequired {
                bail!("Not logged in; run `mood-diary login` first");
            }
        }
    }
    result
}

/// Initialize tracing from config; `RUST_LOG` takes precedence
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let json = logging.format == "json";
    let layer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path))?;
            let writer = std::sync::Mutex::new(file);
            if json {
                tracing_subscriber::fmt::layer().json().with_writer(writer).boxed()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed()
            }
        }
        None if json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        None => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();
    Ok(())
}

fn write_default_config(output: Option<&Path>) -> anyhow::Result<()> {
    let config = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, &config)
                .with_context(|| format!("writing config to {}", path.display()))?;
            println!("Config written to {:?}", path);
        }
        None => print!("{}", config),
    }
    Ok(())
}

async fn run(command: Commands, ctx: &mut AppContext) -> anyhow::Result<()> {
    match command {
        Commands::Signup {
            user_id,
            name,
            password,
            confirm,
        } => {
            let form = SignupForm {
                name,
                user_id,
                password,
                confirm_password: confirm,
            };
            let message = account::signup(ctx.client(), &form).await?;
            println!("{}", message.unwrap_or_else(|| "Account created".to_string()));
        }

        Commands::Login { user_id, password } => {
            let user = ctx.login(&user_id, &password).await?;
            match user {
                Some(user) => println!("Logged in as {} ({})", user.name, user.user_id),
                None => println!("Logged in as {}", user_id),
            }
            sync_moods(ctx).await?;
        }

        Commands::Logout => {
            ctx.logout().await?;
            println!("Logged out");
        }

        Commands::Whoami => {
            let user = Account::for_context(ctx)?.profile().await?;
            println!("{:<10} {}", "User id:", user.user_id);
            println!("{:<10} {}", "Name:", user.name);
            if let Some(coins) = user.coins {
                println!("{:<10} {}", "Coins:", coins);
            }
            if let Some(picture) = user.profile_picture {
                println!("{:<10} {}", "Picture:", picture);
            }
        }

        Commands::Passwd { current, new } => {
            let message = Account::for_context(ctx)?
                .change_password(&current, &new)
                .await?;
            println!("{}", message.unwrap_or_else(|| "Password changed".to_string()));
        }

        Commands::Avatar { path } => {
            let message = Account::for_context(ctx)?
                .upload_profile_picture(&path)
                .await?;
            println!("{}", message.unwrap_or_else(|| "Profile picture updated".to_string()));
        }

        Commands::Calendar { month } => {
            ctx.token()?;
            sync_moods(ctx).await?;

            let mut state = CalendarState::new(today(), ctx.config().calendar.week_start.weekday());
            if let Some(month) = month {
                state.show_month(month);
            }
            let grid = state.grid(&ctx.moods().snapshot());
            print_month(&grid, &ctx.config().calendar.palette);
        }

        Commands::Year { year } => {
            ctx.token()?;
            sync_moods(ctx).await?;

            let mut state = CalendarState::new(today(), ctx.config().calendar.week_start.weekday());
            if let Some(year) = year {
                let month = MonthKey::new(year, 1).context("year out of range")?;
                state.show_month(month);
            }
            print_year(ctx, &state);
        }

        Commands::Mood { command } => run_mood(command, ctx).await?,

        Commands::Stats { month, format } => {
            ctx.token()?;
            sync_moods(ctx).await?;
            print_stats(ctx, month, format)?;
        }

        Commands::Diary { command } => run_diary(command, ctx).await?,

        Commands::Stickers { command } => run_stickers(command, ctx).await?,

        Commands::Config { output } => write_default_config(output.as_deref())?,
    }

    Ok(())
}

/// Refresh moods from the server, falling back to the cached copy
/// Refresh moods before showing them; stale data is fine, a dead session is not
async fn sync_moods(ctx: &AppContext) -> Result<(), Error> {
    settle_sync(ctx.load_moods().await)
}

fn settle_sync(result: Result<LoadOutcome, Error>) -> Result<(), Error> {
    match result {
        Ok(LoadOutcome::Loaded(n)) => tracing::debug!(entries = n, "Moods synced"),
        Ok(LoadOutcome::Discarded) => {}
        Err(e) if e.needs_login() => return Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "Using cached moods");
            eprintln!("warning: could not refresh moods ({}); showing cached data", e);
        }
    }
    Ok(())
}

async fn run_mood(command: MoodCommand, ctx: &mut AppContext) -> anyhow::Result<()> {
    match command {
        MoodCommand::Set {
            date,
            color,
            tag,
            sticker,
        } => {
            let mut attrs = MoodAttrs::default();
            if let Some(color) = color {
                attrs = attrs.color(resolve_color(&color, &ctx.config().calendar.palette));
            }
            if let Some(tag) = tag {
                attrs = attrs.tag(tag);
            }
            if let Some(sticker_id) = sticker {
                let owned = StickerShop::for_context(ctx)?.cached_owned();
                if !owned.is_empty() && !owned.iter().any(|s| s.sticker_id == sticker_id) {
                    bail!("sticker {} is not owned", sticker_id);
                }
                attrs = attrs.sticker(sticker_id);
            }

            match ctx.set_mood(date, attrs).await {
                Ok(entry) => println!("{}", describe_entry(&entry)),
                Err(e) if e.kind() == ErrorKind::Transient => {
                    let entry = ctx.moods().get(date);
                    eprintln!("warning: saved locally but the server update failed: {}", e);
                    if let Some(entry) = entry {
                        println!("{}", describe_entry(&entry));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        MoodCommand::Show { date } => match ctx.moods().get(date) {
            Some(entry) => println!("{}", describe_entry(&entry)),
            None => println!("{}: no mood recorded", date),
        },

        MoodCommand::Sync => match ctx.load_moods().await? {
            LoadOutcome::Loaded(n) => println!("Synced {} mood entries", n),
            LoadOutcome::Discarded => println!("Sync discarded"),
        },
    }
    Ok(())
}

async fn run_diary(command: DiaryCommand, ctx: &mut AppContext) -> anyhow::Result<()> {
    let service = DiaryService::for_context(ctx)?;

    match command {
        DiaryCommand::List => {
            let diaries = service.list().await?;
            if diaries.is_empty() {
                println!("No diaries yet");
                return Ok(());
            }
            println!("{:<8} | {:<10} | {}", "Id", "Date", "Title");
            println!("{}", "-".repeat(48));
            for diary in diaries {
                println!("{:<8} | {:<10} | {}", diary.id, diary.date, diary.title);
            }
        }

        DiaryCommand::Show { id } => {
            let diary = service.get(&id).await?;
            println!("{}  {}", diary.date, diary.title);
            println!();
            println!("{}", diary.content);
            if let Some(one) = diary.one_line.filter(|o| !o.is_empty()) {
                println!();
                println!("> {}", one);
            }
        }

        DiaryCommand::Add {
            date,
            title,
            content,
            one,
        } => {
            let draft = DiaryDraft::new(date.unwrap_or_else(today), title, content)
                .one_line(one.unwrap_or_default());
            let diary = service.add(&draft).await?;
            println!("Diary {} written for {}", diary.id, diary.date);
        }

        DiaryCommand::Edit {
            id,
            date,
            title,
            content,
            one,
        } => {
            let mut draft = DiaryDraft::from_diary(&service.get(&id).await?);
            if let Some(date) = date {
                draft.date = date;
            }
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(content) = content {
                draft.content = content;
            }
            if let Some(one) = one {
                draft.one_line = one;
            }
            service.edit(&id, &draft).await?;
            println!("Diary {} updated", id);
        }

        DiaryCommand::Delete { id } => {
            service.delete(&id).await?;
            println!("Diary {} deleted", id);
        }
    }
    Ok(())
}

async fn run_stickers(command: StickerCommand, ctx: &mut AppContext) -> anyhow::Result<()> {
    let shop = StickerShop::for_context(ctx)?;
    let view = shop.load().await?;

    match command {
        StickerCommand::List => {
            println!("{:<6} | {:<16} | {:>6} | {}", "Id", "Name", "Price", "Owned");
            println!("{}", "-".repeat(42));
            for sticker in &view.stickers {
                let owned = if view.is_owned(sticker.sticker_id) { "yes" } else { "" };
                println!(
                    "{:<6} | {:<16} | {:>6} | {}",
                    sticker.sticker_id, sticker.name, sticker.price, owned
                );
            }
        }

        StickerCommand::Buy { sticker_id } => {
            let purchase = shop.purchase(&view, sticker_id).await?;
            match purchase.coins {
                Some(coins) => println!("Bought '{}' ({} coins left)", purchase.sticker.name, coins),
                None => println!("Bought '{}'", purchase.sticker.name),
            }
        }
    }
    Ok(())
}

/// Accept `#RRGGBB` or a 1-based palette index
fn resolve_color(input: &str, palette: &[String]) -> String {
    input
        .parse::<usize>()
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| palette.get(i).cloned())
        .unwrap_or_else(|| input.to_string())
}

fn describe_entry(entry: &mood::MoodEntry) -> String {
    let mut parts = vec![entry.date.to_string()];
    if let Some(color) = &entry.color {
        parts.push(format!("color {}", color));
    }
    if let Some(tag) = &entry.tag {
        parts.push(format!("tag '{}'", tag));
    }
    if let Some(sticker) = entry.sticker_id {
        parts.push(format!("sticker #{}", sticker));
    }
    parts.join("  ")
}

/// Palette digit for a color, `*` for off-palette colors
fn color_mark(color: Option<&str>, palette: &[String]) -> char {
    match color {
        None => ' ',
        Some(c) => palette
            .iter()
            .position(|p| p.eq_ignore_ascii_case(c))
            .and_then(|i| char::from_digit(i as u32 + 1, 10))
            .unwrap_or('*'),
    }
}

fn print_month(grid: &MonthGrid, palette: &[String]) {
    let first = grid.month.first_day();
    println!("{:^34}", first.format("%B %Y").to_string());
    println!(
        "{}",
        weekday_labels(grid.week_start)
            .iter()
            .map(|l| format!("{:<4}", l))
            .collect::<String>()
            .trim_end()
    );

    for week in &grid.weeks {
        let line: String = week
            .iter()
            .map(|cell| {
                if !cell.in_current_month {
                    return "  . ".to_string();
                }
                let mark = if cell.is_today {
                    '<'
                } else {
                    color_mark(cell.mood_color.as_deref(), palette)
                };
                let sticker = if cell.mood_sticker.is_some() { 's' } else { ' ' };
                format!("{:>2}{}{}", cell.date.day(), mark, sticker)
            })
            .collect();
        println!("{}", line.trim_end());
    }

    println!();
    let legend: Vec<String> = palette
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}={}", i + 1, c))
        .collect();
    println!("{}", legend.join(" "));
}

fn print_year(ctx: &AppContext, state: &CalendarState) {
    let moods = ctx.moods().snapshot();
    println!("{}", state.current_year());
    println!("{}", "-".repeat(30));
    for month in state.year_months() {
        let entries: Vec<_> = mood::entries_in_month(&moods, month).collect();
        let tagged = entries.iter().filter(|e| e.tag.is_some()).count();
        println!(
            "{:<10} {:>3} days  {:>3} tagged",
            month.first_day().format("%B").to_string(),
            entries.len(),
            tagged
        );
    }
}

fn print_stats(ctx: &AppContext, month: Option<MonthKey>, format: OutputFormat) -> anyhow::Result<()> {
    let moods = match month {
        Some(month) => ctx.moods().month(month),
        None => ctx.moods().snapshot(),
    };
    let tags = mood::tag_counts(moods.values());
    let rows = mood::tag_rows(&tags);

    match format {
        OutputFormat::Json => {
            let chart = mood::color_chart(&mood::color_counts(moods.values()));
            let out = serde_json::json!({ "tags": rows, "colors": chart });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer.write_record(["period", "tag", "count", "heat"])?;
            for row in &rows {
                writer.write_record([
                    row.period.to_string(),
                    row.tag.clone(),
                    row.count.to_string(),
                    format!("{:?}", mood::HeatLevel::for_count(row.count)).to_lowercase(),
                ])?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No tagged moods for the selected period");
            } else {
                println!("{:<8} | {:<16} | {:>5} | {}", "Month", "Tag", "Count", "Heat");
                println!("{}", "-".repeat(44));
                for row in &rows {
                    println!(
                        "{:<8} | {:<16} | {:>5} | {:?}",
                        row.period,
                        row.tag,
                        row.count,
                        mood::HeatLevel::for_count(row.count)
                    );
                }
            }

            let chart = mood::color_chart(&mood::color_counts(moods.values()));
            if !chart.series.is_empty() {
                println!();
                print!("{:<8}", "Color");
                for month in &chart.months {
                    print!(" | {:>7}", month);
                }
                println!();
                for series in &chart.series {
                    print!("{:<8}", series.color);
                    for count in &series.counts {
                        print!(" | {:>7}", count);
                    }
                    println!();
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Vec<String> {
        mood::DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_sync_failure_only_stops_on_dead_session() {
        assert!(settle_sync(Ok(LoadOutcome::Loaded(3))).is_ok());
        assert!(settle_sync(Ok(LoadOutcome::Discarded)).is_ok());
        assert!(settle_sync(Err(Error::Client(mood_diary::ClientError::Unavailable))).is_ok());

        assert!(matches!(
            settle_sync(Err(Error::SessionExpired)),
            Err(Error::SessionExpired)
        ));
        assert!(matches!(
            settle_sync(Err(Error::AuthRequired)),
            Err(Error::AuthRequired)
        ));
    }

    #[test]
    fn test_resolve_color() {
        let palette = palette();
        assert_eq!(resolve_color("1", &palette), "#FFABAB");
        assert_eq!(resolve_color("7", &palette), palette[6]);
        assert_eq!(resolve_color("8", &palette), "8");
        assert_eq!(resolve_color("0", &palette), "0");
        assert_eq!(resolve_color("#123456", &palette), "#123456");
    }

    #[test]
    fn test_color_mark() {
        let palette = palette();
        assert_eq!(color_mark(None, &palette), ' ');
        assert_eq!(color_mark(Some("#ffabab"), &palette), '1');
        assert_eq!(color_mark(Some("#000000"), &palette), '*');
    }

    #[test]
    fn test_cli_parses_mood_set() {
        let cli = Cli::try_parse_from([
            "mood-diary", "mood", "set", "2024-03-10", "--color", "2", "--tag", "happy",
        ])
        .unwrap();
        match cli.command {
            Commands::Mood {
                command: MoodCommand::Set { date, color, tag, sticker },
            } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
                assert_eq!(color.as_deref(), Some("2"));
                assert_eq!(tag.as_deref(), Some("happy"));
                assert_eq!(sticker, None);
            }
            _ => panic!("expected mood set"),
        }
    }

    #[test]
    fn test_cli_parses_stats_month() {
        let cli =
            Cli::try_parse_from(["mood-diary", "stats", "--month", "2024-03", "--format", "csv"])
                .unwrap();
        match cli.command {
            Commands::Stats { month, format } => {
                assert_eq!(month, MonthKey::new(2024, 3));
                assert_eq!(format, OutputFormat::Csv);
            }
            _ => panic!("expected stats"),
        }
    }
}
