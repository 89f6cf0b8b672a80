use std::fmt;

use services::{AppServices, Clock, WorkSessionView};
use stitch_core::model::{
    Pattern, PatternEntry, PatternGroup, PatternId, Stitch, StitchId, UserId, WorkSessionId,
};
use tracing::debug;

mod render;

const DEFAULT_DB_URL: &str = "sqlite:crochet.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str, command: Command },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag, command } => {
                write!(f, "{command} requires {flag}")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app seed                          create a demo stitch library and pattern");
    eprintln!("  app start  --pattern <id>         start a work session");
    eprintln!("  app next   --session <id>         advance one stitch");
    eprintln!("  app prev   --session <id>         go back one stitch");
    eprintln!("  app pause  --session <id>");
    eprintln!("  app resume --session <id>");
    eprintln!("  app show   --session <id>         print progress");
    eprintln!("  app abandon --session <id>        delete the session");
    eprintln!("  app list                          unfinished sessions");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>   (default: sqlite:crochet.sqlite3)");
    eprintln!("  --user <id>         (default: 1)");
    eprintln!("  --json              print the progress report as JSON");
    eprintln!("  -v, -vv             debug / trace logging on stderr");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CROCHET_DB_URL, CROCHET_USER_ID");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Start,
    Next,
    Prev,
    Pause,
    Resume,
    Show,
    Abandon,
    List,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "start" => Some(Self::Start),
            "next" => Some(Self::Next),
            "prev" => Some(Self::Prev),
            "pause" => Some(Self::Pause),
            "resume" => Some(Self::Resume),
            "show" => Some(Self::Show),
            "abandon" => Some(Self::Abandon),
            "list" => Some(Self::List),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Seed => "seed",
            Self::Start => "start",
            Self::Next => "next",
            Self::Prev => "prev",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Show => "show",
            Self::Abandon => "abandon",
            Self::List => "list",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Args {
    command: Command,
    db_url: String,
    user: UserId,
    pattern: Option<PatternId>,
    session: Option<WorkSessionId>,
    json: bool,
    verbose: u8,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let command = match args.next() {
            None => return Ok(None),
            Some(first) if first == "--help" || first == "-h" => return Ok(None),
            Some(first) => {
                Command::from_arg(&first).ok_or(ArgsError::UnknownCommand(first))?
            }
        };

        let mut db_url = normalize_sqlite_url(
            std::env::var("CROCHET_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.to_owned()),
        );
        let mut user = std::env::var("CROCHET_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or(UserId::new(1));
        let mut pattern = None;
        let mut session = None;
        let mut json = false;
        let mut verbose: u8 = 0;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => user = parse_id("--user", require_value(&mut args, "--user")?)?,
                "--pattern" => {
                    pattern = Some(parse_id("--pattern", require_value(&mut args, "--pattern")?)?);
                }
                "--session" => {
                    session = Some(parse_id("--session", require_value(&mut args, "--session")?)?);
                }
                "--json" => json = true,
                "-v" | "--verbose" => verbose = verbose.saturating_add(1),
                "-vv" => verbose = verbose.saturating_add(2),
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Some(Self {
            command,
            db_url,
            user,
            pattern,
            session,
            json,
            verbose,
        }))
    }

    fn session(&self) -> Result<WorkSessionId, ArgsError> {
        self.session.ok_or(ArgsError::MissingFlag {
            flag: "--session",
            command: self.command,
        })
    }

    fn pattern(&self) -> Result<PatternId, ArgsError> {
        self.pattern.ok_or(ArgsError::MissingFlag {
            flag: "--pattern",
            command: self.command,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace,sqlx=debug",
    }
}

fn init_tracing(verbose: u8) {
    // stdout carries reports and `--json` output, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(log_level(verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .init();
}

const DEMO_PATTERN_ID: PatternId = PatternId::new(1);

fn demo_library() -> Result<Vec<Stitch>, stitch_core::Error> {
    Ok(vec![
        Stitch::new(StitchId::new(1), "ch", "chain")?,
        Stitch::new(StitchId::new(2), "sc", "single crochet")?,
        Stitch::new(StitchId::new(3), "dc", "double crochet")?,
        Stitch::new(StitchId::new(4), "sl st", "slip stitch")?,
    ])
}

fn demo_pattern(owner: UserId) -> Result<Pattern, stitch_core::Error> {
    let ch = StitchId::new(1);
    let sc = StitchId::new(2);
    let dc = StitchId::new(3);
    let sl = StitchId::new(4);
    let groups = vec![
        PatternGroup::new(Some("Foundation".into()), 1, vec![PatternEntry::new(ch, 4, 1)?])?,
        PatternGroup::new(
            Some("Round 1".into()),
            4,
            vec![PatternEntry::new(dc, 3, 1)?, PatternEntry::new(ch, 2, 1)?],
        )?,
        PatternGroup::new(
            Some("Edge".into()),
            2,
            vec![PatternEntry::new(sc, 1, 6)?, PatternEntry::new(sl, 1, 1)?],
        )?,
    ];
    Ok(Pattern::new(DEMO_PATTERN_ID, owner, "Granny Coaster", groups)?)
}

fn print_view(view: &WorkSessionView, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(&view.progress)?);
    } else {
        print!("{}", render::report(view));
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    debug!(command = %args.command, db = %args.db_url, user = %args.user, "parsed arguments");

    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(&args.db_url, Clock::system()).await?;
    let sessions = app.work_sessions();

    match args.command {
        Command::Seed => {
            for stitch in demo_library()? {
                app.storage().stitches.upsert_stitch(&stitch).await?;
            }
            let pattern = demo_pattern(args.user)?;
            app.storage().patterns.upsert_pattern(&pattern).await?;
            println!(
                "seeded pattern {} \"{}\" ({} stitches) for user {}",
                pattern.id(),
                pattern.name(),
                pattern.total_stitches(),
                args.user
            );
        }
        Command::Start => {
            let view = sessions.start(args.user, args.pattern()?).await?;
            print_view(&view, args.json)?;
        }
        Command::Next => print_view(&sessions.advance(args.user, args.session()?).await?, args.json)?,
        Command::Prev => print_view(&sessions.retreat(args.user, args.session()?).await?, args.json)?,
        Command::Pause => print_view(&sessions.pause(args.user, args.session()?).await?, args.json)?,
        Command::Resume => {
            print_view(&sessions.resume(args.user, args.session()?).await?, args.json)?;
        }
        Command::Show => {
            print_view(&sessions.progress(args.user, args.session()?).await?, args.json)?;
        }
        Command::Abandon => {
            let id = args.session()?;
            sessions.abandon(args.user, id).await?;
            println!("session {id} abandoned");
        }
        Command::List => print!("{}", render::active_list(&sessions.list_active(args.user).await?)),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return;
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            std::process::exit(2);
        }
    };

    init_tracing(args.verbose);
    if let Err(err) = run(args).await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
