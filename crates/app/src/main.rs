use std::fmt;
use std::io::{self, BufRead, Write};

use quiz_core::model::{Question, QuestionCatalog, SessionId};
use quiz_core::time::format_duration;
use services::{Clock, NewSession, QuizServiceError, QuizServices, ServiceConfig, SessionService};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DB_URL_ENV: &str = "QUIZ_DB_URL";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- questions");
    eprintln!("  cargo run -p app -- take [--db <sqlite_url>] [--session-id <id>]");
    eprintln!("                           [--lock-completed]");
    eprintln!();
    eprintln!("Answers are read from stdin, one per line: y/n or the full token");
    eprintln!("(yes, no, true, false, agree, disagree). A blank line skips the question.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {DB_URL_ENV} (unset: in-memory), QUIZ_LOCK_COMPLETED, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Questions,
    Take,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "questions" => Some(Self::Questions),
            "take" => Some(Self::Take),
            _ => None,
        }
    }
}

struct Args {
    db_url: Option<String>,
    session_id: Option<String>,
    config: ServiceConfig,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var(DB_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(normalize_sqlite_url);
        let mut session_id = None;
        let mut config = ServiceConfig::from_env();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(normalize_sqlite_url(value));
                }
                "--session-id" => session_id = Some(require_value(args, "--session-id")?),
                "--lock-completed" => config = config.with_lock_completed_sessions(true),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            session_id,
            config,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
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

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("app=info,services=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn print_questions(catalog: &QuestionCatalog) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for question in catalog.list() {
        let (positive, negative) = question.kind().options();
        writeln!(
            out,
            "{:>2}. [{}] {} ({} / {})",
            question.id().value(),
            question.category_display(),
            question.text(),
            positive.label(),
            negative.label()
        )?;
    }
    Ok(())
}

/// Maps a typed line onto an answer token; `None` skips the question.
fn answer_token(question: &Question, line: &str) -> Option<String> {
    let (positive, negative) = question.kind().options();
    match line.trim().to_ascii_lowercase().as_str() {
        "" => None,
        "y" => Some(positive.as_str().to_string()),
        "n" => Some(negative.as_str().to_string()),
        other => Some(other.to_string()),
    }
}

async fn take_quiz(
    service: &SessionService,
    session_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let total = service.question_count();
    let request = match session_id {
        Some(raw) => NewSession::new(raw, total)?,
        None => NewSession::generated(total),
    };
    let session = service.start_session(request).await?;
    let session_id: SessionId = session.session_id().clone();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let questions = service.list_questions();

    'questions: for (index, question) in questions.iter().enumerate() {
        let (positive, negative) = question.kind().options();
        loop {
            eprint!(
                "[{}/{}] {} ({}/{}) > ",
                index + 1,
                questions.len(),
                question.text(),
                positive.as_str(),
                negative.as_str()
            );
            io::stderr().flush()?;

            let Some(line) = lines.next().transpose()? else {
                eprintln!();
                break 'questions;
            };
            let Some(token) = answer_token(question, &line) else {
                continue 'questions;
            };

            let submitted = service.submit_answer(&session_id, question.id(), &token);
            match submitted.await {
                Ok(_) => continue 'questions,
                Err(err @ QuizServiceError::InvalidAnswer { .. }) => eprintln!("{err}"),
                Err(err) => return Err(err.into()),
            }
        }
    }

    let report = service.complete_session(&session_id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    eprintln!(
        "Answered {}/{} ({}%). Time taken: {}",
        report.summary.answered_questions,
        report.summary.total_questions,
        report.summary.completion_rate,
        format_duration(report.summary.duration())
    );
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Take,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Take,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            print_usage();
            ArgsError::UnknownCommand(first.to_string())
        })?,
    };
    if argv.first().is_some_and(|first| !first.starts_with("--")) {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter())
        .inspect_err(|_| print_usage())?;
    let catalog = QuestionCatalog::seeded();

    if cmd == Command::Questions {
        print_questions(&catalog)?;
        return Ok(());
    }

    let clock = Clock::default();
    let services = match &parsed.db_url {
        Some(db_url) => {
            prepare_sqlite_file(db_url)?;
            QuizServices::new_sqlite(db_url, clock, catalog, parsed.config)
                .await?
        }
        None => QuizServices::in_memory(clock, catalog, parsed.config),
    };
    tracing::debug!(
        sqlite = parsed.db_url.is_some(),
        lock_completed = parsed.config.lock_completed_sessions,
        "quiz services ready"
    );

    take_quiz(&services.session_service(), parsed.session_id).await
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;

    #[test]
    fn shorthand_maps_to_question_options() {
        let catalog = QuestionCatalog::seeded();
        let true_false = catalog.get(QuestionId::new(1).unwrap()).unwrap();

        assert_eq!(answer_token(true_false, " Y ").as_deref(), Some("true"));
        assert_eq!(answer_token(true_false, "n").as_deref(), Some("false"));
        assert_eq!(answer_token(true_false, "   "), None);
        assert_eq!(answer_token(true_false, "Agree").as_deref(), Some("agree"));
    }

    #[test]
    fn args_accept_known_flags() {
        let mut argv = ["--session-id", "abc", "--lock-completed"]
            .into_iter()
            .map(String::from);
        let parsed = Args::parse(&mut argv).unwrap();
        assert_eq!(parsed.session_id.as_deref(), Some("abc"));
        assert!(parsed.config.lock_completed_sessions);
    }

    #[test]
    fn args_reject_missing_value_and_unknown_flags() {
        let mut argv = ["--session-id"].into_iter().map(String::from);
        assert!(matches!(
            Args::parse(&mut argv),
            Err(ArgsError::MissingValue {
                flag: "--session-id"
            })
        ));

        let mut argv = ["--bogus"].into_iter().map(String::from);
        let err = Args::parse(&mut argv).err();
        assert!(matches!(err, Some(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let memory = normalize_sqlite_url("sqlite::memory:".into());
        assert_eq!(memory, "sqlite::memory:");
        let url = normalize_sqlite_url("sqlite:quiz.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("quiz.db"));
    }
}
