use std::fmt;

use course_core::model::{CourseId, UserId, UserProfile};
use services::{ApiConfig, AppServices, ConfigError, PlayerConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod play;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidApiUrl(ConfigError),
    Environment(ConfigError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidApiUrl(err) => write!(f, "invalid --api value: {err}"),
            ArgsError::Environment(err) => write!(f, "invalid environment: {err}"),
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
    eprintln!("  app play   --course <id> [--api <url>] [--db <sqlite_url>]");
    eprintln!("  app login  --token <token> --user-id <id> --name <name> [--db <sqlite_url>]");
    eprintln!("  app logout [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --api {}", services::config::DEFAULT_API_URL);
    eprintln!("  --db  {DEFAULT_DB_URL}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_API_URL, COURSE_API_TIMEOUT_SECS, COURSE_DB_URL,");
    eprintln!("  COURSE_ENFORCE_MAX_RETAKES, RUST_LOG");
}

const DEFAULT_DB_URL: &str = "sqlite://course_player.sqlite3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Login,
    Logout,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "login" => Some(Self::Login),
            "logout" => Some(Self::Logout),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    db_url: String,
    api: ApiConfig,
    course: Option<CourseId>,
    token: Option<String>,
    user_id: Option<String>,
    name: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("COURSE_DB_URL")
                .ok()
                .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url),
            ..Self::default()
        };
        let from_env = ApiConfig::from_env();
        let mut api_flag = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--api" => {
                    let value = require_value(args, "--api")?;
                    api_flag = Some(ApiConfig::parse(&value).map_err(ArgsError::InvalidApiUrl)?);
                }
                "--course" => {
                    let value = require_value(args, "--course")?;
                    let id = value
                        .parse::<CourseId>()
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value.clone() })?;
                    parsed.course = Some(id);
                }
                "--token" => parsed.token = Some(require_value(args, "--token")?),
                "--user-id" => parsed.user_id = Some(require_value(args, "--user-id")?),
                "--name" => parsed.name = Some(require_value(args, "--name")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        // The flag wins over COURSE_API_URL, even an invalid one.
        parsed.api = match (api_flag, from_env) {
            (Some(flag), Ok(env)) => flag.with_timeout(env.timeout),
            (Some(flag), Err(_)) => flag,
            (None, env) => env.map_err(ArgsError::Environment)?,
        };
        Ok(parsed)
    }

    fn validate(&self, cmd: Command) -> Result<(), ArgsError> {
        match cmd {
            Command::Play if self.course.is_none() => Err(ArgsError::MissingFlag { flag: "--course" }),
            Command::Login if self.token.is_none() => Err(ArgsError::MissingFlag { flag: "--token" }),
            Command::Login if self.user_id.is_none() => {
                Err(ArgsError::MissingFlag { flag: "--user-id" })
            }
            Command::Login if self.name.is_none() => Err(ArgsError::MissingFlag { flag: "--name" }),
            _ => Ok(()),
        }
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

fn prepare_sqlite_dir(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
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

    // The store creates the file itself, but not missing directories.
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("app=info,services=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next().as_deref() {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv)
        .and_then(|args| args.validate(cmd).map(|()| args))
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;

    prepare_sqlite_dir(&parsed.db_url)?;
    let services =
        AppServices::new_sqlite(&parsed.db_url, &parsed.api, PlayerConfig::from_env()).await?;

    match cmd {
        Command::Play => {
            let Some(course) = parsed.course else {
                return Err(ArgsError::MissingFlag { flag: "--course" }.into());
            };
            info!(course = %course, api = %parsed.api.base_url, "starting player");
            let mut player = services.player(course);
            play::run(&mut player).await?;
        }
        Command::Login => {
            let user = UserProfile {
                id: UserId::new(parsed.user_id.unwrap_or_default()),
                name: parsed.name.unwrap_or_default(),
                email: None,
                role: None,
            };
            let session = services
                .sign_in(parsed.token.as_deref().unwrap_or_default(), user)
                .await?;
            info!(user = %session.user.id, "signed in");
            println!("Signed in as {}.", session.user.name);
        }
        Command::Logout => {
            services.sign_out().await?;
            println!("Signed out.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn play_requires_a_course() {
        let args = parse(&["--db", "sqlite::memory:"]).unwrap();
        assert!(matches!(
            args.validate(Command::Play),
            Err(ArgsError::MissingFlag { flag: "--course" })
        ));
        let args = parse(&["--course", "rust-101", "--db", "sqlite::memory:"]).unwrap();
        assert_eq!(args.course, Some(CourseId::new("rust-101")));
        assert!(args.validate(Command::Play).is_ok());
    }

    #[test]
    fn api_flag_must_be_http() {
        for bad in ["ftp://example.com", "courses.example.com:443"] {
            assert!(matches!(
                parse(&["--api", bad]),
                Err(ArgsError::InvalidApiUrl(_))
            ));
        }
        let args = parse(&["--api", "https://courses.example.com/api/"]).unwrap();
        assert_eq!(args.api.base_url.as_str(), "https://courses.example.com/api");
    }

    #[test]
    fn missing_flag_value_is_reported() {
        assert!(matches!(
            parse(&["--token"]),
            Err(ArgsError::MissingValue { flag: "--token" })
        ));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/player.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/player.db"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }
}
