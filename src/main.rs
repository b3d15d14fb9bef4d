use archive_service::{ArchiveService, ArchiveSummary};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use history_core::{
    AppConfig, ConfigError, CoreError, ErrorExt, ErrorReporter, FileConfig, LogConfig,
};
use reddit_client::{
    Authenticator, AuthorizedListingSource, PasswordGrant, RateLimitConfig, RedditApiClient,
};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Long flags that older invocations spell with a single dash (`-username`).
const LEGACY_FLAGS: &[&str] = &[
    "loglevel",
    "username",
    "password",
    "client_id",
    "client_secret",
    "user",
    "sort",
];

/// Archive a Reddit user's saved items, comments, submissions and overview
/// listing into markdown files.
#[derive(Parser, Debug)]
#[command(name = "reddit-history", version)]
struct Cli {
    /// Sets the log level [TRACE, DEBUG, INFO, WARN, ERROR, ALL, OFF] (default INFO)
    #[arg(long)]
    loglevel: Option<String>,

    /// Your username
    #[arg(long, env = "REDDIT_USERNAME", allow_hyphen_values = true)]
    username: Option<String>,

    /// Your password
    #[arg(
        long,
        env = "REDDIT_PASSWORD",
        hide_env_values = true,
        allow_hyphen_values = true
    )]
    password: Option<String>,

    /// Your client id
    #[arg(
        long = "client_id",
        visible_alias = "client-id",
        env = "REDDIT_CLIENT_ID",
        allow_hyphen_values = true
    )]
    client_id: Option<String>,

    /// Your client secret
    #[arg(
        long = "client_secret",
        visible_alias = "client-secret",
        env = "REDDIT_CLIENT_SECRET",
        hide_env_values = true,
        allow_hyphen_values = true
    )]
    client_secret: Option<String>,

    /// The user you want to query
    #[arg(long, allow_hyphen_values = true)]
    user: Option<String>,

    /// The sort order [hot, new, top, controversial] (default top)
    #[arg(long)]
    sort: Option<String>,

    /// TOML file with any of these settings; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the markdown files are appended to (default reddit_history)
    #[arg(long = "output_dir", visible_alias = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Most pages fetched per category before giving up (default 1000)
    #[arg(long = "max_pages", visible_alias = "max-pages")]
    max_pages: Option<u32>,

    /// Wall-clock budget per category, in seconds
    #[arg(long = "max_duration_secs", visible_alias = "max-duration-secs")]
    max_duration_secs: Option<u64>,

    /// Pause between API requests in milliseconds (default 1050)
    #[arg(long = "request_delay_ms", visible_alias = "request-delay-ms")]
    request_delay_ms: Option<u64>,

    /// User-Agent sent with every request (default "reddit-history/0.1 by <username>")
    #[arg(long = "user_agent", visible_alias = "user-agent")]
    user_agent: Option<String>,
}

impl Cli {
    fn into_overrides(self) -> FileConfig {
        FileConfig {
            loglevel: self.loglevel,
            username: self.username,
            password: self.password,
            client_id: self.client_id,
            client_secret: self.client_secret,
            user: self.user,
            sort: self.sort,
            output_dir: self.output_dir,
            page_size: None,
            max_pages: self.max_pages,
            max_duration_secs: self.max_duration_secs,
            request_delay_ms: self.request_delay_ms,
            user_agent: self.user_agent,
            token_url: None,
            api_base: None,
        }
    }
}

/// Rewrites `-username foo` style flags to `--username foo`.
///
/// The token after a value-taking flag is left alone, so a secret such as
/// `-user` is passed through as a value.
fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut value_pending = false;
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 || std::mem::take(&mut value_pending) {
                return arg;
            }
            let Some(s) = arg.to_str() else {
                return arg;
            };
            let Some(flag) = s.strip_prefix('-') else {
                return arg;
            };
            let (name, inline_value) = match flag.split_once('=') {
                Some((name, _)) => (name, true),
                None => (flag, false),
            };
            let name = name.trim_start_matches('-');
            if LEGACY_FLAGS.contains(&name) || (flag.starts_with('-') && !is_switch(name)) {
                value_pending = !inline_value;
            }
            if !flag.starts_with('-') && LEGACY_FLAGS.contains(&name) {
                OsString::from(format!("-{}", s))
            } else {
                arg
            }
        })
        .collect()
}

fn is_switch(name: &str) -> bool {
    matches!(name, "" | "help" | "version")
}

fn load_config(cli: Cli) -> Result<AppConfig, ConfigError> {
    let base = match cli.config.as_deref() {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    AppConfig::resolve(base.merge(cli.into_overrides()))
}

fn print_usage() {
    eprintln!("{}", Cli::command().render_help());
}

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::builder()
        .with_default_directive(log.level.into())
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(config: AppConfig) -> Result<ArchiveSummary, CoreError> {
    tracing::info!(
        "Archiving u/{} (sort: {}) into {}",
        config.user,
        config.sort,
        config.output_dir.display()
    );

    let authenticator = Authenticator::new(config.token_url.clone(), &config.user_agent)?;
    let access_token = authenticator
        .authenticate(&PasswordGrant::from(&config.credentials))
        .await?;

    let client = RedditApiClient::new(
        config.user_agent.clone(),
        config.api_base.clone(),
        RateLimitConfig::with_delay(config.request_delay),
    )?;
    let service = ArchiveService::from_config(
        AuthorizedListingSource::new(client, access_token),
        &config,
    );

    let summary = service.run().await?;

    let status = service.source().client().get_rate_limit_status().await;
    tracing::debug!(
        "Made {} API requests; last rate limit headers: {:?}",
        status.requests_made,
        status.last_headers
    );
    Ok(summary)
}

/// Turns a command-line parse result into the options to run with, or the
/// exit status to stop with. Bad command lines print usage and exit 0.
fn cli_outcome(parsed: Result<Cli, clap::Error>) -> Result<Cli, ExitCode> {
    match parsed {
        Ok(cli) => Ok(cli),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            Err(ExitCode::SUCCESS)
        }
        Err(e) => {
            let _ = e.print();
            print_usage();
            Err(ExitCode::SUCCESS)
        }
    }
}

/// Missing or invalid settings print usage and exit 0; an unreadable or
/// malformed config file exits 1.
fn config_outcome(loaded: Result<AppConfig, ConfigError>) -> Result<AppConfig, ExitCode> {
    match loaded {
        Ok(config) => Ok(config),
        Err(e @ (ConfigError::MissingField { .. } | ConfigError::InvalidValue { .. })) => {
            eprintln!("{}", e);
            print_usage();
            Err(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e.user_friendly_message());
            eprintln!("{}", e);
            Err(ExitCode::FAILURE)
        }
    }
}

fn run_outcome(result: Result<ArchiveSummary, CoreError>) -> ExitCode {
    match result {
        Ok(summary) => {
            summary.log();
            if summary.any_truncated() {
                tracing::warn!("Some listings were cut short by --max_pages or --max_duration_secs");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            eprintln!("{}", e.user_friendly_message());
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let parsed = Cli::try_parse_from(normalize_legacy_flags(std::env::args_os()));
    let cli = match cli_outcome(parsed) {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    let config = match config_outcome(load_config(cli)) {
        Ok(config) => config,
        Err(code) => return code,
    };

    init_logging(&config.log);

    run_outcome(run(config).await)
}
