//! AIOCENSOR CLI - a command-line client for the AIOCENSOR console API.
//!
//! Signs in with the console password, keeps the session between runs and
//! makes protected calls with automatic token renewal.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use tokio::sync::broadcast::Receiver;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aiocensor_core::api::Method;
use aiocensor_core::auth::AccessClaims;
use aiocensor_core::{
    ApiClient, AuthApi, AuthedClient, Config, Location, NavigationGuard, RouteTable,
    SessionError, SessionEvent, SessionManager, TokenStore,
};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable read instead of prompting for the password
const PASSWORD_ENV: &str = "AIOCENSOR_PASSWORD";

/// Log file written next to the stored session
const LOG_FILE: &str = "aiocensor.log";

const USAGE: &str = "\
Usage: aiocensor <command>

Commands:
  login                          Sign in with the console password
  logout                         Forget the stored session
  status                         Show the session state
  get <path>                     GET a protected endpoint, e.g. /api/blacklist
  navigate <path> [--from <path>]  Run the navigation guard for a route";

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

/// Everything a command needs, built once from the config.
struct Context {
    manager: Arc<SessionManager>,
    client: AuthedClient,
}

impl Context {
    fn new(config: &Config) -> Result<Self> {
        let api = ApiClient::from_config(config)?;
        let store = TokenStore::from_boxed(config.session_slot()?);
        let authenticator: Arc<dyn AuthApi> = Arc::new(api.clone());
        let manager = Arc::new(
            SessionManager::new(authenticator, store).with_refresh_skew(config.refresh_skew()),
        );
        let client = AuthedClient::new(api, manager.clone());
        Ok(Self { manager, client })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let log_dir = config.cache_dir().ok();
    if let Some(ref dir) = log_dir {
        std::fs::create_dir_all(dir).context("Failed to create cache directory")?;
    }
    let _log_guard = init_tracing(log_dir.as_deref());
    info!(base_url = %config.base_url, "AIOCENSOR CLI starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        return Ok(());
    };

    let ctx = Context::new(&config)?;
    match command.as_str() {
        "login" => login(&ctx).await,
        "logout" => {
            ctx.manager.logout();
            println!("Logged out");
            Ok(())
        }
        "status" => status(&ctx),
        "get" => {
            let path = args.get(1).context("get needs a path")?;
            get(&ctx, path).await
        }
        "navigate" => {
            let to = args.get(1).context("navigate needs a path")?;
            let from = match (args.get(2).map(String::as_str), args.get(3)) {
                (Some("--from"), Some(from)) => Some(Location::parse(from)),
                (None, _) => None,
                _ => bail!("{USAGE}"),
            };
            navigate(&ctx, to, from.as_ref())
        }
        "-h" | "--help" | "help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => bail!("Unknown command: {other}\n\n{USAGE}"),
    }
}

async fn login(ctx: &Context) -> Result<()> {
    if ctx.manager.check_auth() {
        println!("Already signed in");
        return Ok(());
    }

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };

    println!("Authenticating...");
    match ctx.manager.login(&password).await {
        Ok(()) => {
            println!("Login successful!");
            Ok(())
        }
        Err(e) => bail!(e.user_message()),
    }
}

fn status(ctx: &Context) -> Result<()> {
    if !ctx.manager.check_auth() {
        println!("Signed out");
        return Ok(());
    }

    println!("Signed in ({:?})", ctx.manager.state());
    let claims = ctx
        .manager
        .access_token()
        .as_deref()
        .and_then(AccessClaims::decode);
    match claims {
        Some(claims) => {
            let remaining = claims.remaining();
            if remaining.num_seconds() > 0 {
                println!("Access token expires in {}s", remaining.num_seconds());
            } else {
                println!("Access token expired; it will be renewed on the next call");
            }
        }
        None => println!("Access token expiry unknown"),
    }
    Ok(())
}

async fn get(ctx: &Context, path: &str) -> Result<()> {
    let mut events = ctx.manager.subscribe();
    let request = ctx.client.request(Method::GET, path)?;

    let result = ctx.client.execute(request).await;
    let login_required = login_required(&mut events);

    match result {
        Ok(response) => {
            println!("{}", response.status());
            let body = response.text().await.unwrap_or_default();
            if !body.is_empty() {
                println!("{body}");
            }
        }
        Err(e) => {
            let err = SessionError::from(e);
            if !err.requires_login() {
                bail!(err);
            }
            eprintln!("{}", rejection_message(&err, login_required));
        }
    }
    Ok(())
}

/// What to tell the user after a protected call came back `401`.
fn rejection_message(err: &SessionError, login_required: bool) -> String {
    if login_required {
        format!(
            "{}. Run `aiocensor login` to sign in again.",
            err.user_message()
        )
    } else {
        "Request was rejected; the session has been renewed, try again.".to_string()
    }
}

/// Drain pending session events, reporting whether the login screen was requested.
fn login_required(events: &mut Receiver<SessionEvent>) -> bool {
    let mut required = false;
    while let Ok(event) = events.try_recv() {
        info!(?event, "Session event");
        required |= event == SessionEvent::LoginRequired;
    }
    required
}

fn navigate(ctx: &Context, to: &str, from: Option<&Location>) -> Result<()> {
    let guard = NavigationGuard::new(ctx.manager.clone(), RouteTable::console());
    let to = Location::parse(to);
    let landed = guard.navigate(&to, from)?;
    println!("lands on {landed} ({})", guard.title_for(&landed));
    Ok(())
}
