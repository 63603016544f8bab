//! compdash - command-line shell for the compiler dashboard API.
//!
//! Signs in, keeps the session on disk between runs and issues
//! authenticated requests through the core session manager.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use compdash_core::{ApiClient, Config, RequestOptions, SessionManager, SessionState};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: compdash <command> [args]

Commands:
  login [username]              Sign in
  register <username> [email]   Create an account and sign in
  logout                        Sign out and forget stored tokens
  status                        Show the current session
  whoami                        Fetch the signed-in user's profile
  get <path>                    GET a protected API path
  delete <path>                 DELETE a protected API path
  post <path> <json>            POST a JSON body to a protected API path

Environment:
  COMPDASH_API_BASE_URL         API base URL (default http://localhost:5000/api)
  COMPDASH_TOKEN_STORE          keyring | file | memory
  RUST_LOG                      Log filter (default warn)";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> Result<ExitCode> {
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(ExitCode::FAILURE);
    };
    if command == "-h" || command == "--help" || command == "help" {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let manager = connect().await?;
    let rest = &args[1..];

    match command.as_str() {
        "login" => login(&manager, rest.first().cloned()).await,
        "register" => register(&manager, rest).await,
        "logout" => {
            manager.sign_out().await;
            println!("Signed out.");
            Ok(ExitCode::SUCCESS)
        }
        "status" => {
            status(&manager);
            Ok(ExitCode::SUCCESS)
        }
        "whoami" => {
            require_session(&manager)?;
            let profile: Value = manager
                .request_json("/auth/profile", RequestOptions::get())
                .await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(ExitCode::SUCCESS)
        }
        "get" => call(&manager, Method::GET, rest.first(), None).await,
        "delete" => call(&manager, Method::DELETE, rest.first(), None).await,
        "post" => {
            let body = match rest.get(1) {
                Some(raw) => {
                    Some(serde_json::from_str(raw).context("Request body is not valid JSON")?)
                }
                None => None,
            };
            call(&manager, Method::POST, rest.first(), body).await
        }
        other => {
            eprintln!("Unknown command '{}'\n\n{}", other, USAGE);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Load configuration, open the token store and resolve the startup session
async fn connect() -> Result<SessionManager> {
    let config = Config::load()
        .context("Failed to load config")?
        .apply_env()?;
    debug!(base_url = %config.api_base_url, storage = %config.storage, "Config loaded");

    let store = config.open_store()?;
    let api = ApiClient::from_config(&config)?;

    let manager = SessionManager::init(api, store).await;
    info!(state = ?manager.state(), "Session ready");
    Ok(manager)
}

fn require_session(manager: &SessionManager) -> Result<()> {
    if manager.is_authenticated() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Not signed in. Run `compdash login` first."))
    }
}

async fn login(manager: &SessionManager, username: Option<String>) -> Result<ExitCode> {
    let username = match username {
        Some(name) => name,
        None => prompt("Username: ")?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    println!("\nAuthenticating...");
    match manager.login(&username, &password).await {
        Ok(_) => {
            println!("Login successful!");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Login failed: {}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn register(manager: &SessionManager, args: &[String]) -> Result<ExitCode> {
    let Some(username) = args.first() else {
        eprintln!("Usage: compdash register <username> [email]");
        return Ok(ExitCode::FAILURE);
    };
    let email = args.get(1).cloned().unwrap_or_default();
    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        eprintln!("Passwords do not match");
        return Ok(ExitCode::FAILURE);
    }

    match manager.register(username, &password, &email).await {
        Ok(_) => {
            println!("Account created, you are signed in.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Registration failed: {}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn status(manager: &SessionManager) {
    let session = manager.session();
    match session.state() {
        SessionState::Authenticated => {
            let name = session
                .user
                .as_ref()
                .and_then(|u| u.display_name())
                .unwrap_or("unknown user");
            println!("Signed in as {}", name);
            if let Some(since) = session.authenticated_at {
                println!("Verified at {}", since.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        SessionState::Unauthenticated => println!("Not signed in"),
        SessionState::Initializing => println!("Session is still initializing"),
    }
}

async fn call(
    manager: &SessionManager,
    method: Method,
    path: Option<&String>,
    body: Option<Value>,
) -> Result<ExitCode> {
    let Some(path) = path else {
        eprintln!("{}", USAGE);
        return Ok(ExitCode::FAILURE);
    };

    let mut options = RequestOptions::default().method(method);
    if let Some(body) = body {
        options = options.json(body);
    }

    let response = manager
        .request(path, options)
        .await
        .with_context(|| format!("Request to {} failed", path))?;
    let status = response.status();
    let text = response.text().await.context("Failed to read response body")?;

    // Pretty-print JSON bodies, pass anything else through
    let rendered = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or(text);

    if status.is_success() {
        println!("{}", rendered);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{}", status);
        if !rendered.is_empty() {
            eprintln!("{}", rendered);
        }
        Ok(ExitCode::FAILURE)
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
