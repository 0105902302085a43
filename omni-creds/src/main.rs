//! omni-creds - Manage platform connections and OAuth sessions

use std::sync::Arc;

use clap::{Parser, Subcommand};
use libomnicast::accounts::AccountResolver;
use libomnicast::graph::GraphClient;
use libomnicast::oauth::{self, CallbackParams};
use libomnicast::store::{CredentialStore, FileStorage};
use libomnicast::tokens::{days_left, TokenLifecycle};
use libomnicast::{Config, OmnicastError, PlatformId, Result};

#[derive(Parser)]
#[command(name = "omni-creds")]
#[command(version)]
#[command(about = "Manage Omnicast platform connections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show connection status for every platform
    Status,

    /// Store a platform token directly
    Set {
        /// Platform name (linkedin, instagram, facebook, youtube, twitterx, whatsapp, tiktok)
        platform: String,

        /// Access token (or primary identifier for Instagram)
        token: String,

        /// Companion identifier, e.g. the TikTok open id
        #[arg(long)]
        secondary: Option<String>,

        /// Unix timestamp at which the token expires
        #[arg(long)]
        expires_at: Option<i64>,
    },

    /// Disconnect one platform
    Clear {
        /// Platform name
        platform: String,
    },

    /// Disconnect every platform and drop cached pages
    ClearAll {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Print the authorization URL to start an OAuth flow
    Authorize {
        /// Platform name
        platform: String,
    },

    /// Validate an OAuth callback and print the authorization code
    Callback {
        /// Platform name
        platform: String,

        /// `code` query parameter from the callback URL
        #[arg(long)]
        code: Option<String>,

        /// `state` query parameter from the callback URL
        #[arg(long)]
        state: Option<String>,
    },

    /// Exchange a short-lived Facebook token and resolve manageable pages
    Exchange {
        /// Short-lived user access token
        token: String,
    },

    /// List resolved Facebook pages
    Pages {
        /// Re-resolve from the Graph API before listing
        #[arg(long)]
        refresh: bool,
    },

    /// Select the active Facebook page
    UsePage {
        /// Page id from `omni-creds pages`
        page_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    libomnicast::logging::config_from_env(cli.verbose).init();

    if let Err(e) = run_command(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn open_store(config: &Config) -> Result<CredentialStore> {
    let backend = FileStorage::open(config.expand_storage_path())?;
    Ok(CredentialStore::new(Arc::new(backend)))
}

fn parse_platform(raw: &str) -> Result<PlatformId> {
    raw.parse().map_err(OmnicastError::InvalidInput)
}

async fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Status => status().await,
        Commands::Set {
            platform,
            token,
            secondary,
            expires_at,
        } => set(&platform, &token, secondary.as_deref(), expires_at),
        Commands::Clear { platform } => clear(&platform),
        Commands::ClearAll { force } => clear_all(force),
        Commands::Authorize { platform } => authorize(&platform),
        Commands::Callback {
            platform,
            code,
            state,
        } => callback(&platform, code, state),
        Commands::Exchange { token } => exchange(&token).await,
        Commands::Pages { refresh } => pages(refresh).await,
        Commands::UsePage { page_id } => use_page(&page_id),
    }
}

async fn status() -> Result<()> {
    let config = Config::load()?;
    let store = open_store(&config)?;
    let now = chrono::Utc::now().timestamp();

    for platform in PlatformId::all() {
        let credential = store.get(*platform)?;
        if !credential.is_connected() {
            println!("{:<12} not connected", platform.display_name());
            continue;
        }
        match credential.expires_at {
            Some(expires_at) => {
                println!(
                    "{:<12} connected (token expires in {} day(s))",
                    platform.display_name(),
                    days_left(expires_at, now)
                );
            }
            None => println!("{:<12} connected", platform.display_name()),
        }
    }

    let graph = Arc::new(GraphClient::new(&config));
    let resolver = AccountResolver::new(graph, store);
    if let Some(page) = resolver.selected()? {
        println!("Active page: {} ({})", page.name, page.id);
    }
    Ok(())
}

fn set(
    platform: &str,
    token: &str,
    secondary: Option<&str>,
    expires_at: Option<i64>,
) -> Result<()> {
    let platform = parse_platform(platform)?;
    if token.is_empty() {
        return Err(OmnicastError::InvalidInput("token is empty".to_string()));
    }

    let config = Config::load()?;
    let store = open_store(&config)?;
    store.set(platform, token, secondary)?;
    if let Some(expires_at) = expires_at {
        store.set_expiry(platform, expires_at)?;
    }
    println!("Stored credential for {}", platform.display_name());
    Ok(())
}

fn clear(platform: &str) -> Result<()> {
    let platform = parse_platform(platform)?;
    let config = Config::load()?;
    let store = open_store(&config)?;
    store.clear(platform)?;
    println!("Disconnected {}", platform.display_name());
    Ok(())
}

fn clear_all(force: bool) -> Result<()> {
    if !force {
        use std::io::{self, Write};
        print!("This disconnects every platform. Type 'yes' to confirm: ");
        io::stdout()
            .flush()
            .map_err(|e| OmnicastError::InvalidInput(e.to_string()))?;
        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .map_err(|e| OmnicastError::InvalidInput(e.to_string()))?;
        if input.trim() != "yes" {
            println!("Cancelled");
            return Ok(());
        }
    }

    let config = Config::load()?;
    let store = open_store(&config)?;
    store.clear_all()?;
    println!("All platforms disconnected");
    Ok(())
}

fn authorize(platform: &str) -> Result<()> {
    let platform = parse_platform(platform)?;
    let config = Config::load()?;
    let store = open_store(&config)?;

    let url = oauth::begin_authorization(&store, &config, platform)?;
    println!("{}", url);
    Ok(())
}

fn callback(platform: &str, code: Option<String>, state: Option<String>) -> Result<()> {
    let platform = parse_platform(platform)?;
    let config = Config::load()?;
    let store = open_store(&config)?;

    let params = CallbackParams { code, state };
    let code = oauth::validate_callback(&store, platform, &params)?;
    println!("{}", code);
    Ok(())
}

async fn exchange(token: &str) -> Result<()> {
    let config = Config::load()?;
    let store = open_store(&config)?;
    let graph = Arc::new(GraphClient::new(&config));

    let lifecycle = TokenLifecycle::new(graph.clone(), store.clone(), config.refresh.threshold_days);
    let long_lived = lifecycle.exchange_for_long_lived(token).await?;
    println!("Facebook connected");

    let resolver = AccountResolver::new(graph, store);
    let accounts = resolver.refresh(&long_lived).await?;
    println!("Resolved {} manageable page(s)", accounts.len());
    Ok(())
}

async fn pages(refresh: bool) -> Result<()> {
    let config = Config::load()?;
    let store = open_store(&config)?;
    let graph = Arc::new(GraphClient::new(&config));
    let resolver = AccountResolver::new(graph, store.clone());

    let accounts = if refresh {
        let token = store.long_lived_token()?.ok_or_else(|| {
            OmnicastError::InvalidInput(
                "no Facebook token on file; run 'omni-creds exchange' first".to_string(),
            )
        })?;
        resolver.refresh(&token).await?
    } else {
        resolver.cached()?
    };

    if accounts.is_empty() {
        println!("No pages resolved yet. Run 'omni-creds pages --refresh'.");
        return Ok(());
    }

    let selected = resolver.selected()?.map(|p| p.id);
    for account in &accounts {
        let marker = if selected.as_deref() == Some(account.id.as_str()) {
            "*"
        } else {
            " "
        };
        match &account.instagram {
            Some(ig) => println!(
                "{} {} ({}) instagram: {}",
                marker,
                account.name,
                account.id,
                ig.username.as_deref().unwrap_or(&ig.id)
            ),
            None => println!("{} {} ({})", marker, account.name, account.id),
        }
    }
    Ok(())
}

fn use_page(page_id: &str) -> Result<()> {
    let config = Config::load()?;
    let store = open_store(&config)?;
    let graph = Arc::new(GraphClient::new(&config));
    let resolver = AccountResolver::new(graph, store);

    resolver.select(page_id)?;
    println!("Active page set to {}", page_id);
    Ok(())
}
