//! services/app/src/bin/learnlingo.rs

use app_lib::{
    adapters::{FileStorage, FirebaseAuthAdapter, FirebaseCatalogAdapter, InMemoryIdentityProvider},
    client::{
        BookingForm, ClientContext, ClientSettings, Credentials, FavoriteClick, LearningReason,
        PreferredTime, RouteDecision,
    },
    config::{Config, ConfigError},
    error::AppError,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use learnlingo_core::{
    CatalogStore, FilterCriteria, IdentityProvider, MultiSelect, PortError, PriceBucket,
    SingleSelect, Tutor,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "learnlingo", about = "Browse language tutors, keep favorites and book a trial lesson")]
struct Cli {
    /// Sign in with this email before running the command.
    #[arg(long, global = true, requires = "password")]
    email: Option<String>,
    #[arg(long, global = true, requires = "email")]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tutors, optionally filtered.
    Teachers(TeachersArgs),
    /// Show or change the favorites list.
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Create an account.
    Signup,
    /// Check that the given credentials sign in.
    Login,
    /// Send a trial-lesson request to a tutor.
    Book(BookArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum MatchMode {
    /// Exact membership, any of the selected values.
    Multi,
    /// Case-insensitive containment of a single value.
    Single,
}

#[derive(Args)]
struct TeachersArgs {
    #[arg(long = "language")]
    languages: Vec<String>,
    #[arg(long = "level")]
    levels: Vec<String>,
    /// One of: all, 0-20, 20-30, 30+.
    #[arg(long, default_value = "all")]
    price: PriceBucket,
    #[arg(long = "match", value_enum, default_value_t = MatchMode::Multi)]
    mode: MatchMode,
    /// How many windows to show, as if "load more" were clicked.
    #[arg(long, default_value_t = 1)]
    pages: usize,
}

#[derive(Subcommand)]
enum FavoritesCommand {
    List,
    Toggle { id: String },
    Clear,
}

#[derive(Args)]
struct BookArgs {
    tutor_id: String,
    #[arg(long)]
    name: String,
    #[arg(long = "contact-email")]
    contact_email: String,
    #[arg(long)]
    phone: String,
    /// morning, afternoon or evening.
    #[arg(long)]
    time: PreferredTime,
    #[arg(long)]
    reason: Option<LearningReason>,
    #[arg(long, default_value = "")]
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded.");

    // --- 2. Initialize Adapters ---
    let http = reqwest::Client::new();
    let catalog: Arc<dyn CatalogStore> = Arc::new(FirebaseCatalogAdapter::new(
        http.clone(),
        config.database_url.clone(),
        config.catalog_path.clone(),
    ));
    let identity: Arc<dyn IdentityProvider> = match &config.api_key {
        Some(key) => Arc::new(FirebaseAuthAdapter::new(http.clone(), key.clone())),
        None => {
            warn!("FIREBASE_API_KEY is not set; signing in is unavailable.");
            Arc::new(InMemoryIdentityProvider::new())
        }
    };
    let storage = Arc::new(FileStorage::new(config.storage_path.clone()));

    // --- 3. Boot the Client ---
    let ctx = ClientContext::boot(ClientSettings::from(&config), catalog, identity, storage).await;
    ctx.auth.initialized().await;

    let credentials = match (cli.email, cli.password) {
        (Some(email), Some(password)) => Some(Credentials::new(email, password)),
        _ => None,
    };
    let signing_up = matches!(cli.command, Command::Signup);
    if let Some(creds) = credentials.as_ref().filter(|_| !signing_up) {
        sign_in(&ctx, &config, creds).await?;
    }

    // --- 4. Run the Command ---
    let result = match cli.command {
        Command::Teachers(args) => list_teachers(&ctx, args).await,
        Command::Favorites(cmd) => favorites(&ctx, cmd).await,
        Command::Signup => {
            let creds = credentials.ok_or_else(credentials_required)?;
            require_api_key(&config)?;
            let user = ctx.auth.signup(&creds).await?;
            println!("Account created for {} ({})", user.email, user.user_id);
            Ok(())
        }
        Command::Login => {
            let user = ctx.auth.require_user()?;
            println!("Signed in as {} ({})", user.email, user.user_id);
            Ok(())
        }
        Command::Book(args) => book(&ctx, args).await,
    };

    if ctx.auth.current_user().is_some() {
        ctx.auth.logout().await;
    }
    result
}

fn credentials_required() -> AppError {
    AppError::Internal("pass --email and --password".to_string())
}

fn require_api_key(config: &Config) -> Result<(), AppError> {
    match config.api_key {
        Some(_) => Ok(()),
        None => Err(ConfigError::MissingVar("FIREBASE_API_KEY".to_string()).into()),
    }
}

async fn sign_in(ctx: &ClientContext, config: &Config, creds: &Credentials) -> Result<(), AppError> {
    require_api_key(config)?;
    ctx.auth.login(creds).await.map_err(|e| {
        eprintln!("{}", e.user_message());
        e
    })?;
    Ok(())
}

fn criteria_from(args: &TeachersArgs) -> FilterCriteria {
    match args.mode {
        MatchMode::Multi => FilterCriteria::MultiSelect(MultiSelect {
            languages: args.languages.iter().cloned().collect(),
            levels: args.levels.iter().cloned().collect(),
            price: args.price,
        }),
        MatchMode::Single => FilterCriteria::SingleSelect(SingleSelect {
            language: args.languages.first().cloned(),
            level: args.levels.first().cloned(),
            price: args.price,
        }),
    }
}

async fn list_teachers(ctx: &ClientContext, args: TeachersArgs) -> Result<(), AppError> {
    let listing = ctx.listing(criteria_from(&args));
    let mut view = listing.start().await;
    for _ in 1..args.pages {
        if !view.can_load_more {
            break;
        }
        view = listing.load_more().await;
    }
    listing.teardown().await;

    if let Some(error) = &view.error {
        eprintln!("{}", error);
    }
    if view.tutors.is_empty() {
        if view.has_active_filters {
            println!("No teachers match the selected filters.");
        } else {
            println!("No teachers found.");
        }
        return Ok(());
    }
    for tutor in &view.tutors {
        print_tutor(tutor, ctx.favorites.is_member(&tutor.id));
    }
    println!(
        "Showing {} of {} matching teachers{}",
        view.tutors.len(),
        view.total_matches,
        if view.can_load_more { "; more available" } else { "" }
    );
    Ok(())
}

async fn favorites(ctx: &ClientContext, cmd: FavoritesCommand) -> Result<(), AppError> {
    match cmd {
        FavoritesCommand::List => match ctx.navigate("/favorites") {
            RouteDecision::Render(_) => {
                let tutors = ctx.favorite_tutors().await?;
                if tutors.is_empty() {
                    println!("You have no favorite teachers yet.");
                }
                for tutor in &tutors {
                    print_tutor(tutor, true);
                }
                Ok(())
            }
            RouteDecision::Redirect(_) | RouteDecision::Pending => Err(AppError::Unauthenticated),
        },
        FavoritesCommand::Toggle { id } => match ctx.click_favorite(&id).await? {
            FavoriteClick::LoginRequired => Err(AppError::Unauthenticated),
            FavoriteClick::Toggled { id, is_favorite } => {
                let verb = if is_favorite { "Added" } else { "Removed" };
                println!("{} {} {} favorites", verb, id, if is_favorite { "to" } else { "from" });
                Ok(())
            }
        },
        FavoritesCommand::Clear => {
            ctx.favorites.clear().await;
            println!("Favorites cleared.");
            Ok(())
        }
    }
}

async fn book(ctx: &ClientContext, args: BookArgs) -> Result<(), AppError> {
    ctx.auth.require_user()?;
    let tutor = ctx
        .catalog()
        .fetch_all()
        .await?
        .into_iter()
        .find(|t| t.id == args.tutor_id)
        .ok_or_else(|| PortError::NotFound(format!("teacher {}", args.tutor_id)))?;

    let mut form = BookingForm {
        name: args.name,
        email: args.contact_email,
        phone: args.phone,
        preferred_time: Some(args.time),
        reason: args.reason,
        message: args.message,
    };
    match ctx.booking.submit(&tutor, &mut form).await {
        Ok(confirmation) => {
            println!(
                "Trial lesson with {} requested (request {}).",
                tutor.full_name(),
                confirmation.request_id
            );
            Ok(())
        }
        Err(AppError::Validation(errors)) => {
            for (field, message) in errors.fields() {
                eprintln!("{}: {}", field, message);
            }
            Err(AppError::Validation(errors))
        }
        Err(e) => Err(e),
    }
}

fn print_tutor(tutor: &Tutor, favorite: bool) {
    println!(
        "{} [{}] {}  {:.1}*  ${}/h  {} lessons",
        if favorite { "♥" } else { " " },
        tutor.id,
        tutor.full_name(),
        tutor.rating,
        tutor.price_per_hour,
        tutor.lessons_done
    );
    println!("    Speaks: {}", tutor.languages.join(", "));
    if !tutor.levels.is_empty() {
        println!("    Levels: {}", tutor.levels.join(", "));
    }
}
