use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use time::OffsetDateTime;
use triptrack::net::backend::{Credentials, Registration};
use triptrack::session::cookie::MemoryCookieJar;
use triptrack::session::storage::FileStorage;
use triptrack::trips::{Coordinates, NewTrip, RouteData, Trip, create_trip, list_trips};
use triptrack::{ApiClient, ApiError, AuthError, ClientConfig, ConfigError, SessionStore, StorageError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("session state: {0}")]
    Storage(#[from] StorageError),
    #[error("no state file location; pass --state-file or set TRIPTRACK_STATE_FILE")]
    NoStateFile,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("not logged in; run `triptrack login <username>`")]
    NotLoggedIn,
    #[error("missing password; pass --password, set TRIPTRACK_PASSWORD, or pipe it on stdin")]
    MissingPassword,
    #[error("could not read {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "triptrack", about = "Trip tracking command-line client")]
struct Cli {
    #[arg(long, env = "TRIPTRACK_API_URL")]
    api_url: String,

    #[arg(long, env = "TRIPTRACK_STATE_FILE", help = "Where session tokens persist between runs")]
    state_file: Option<PathBuf>,

    #[arg(short, long, default_value_t = false, help = "Log debug output to stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        #[arg(long, env = "TRIPTRACK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Register(RegisterArgs),
    Logout,
    Whoami,
    Status,
    Trips(TripsCommand),
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    password: String,
    #[arg(long)]
    confirm_password: String,
}

#[derive(Args, Debug)]
struct TripsCommand {
    #[command(subcommand)]
    command: TripsSubcommand,
}

#[derive(Subcommand, Debug)]
enum TripsSubcommand {
    List,
    Create(CreateTripArgs),
    /// Print the stops of a saved route payload.
    Route {
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct CreateTripArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    current_location: String,
    #[arg(long, default_value = "0,0", help = "Current position as lat,lng")]
    current: Coordinates,
    #[arg(long)]
    pickup_location: String,
    #[arg(long, help = "Pickup position as lat,lng")]
    pickup: Coordinates,
    #[arg(long)]
    dropoff_location: String,
    #[arg(long, help = "Dropoff position as lat,lng")]
    dropoff: Coordinates,
    #[arg(long, default_value_t = 0.0, help = "Hours of the current cycle already used")]
    cycle_used: f64,
    #[arg(long, help = "YYYY-MM-DD")]
    start_date: String,
    #[arg(long, help = "YYYY-MM-DD")]
    end_date: String,
}

impl CreateTripArgs {
    fn into_new_trip(self) -> NewTrip {
        NewTrip {
            title: self.title,
            description: self.description,
            current_location: self.current_location,
            pickup_location: self.pickup_location,
            dropoff_location: self.dropoff_location,
            current_coordinates: self.current,
            pickup_coordinates: self.pickup,
            dropoff_coordinates: self.dropoff,
            current_cycle_used: self.cycle_used,
            start_date: self.start_date,
            estimated_end_date: self.end_date,
        }
    }
}

struct CliContext {
    store: Arc<SessionStore>,
    api: ApiClient,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt().with_writer(io::stderr).with_max_level(level).init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = build_context(&cli)?;
    ctx.store.initialize().await;

    match cli.command {
        Command::Login { username, password } => run_login(&ctx, username, password).await,
        Command::Register(args) => run_register(&ctx, args).await,
        Command::Logout => {
            ctx.store.logout().await;
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => run_whoami(&ctx).await,
        Command::Status => run_status(&ctx).await,
        Command::Trips(trips) => run_trips(&ctx, trips).await,
    }
}

fn build_context(cli: &Cli) -> Result<CliContext, CliError> {
    let config = ClientConfig::from_env_with_base(&cli.api_url)?;
    let path = cli.state_file.clone().or_else(FileStorage::default_path).ok_or(CliError::NoStateFile)?;
    let storage = Arc::new(FileStorage::open(path)?);
    let store = SessionStore::with_http(&config, storage, Arc::new(MemoryCookieJar::new()))?;
    Ok(CliContext { store: Arc::new(store), api: ApiClient::new(&config)? })
}

// =============================================================================
// AUTH COMMANDS
// =============================================================================

async fn run_login(ctx: &CliContext, username: String, password: Option<String>) -> Result<(), CliError> {
    let password = match password {
        Some(password) => password,
        None => read_password_line()?,
    };
    let user = ctx.store.login(&Credentials { username, password }).await?;
    println!("Logged in as {}.", user.display_name());
    Ok(())
}

fn read_password_line() -> Result<String, CliError> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(|_| CliError::MissingPassword)?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    if password.is_empty() {
        return Err(CliError::MissingPassword);
    }
    Ok(password)
}

async fn run_register(ctx: &CliContext, args: RegisterArgs) -> Result<(), CliError> {
    let registration = Registration {
        name: args.name,
        username: args.username,
        email: args.email,
        password: args.password,
        confirm_password: args.confirm_password,
    };
    ctx.store.register(&registration).await?;
    println!("Account created. Log in with `triptrack login {}`.", registration.username);
    Ok(())
}

async fn run_whoami(ctx: &CliContext) -> Result<(), CliError> {
    let session = ctx.store.snapshot().await;
    if !session.is_authenticated() {
        return Err(CliError::NotLoggedIn);
    }
    let Some(user) = session.user else {
        return Err(CliError::NotLoggedIn);
    };
    print_json(&serde_json::to_value(&user)?)
}

async fn run_status(ctx: &CliContext) -> Result<(), CliError> {
    let session = ctx.store.snapshot().await;
    let status = serde_json::to_value(session.status)?;
    match (status.as_str(), &session.user) {
        (Some(label), Some(user)) if session.is_authenticated() => println!("{label} as {}", user.display_name()),
        (Some(label), _) => println!("{label}"),
        (None, _) => println!("{status}"),
    }
    Ok(())
}

// =============================================================================
// TRIP COMMANDS
// =============================================================================

async fn run_trips(ctx: &CliContext, trips: TripsCommand) -> Result<(), CliError> {
    match trips.command {
        TripsSubcommand::List => {
            let trips = with_reauth(ctx, move || list_trips(&ctx.api, &*ctx.store)).await?;
            if trips.is_empty() {
                println!("No trips found.");
            }
            let now = OffsetDateTime::now_utc();
            for trip in &trips {
                println!("{}", trip_line(trip, now));
            }
            Ok(())
        }
        TripsSubcommand::Create(args) => {
            let new_trip = args.into_new_trip();
            let trip = &new_trip;
            let created = with_reauth(ctx, move || create_trip(&ctx.api, &*ctx.store, trip)).await?;
            print_json(&created)
        }
        TripsSubcommand::Route { file } => {
            let raw = std::fs::read_to_string(&file).map_err(|source| CliError::ReadFile { path: file.clone(), source })?;
            let route = RouteData::from_value(serde_json::from_str::<Value>(&raw)?);
            for line in route_lines(&route) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

/// Run `call`; on a 401, drop the access token so the next read refreshes, and retry once.
async fn with_reauth<T, F, Fut>(ctx: &CliContext, mut call: F) -> Result<T, CliError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    match call().await {
        Err(e) if e.is_unauthorized() => {
            tracing::info!("access token rejected; retrying after refresh");
            ctx.store.invalidate_access_token().await;
            Ok(call().await?)
        }
        other => Ok(other?),
    }
}

fn trip_line(trip: &Trip, now: OffsetDateTime) -> String {
    let id = trip.id.map_or_else(|| "-".to_owned(), |id| id.to_string());
    let from = trip.pickup_location.as_deref().unwrap_or("?");
    let to = trip.dropoff_location.as_deref().unwrap_or("?");
    let mut line = format!("#{id} {} [{}] {from} -> {to}", trip.title, trip.status_label());
    if let Some(distance) = trip.distance_label() {
        line.push_str(&format!(", {distance}"));
    }
    if trip.shows_countdown() {
        match trip.days_left(now) {
            0 => line.push_str(", due today"),
            days => line.push_str(&format!(", {days} days remaining")),
        }
    }
    line
}

fn route_lines(route: &RouteData) -> Vec<String> {
    let stops = route.stops();
    if stops.is_empty() {
        return vec!["No route data available.".to_owned()];
    }
    stops
        .iter()
        .enumerate()
        .map(|(i, stop)| {
            let kind = stop.kind.as_deref().map(|k| format!(" [{k}]")).unwrap_or_default();
            format!("{}. {}{kind} ({}, {})", i + 1, stop.name, stop.lat(), stop.lng())
        })
        .collect()
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
