use std::{path::PathBuf, process};

use clap::{Parser, Subcommand};
use foodgram::{
    actions::users::delete_user,
    config::Config,
    connect::{connect, migrate},
    import::{import_ingredients, import_tags, ImportReport},
    routes::routes,
    state::AppState,
};

#[derive(Parser)]
#[command(name = "foodgram", about = "Recipe sharing backend", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations, then serve the HTTP API (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Load ingredients from a `name,measurement_unit` CSV file
    ImportIngredients {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Load tags from a `name,color,slug` CSV file
    ImportTags {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Delete a user together with their recipes, favorites, cart and subscriptions
    DeleteUser {
        #[arg(value_name = "ID")]
        id: i32,
    },
}

fn print_report(report: &ImportReport) {
    println!(
        "{} inserted, {} skipped",
        report.inserted,
        report.skipped.len()
    );
}

async fn run(command: Command, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect(&config).await?;

    match command {
        Command::Serve => {
            migrate(&pool).await?;

            let bind_address = config.bind_address;
            let state = AppState::new(pool, config);
            log::info!("Listening on {bind_address}");
            warp::serve(routes(state)).run(bind_address).await;
        }
        Command::Migrate => migrate(&pool).await?,
        Command::ImportIngredients { file } => {
            print_report(&import_ingredients(&file, &pool).await?);
        }
        Command::ImportTags { file } => {
            print_report(&import_tags(&file, &pool).await?);
        }
        Command::DeleteUser { id } => {
            if !delete_user(id, &pool).await? {
                return Err(format!("User {id} does not exist").into());
            }
            log::info!("Deleted user {id}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(cli.command.unwrap_or(Command::Serve), config).await {
        log::error!("{e}");
        process::exit(1);
    }
}
