use std::{env, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{error, info};
use tokio::net::TcpListener;

use estatia::{
    config::{self, Config},
    db::{self, PgStore, Store},
    logger::setup_logger,
    ml::Models,
    services::predictions::PredictionService,
    training,
    web::{self, AppState},
};

const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

#[derive(Parser)]
#[command(name = "estatia")]
#[command(about = "Property price and time-to-sale predictions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the CRUD and prediction API
    Serve,
    /// Fit the models, write artifacts and refresh stored predictions
    Train,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    dotenv().ok();
    setup_logger(env::var(LOG_LEVEL_ENV).ok().as_deref())?;

    let config: Arc<Config> = Arc::new(config::read_config());

    let pool = db::establish_pool(&config)?;
    db::create_tables(&pool)?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, store).await,
        Commands::Train => {
            tokio::task::spawn_blocking(move || training::run(&config, store.as_ref()))
                .await?
                .map(|report| {
                    info!(
                        "Trained on {} rows, stored {} predictions",
                        report.rows, report.predictions_written
                    )
                })
        }
    };

    if let Err(err) = &result {
        error!("Error: {:?}", err)
    }
    result
}

async fn serve(config: Arc<Config>, store: Arc<dyn Store>) -> Result<()> {
    // A missing artifact or feature list stops startup here.
    let models = Arc::new(Models::load(&config.model_dir).context("Failed to load models")?);
    let predictions = Arc::new(PredictionService::new(store.clone(), models, &config));

    let bind_addr = config.bind_address();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind http listener on {bind_addr}"))?;
    info!("Listening on {bind_addr}");

    web::start_http_server(listener, AppState { store, predictions }, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down");
    })
    .await
}
