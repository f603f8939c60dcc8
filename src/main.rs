use anyhow::Context;
use nsanku::client::{ChatModel, Client, EmbeddingApi};
use nsanku::config::Config;
use nsanku::logging::{init_logging, parse_log_level, LoggerConfig};
use nsanku::menu::{read_choice, MenuChoice};
use nsanku::report::generate_report;
use nsanku::similarity::Embedder;
use nsanku::utils::ensure_directory;
use nsanku::{log_error, log_info, log_warn};
use nsanku::{Pipeline, RecipeRegistry, StateStore};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load_or_default("config.toml").context("loading config.toml")?;
    let logger_config = LoggerConfig {
        directory: config.logging.directory.clone(),
        file_name: config.logging.filename.clone(),
        rotation: tracing_appender::rolling::Rotation::DAILY,
        level: parse_log_level(&config.logging.level)?,
    };
    init_logging(logger_config)?;

    log_info!("[main] Starting translation pipeline...");
    ensure_directory(&config.output_dir)?;

    let api_key = std::env::var(&config.api.api_key_env).unwrap_or_default();
    if api_key.is_empty() {
        log_warn!(
            "[main] {} is not set, API requests will be unauthenticated",
            config.api.api_key_env
        );
    }

    let client = Client::builder()
        .base_url(&config.api.base_url)
        .api_key(api_key)
        .timeout(Duration::from_secs(config.api.timeout))
        .build()?;

    let chat: Arc<dyn ChatModel> = Arc::new(client.clone());
    let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingApi::new(client, &config.embedding));
    let registry = RecipeRegistry::from_config(
        &config.recipes,
        chat,
        embedder,
        config.embedding.batch_size,
    )
    .context("building recipe registry")?;
    log_info!("[main] Loaded recipes: {}", registry.names().join(", "));

    let store = StateStore::new(&config.state_file);
    let mut state = store.load();
    let pipeline = Pipeline::new(
        &config.input_dir,
        &config.output_dir,
        &registry,
        store.clone(),
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    loop {
        let choice = read_choice(&mut stdin.lock(), &mut stdout.lock())?;
        match choice {
            MenuChoice::RunPipeline => match pipeline.run(&mut state).await {
                Ok(summary) => {
                    for file in &summary.ignored_files {
                        log_warn!("[main] Ignored input file: {}", file);
                    }
                }
                Err(e) => log_error!(e => "[main] Pipeline run aborted"),
            },
            MenuChoice::GenerateReports => {
                if let Err(e) =
                    generate_report(&config.output_dir, &config.reports_dir, &registry.names())
                {
                    log_error!(e => "[main] Report generation failed");
                }
            }
            MenuChoice::ResetState => match store.reset() {
                Ok(()) => {
                    state.clear();
                    log_info!("[main] Processing state has been reset");
                }
                Err(e) => log_error!(e => "[main] Could not reset processing state"),
            },
            MenuChoice::Exit => {
                log_info!("[main] Exiting...");
                break;
            }
        }
    }

    Ok(())
}
