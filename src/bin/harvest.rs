use anyhow::{bail, Context};
use nsanku::client::Client;
use nsanku::config::Config;
use nsanku::harvest::{convert_pages, download_pages, extract_sentences, sitemap_urls, PageFetcher};
use nsanku::logging::{init_logging, parse_log_level, LoggerConfig};
use nsanku::{log_info, log_warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const USAGE: &str = "usage: harvest download [sitemap.xml] | harvest sentences [root_dir]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load_or_default("config.toml").context("loading config.toml")?;
    init_logging(LoggerConfig {
        directory: config.logging.directory.clone(),
        file_name: "harvest.log".to_string(),
        rotation: tracing_appender::rolling::Rotation::DAILY,
        level: parse_log_level(&config.logging.level)?,
    })?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("download") => {
            let sitemap = args
                .get(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| config.harvest.sitemap.clone());
            let xml = std::fs::read_to_string(&sitemap)
                .with_context(|| format!("reading sitemap {}", sitemap.display()))?;
            let urls = sitemap_urls(&xml);
            let Some(first) = urls.first() else {
                log_warn!("[harvest] No <loc> entries in {}", sitemap.display());
                return Ok(());
            };
            log_info!("[harvest] Found {} URLs in {}", urls.len(), sitemap.display());

            let client = Client::builder()
                .base_url(first)
                .header("accept", "text/html,application/xhtml+xml")?
                .timeout(Duration::from_secs(config.api.timeout))
                .build()?;
            let fetcher: Arc<dyn PageFetcher> = Arc::new(client);

            let html_dir = config.harvest.output_dir.join("html_files");
            let stats =
                download_pages(fetcher, &urls, &html_dir, config.harvest.workers).await?;
            stats.print_report();

            let text_dir = config.harvest.output_dir.join("text_files");
            let converted = convert_pages(&html_dir, &text_dir)?;
            log_info!("[harvest] Converted {} pages into {}", converted, text_dir.display());
        }
        Some("sentences") => {
            let root = args
                .get(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| config.harvest.output_dir.clone());
            let written = extract_sentences(&root, &config.harvest.content_column)?;
            let total: usize = written.iter().map(|(_, n)| n).sum();
            log_info!(
                "[harvest] Wrote {} sentences across {} files",
                total,
                written.len()
            );
        }
        _ => bail!(USAGE),
    }

    Ok(())
}
