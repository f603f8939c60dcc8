use super::stats::DownloadStats;
use crate::client::Client;
use crate::error::{AppError, ClientError, Result};
use crate::utils::{ensure_directory, save_text};
use crate::{log_error, log_info};
use async_trait::async_trait;
use futures::{stream::FuturesUnordered, StreamExt};
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[async_trait]
impl PageFetcher for Client {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.get_text(url).await
    }
}

fn loc_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<(?:\w+:)?loc>(.*?)</(?:\w+:)?loc>").unwrap())
}

/// Every `<loc>` value of a sitemap, trimmed, in document order.
pub fn sitemap_urls(xml: &str) -> Vec<String> {
    loc_pattern()
        .captures_iter(xml)
        .map(|caps| caps[1].trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

/// Fetches `urls` with at most `workers` requests in flight. URL `i`
/// (1-based) lands in `dir/page_{i}.html`; failures are counted, not raised.
pub async fn download_pages(
    fetcher: Arc<dyn PageFetcher>,
    urls: &[String],
    dir: &Path,
    workers: usize,
) -> Result<DownloadStats> {
    ensure_directory(dir)?;
    let workers = workers.max(1);
    let stats = Arc::new(Mutex::new(DownloadStats::new()));
    let mut tasks = FuturesUnordered::new();

    for (i, url) in urls.iter().enumerate() {
        let fetcher = Arc::clone(&fetcher);
        let stats = Arc::clone(&stats);
        let url = url.clone();
        let path = dir.join(format!("page_{}.html", i + 1));

        tasks.push(tokio::spawn(async move {
            let result = match fetcher.fetch(&url).await {
                Ok(html) => save_text(&html, &path).map(|_| html.len()),
                Err(e) => Err(e),
            };
            match result {
                Ok(bytes) => {
                    log_info!("[harvest] Downloaded HTML: {}", url);
                    stats.lock().await.record_success(bytes);
                }
                Err(e) => {
                    log_error!(e => "[harvest] Failed to download {}", url);
                    let status = match &e {
                        AppError::Client(ClientError::ResponseError { status_code, .. }) => {
                            Some(*status_code)
                        }
                        _ => None,
                    };
                    stats
                        .lock()
                        .await
                        .record_failure(url, e.to_string(), status);
                }
            }
        }));

        if tasks.len() >= workers {
            if let Some(Err(e)) = tasks.next().await {
                log_error!("[harvest] Download task error: {}", e);
            }
        }
    }

    while let Some(result) = tasks.next().await {
        if let Err(e) = result {
            log_error!("[harvest] Download task error: {}", e);
        }
    }

    let stats = stats.lock().await.clone();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tmp_dir(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("nsanku_download_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&p);
        p
    }

    struct FakeSite {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for FakeSite {
        async fn fetch(&self, url: &str) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if url.ends_with("missing") {
                return Err(ClientError::ResponseError {
                    status_code: 404,
                    message: "not found".into(),
                }
                .into());
            }
            Ok(format!("<html><body>{}</body></html>", url))
        }
    }

    #[test]
    fn extracts_loc_values_in_order() {
        let xml = r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc> https://a.example/1 </loc></url>
  <url><loc>https://a.example/2</loc><lastmod>2024-01-01</lastmod></url>
</urlset>"#;
        assert_eq!(
            sitemap_urls(xml),
            vec!["https://a.example/1".to_string(), "https://a.example/2".to_string()]
        );
        assert!(sitemap_urls("<urlset/>").is_empty());
    }

    #[tokio::test]
    async fn writes_numbered_pages_and_counts_failures() {
        let dir = tmp_dir("pages");
        let site = Arc::new(FakeSite {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let urls: Vec<String> = (1..=6)
            .map(|i| format!("https://a.example/{}", i))
            .chain(std::iter::once("https://a.example/missing".to_string()))
            .collect();

        let stats = download_pages(site.clone(), &urls, &dir, 2).await.unwrap();

        assert_eq!(stats.attempted, 7);
        assert_eq!(stats.succeeded, 6);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.status_codes[&404], 1);
        assert!(site.peak.load(Ordering::SeqCst) <= 2);

        let page3 = std::fs::read_to_string(dir.join("page_3.html")).unwrap();
        assert!(page3.contains("https://a.example/3"));
        assert!(!dir.join("page_7.html").exists());

        // directory creation is idempotent
        download_pages(site, &urls[..1], &dir, 2).await.unwrap();
    }
}
