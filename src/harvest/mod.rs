//! Corpus harvesting: sitemap crawling, HTML to text conversion and sentence
//! extraction from scraped CSV content.

mod download;
mod stats;
mod text;

pub use download::{download_pages, sitemap_urls, PageFetcher};
pub use stats::DownloadStats;
pub use text::{clean_text, convert_pages, extract_sentences, html_to_text, split_sentences};
