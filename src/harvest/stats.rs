use crate::log_info;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct DownloadStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes: usize,
    pub status_codes: HashMap<u16, usize>,
    pub failures: Vec<(String, String)>, // (url, reason)
}

impl DownloadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, bytes: usize) {
        self.attempted += 1;
        self.succeeded += 1;
        self.bytes += bytes;
    }

    pub fn record_failure(&mut self, url: String, reason: String, status_code: Option<u16>) {
        self.attempted += 1;
        self.failed += 1;
        if let Some(code) = status_code {
            *self.status_codes.entry(code).or_default() += 1;
        }
        self.failures.push((url, reason));
    }

    pub fn print_report(&self) {
        log_info!(
            "[harvest] Downloaded {}/{} pages ({} bytes), {} failed",
            self.succeeded,
            self.attempted,
            self.bytes,
            self.failed
        );
        let mut codes: Vec<_> = self.status_codes.iter().collect();
        codes.sort();
        for (code, count) in codes {
            log_info!("[harvest]   HTTP {}: {} failures", code, count);
        }
        for (url, reason) in &self.failures {
            log_info!("[harvest]   {} - {}", url, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_add_up() {
        let mut stats = DownloadStats::new();
        stats.record_success(10);
        stats.record_failure("u".into(), "404".into(), Some(404));
        stats.record_failure("v".into(), "timeout".into(), None);
        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.succeeded + stats.failed, stats.attempted);
        assert_eq!(stats.status_codes[&404], 1);
        assert_eq!(stats.failures.len(), 2);
    }
}
