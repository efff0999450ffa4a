//! API endpoint configuration from CLI flag or environment.

/// Base URL of the timetable service.
///
/// Resolution order: explicit `--url` flag, then the `LICHHOC_URL`
/// environment variable (a `.env` file is honored), then the local
/// default.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

const DEFAULT_URL: &str = "http://127.0.0.1:8080";

impl ApiConfig {
    pub fn resolve(override_url: Option<String>) -> Self {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = override_url
            .or_else(|| std::env::var("LICHHOC_URL").ok())
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The read endpoint: current entries as JSON.
    pub fn entries_url(&self) -> String {
        format!("{}/api/entries", self.base_url)
    }

    /// The upload endpoint: multipart workbook upload.
    pub fn upload_url(&self) -> String {
        format!("{}/api/upload", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_explicit_url_wins() {
        let config = ApiConfig::resolve(Some("http://tkb.example.com".to_string()));
        assert_eq!(config.base_url, "http://tkb.example.com");
    }

    #[test]
    fn test_resolve_trims_trailing_slash() {
        let config = ApiConfig::resolve(Some("http://tkb.example.com/".to_string()));
        assert_eq!(config.base_url, "http://tkb.example.com");
        assert_eq!(config.entries_url(), "http://tkb.example.com/api/entries");
    }

    #[test]
    fn test_endpoint_urls() {
        let config = ApiConfig::resolve(Some("http://127.0.0.1:9000".to_string()));
        assert_eq!(config.entries_url(), "http://127.0.0.1:9000/api/entries");
        assert_eq!(config.upload_url(), "http://127.0.0.1:9000/api/upload");
    }
}
