//! Customer logo lookup
//!
//! Guesses the company's domain from its name and asks a public logo service
//! for each candidate. The first hit comes back as a data URI.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Public logo service, `{base}/{domain}`
pub const LOGO_SERVICE_URL: &str = "https://logo.clearbit.com";

const CANDIDATE_TLDS: [&str; 4] = ["com", "cl", "co", "net"];

/// Candidate domains for a company name, most likely first
pub fn candidate_domains(company_name: &str) -> Vec<String> {
    let clean: String = company_name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    if clean.is_empty() {
        return Vec::new();
    }
    CANDIDATE_TLDS
        .iter()
        .map(|tld| format!("{}.{}", clean, tld))
        .collect()
}

/// Encode raw bytes as a `data:` URI
pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

/// Anything that can resolve a company name to a logo data URI
#[async_trait]
pub trait LogoSource: Send + Sync {
    async fn fetch_company_logo(&self, company_name: &str) -> Option<String>;
}

/// HTTP client for the logo service
#[derive(Debug, Clone)]
pub struct LogoFetcher {
    http: reqwest::Client,
    base_url: String,
}

impl Default for LogoFetcher {
    fn default() -> Self {
        Self::new(LOGO_SERVICE_URL)
    }
}

impl LogoFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LogoSource for LogoFetcher {
    /// Fetch the first logo that resolves; `None` when every domain misses
    async fn fetch_company_logo(&self, company_name: &str) -> Option<String> {
        for domain in candidate_domains(company_name) {
            let url = format!("{}/{}", self.base_url, domain);
            let response = match self.http.get(&url).send().await {
                Ok(response) if response.status().is_success() => response,
                Ok(response) => {
                    tracing::debug!("No logo at {} ({})", url, response.status());
                    continue;
                }
                Err(e) => {
                    tracing::debug!("Logo request to {} failed: {}", url, e);
                    continue;
                }
            };

            let mime_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("image/png")
                .to_string();

            match response.bytes().await {
                Ok(bytes) if !bytes.is_empty() => {
                    tracing::info!("Found logo for {} at {}", company_name, domain);
                    return Some(to_data_uri(&mime_type, &bytes));
                }
                _ => continue,
            }
        }

        tracing::warn!("Could not fetch logo for {}", company_name);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_domains() {
        assert_eq!(
            candidate_domains("Banco Estado S.A."),
            vec![
                "bancoestadosa.com",
                "bancoestadosa.cl",
                "bancoestadosa.co",
                "bancoestadosa.net"
            ]
        );
    }

    #[test]
    fn test_no_candidates_for_symbol_only_name() {
        assert!(candidate_domains("---").is_empty());
    }

    #[test]
    fn test_data_uri_encoding() {
        assert_eq!(to_data_uri("image/png", b"ABC"), "data:image/png;base64,QUJD");
    }
}
