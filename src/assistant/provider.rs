//! Provider-specific configuration and detection.
//!
//! This module handles differences between assistant API providers: URL
//! layout, API versioning and authentication headers.

use url::Url;

/// Default Azure `OpenAI` API version with assistants support.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-05-01-preview";

/// Supported assistant API providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        /// API version (e.g., "2024-05-01-preview")
        api_version: String,
    },
    /// Generic OpenAI-compatible provider
    Generic,
}

impl Provider {
    /// Detect provider from base URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use assistant_relay::assistant::Provider;
    ///
    /// let provider = Provider::detect_from_url("https://api.openai.com", None);
    /// assert_eq!(provider, Provider::OpenAI);
    /// ```
    #[must_use]
    pub fn detect_from_url(base_url: &str, api_version: Option<&str>) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("openai.azure.com") || lower.contains("azure.com") {
            Self::AzureOpenAI {
                api_version: api_version
                    .unwrap_or(DEFAULT_AZURE_API_VERSION)
                    .to_string(),
            }
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Build the URL of an assistants endpoint.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL (trailing slash optional)
    /// * `path` - Endpoint path relative to the API root, e.g. `threads/abc/runs`
    pub fn endpoint(&self, base_url: &str, path: &str) -> Result<Url, url::ParseError> {
        let base = base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');

        match self {
            Self::AzureOpenAI { api_version } => {
                let mut url = Url::parse(&format!("{base}/openai/{path}"))?;
                url.query_pairs_mut().append_pair("api-version", api_version);
                Ok(url)
            }
            Self::OpenAI | Self::Generic => Url::parse(&format!("{base}/v1/{path}")),
        }
    }

    /// Attach credentials in the form the provider expects.
    pub fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        api_key: &str,
    ) -> reqwest::RequestBuilder {
        match self {
            Self::AzureOpenAI { .. } => request.header("api-key", api_key),
            Self::OpenAI | Self::Generic => request.bearer_auth(api_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_openai() {
        let provider = Provider::detect_from_url("https://api.openai.com", None);
        assert_eq!(provider, Provider::OpenAI);
    }

    #[test]
    fn test_detect_azure() {
        let provider = Provider::detect_from_url("https://my-resource.openai.azure.com", None);
        assert_eq!(
            provider,
            Provider::AzureOpenAI {
                api_version: DEFAULT_AZURE_API_VERSION.to_string()
            }
        );
    }

    #[test]
    fn test_detect_generic() {
        let provider = Provider::detect_from_url("http://127.0.0.1:8080", None);
        assert_eq!(provider, Provider::Generic);
    }

    #[test]
    fn test_endpoint_openai() {
        let url = Provider::OpenAI
            .endpoint("https://api.openai.com/", "threads/thread_1/runs")
            .unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/threads/thread_1/runs");
    }

    #[test]
    fn test_endpoint_azure() {
        let provider = Provider::AzureOpenAI {
            api_version: "2024-05-01-preview".to_string(),
        };
        let url = provider
            .endpoint("https://my-resource.openai.azure.com", "threads")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://my-resource.openai.azure.com/openai/threads?api-version=2024-05-01-preview"
        );
    }
}
