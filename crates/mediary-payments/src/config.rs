//! Payment processor configuration

/// Connection settings for the upstream payment processor.
#[derive(Clone)]
pub struct PaymentsConfig {
    /// Base URL of the processor's REST API
    pub api_root: String,
    /// Key appended to every request
    pub api_key: String,
}

impl PaymentsConfig {
    pub fn new(api_root: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_root: api_root.into(),
            api_key: api_key.into(),
        }
    }

    /// Load settings from the environment, falling back to a local
    /// processor with an empty key.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            api_root: std::env::var("MEDIARY_PAYMENTS_URL")
                .unwrap_or_else(|_| "http://localhost:8090".to_string()),
            api_key: std::env::var("MEDIARY_PAYMENTS_KEY").unwrap_or_default(),
        }
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for PaymentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsConfig")
            .field("api_root", &self.api_root)
            .field("api_key", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_the_key() {
        let config = PaymentsConfig::new("http://localhost:8090", "s3cr3t");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("***"));
    }
}
