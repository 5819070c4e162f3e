use std::env;
use secrecy::SecretString;

use crate::models::domain::Persona;

const DEFAULT_API_KEY: &str = "gemini_api_key";

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: SecretString,
    pub gemini_base_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub enable_web_search: bool,
    pub request_timeout_secs: u64,
    pub default_persona: Persona,
    pub web_server_host: String,
    pub web_server_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: SecretString::from(
                env::var("GEMINI_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_string()),
            ),
            gemini_base_url: env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            chat_model: env::var("TUTOR_CHAT_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            image_model: env::var("TUTOR_IMAGE_MODEL")
                .unwrap_or_else(|_| "imagen-3.0-generate-002".to_string()),
            enable_web_search: env::var("TUTOR_ENABLE_WEB_SEARCH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            request_timeout_secs: env::var("LLM_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            default_persona: env::var("TUTOR_DEFAULT_PERSONA")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        }
    }

    /// Validate that production-critical configuration is set
    /// Panics if the model API key is still the placeholder
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        let api_key = self.gemini_api_key.expose_secret();

        if api_key == DEFAULT_API_KEY || api_key.trim().is_empty() {
            panic!(
                "FATAL: GEMINI_API_KEY is using default value! Set GEMINI_API_KEY environment variable."
            );
        }

        if self.request_timeout_secs == 0 {
            panic!("FATAL: LLM_REQUEST_TIMEOUT_SECS must be greater than zero.");
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            gemini_api_key: SecretString::from("test_api_key".to_string()),
            gemini_base_url: "http://127.0.0.1:9".to_string(),
            chat_model: "gemini-test".to_string(),
            image_model: "imagen-test".to_string(),
            enable_web_search: false,
            request_timeout_secs: 5,
            default_persona: Persona::General,
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
        }
    }
}
