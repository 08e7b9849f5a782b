use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_PINECONE_CONTROLLER_URL: &str = "https://api.pinecone.io";
const DEFAULT_NAMESPACE: &str = "buffett-wisdom-namespace";
const DEFAULT_AUTHOR: &str = "Warren Buffett";
const DEFAULT_ANSWER_TOP_K: u32 = 10;
const MAX_TEMPERATURE: f32 = 2.0;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct WisdomConfig {
    pub common: core_config::Config,
    pub google: GoogleConfig,
    pub pinecone: PineconeConfig,
    pub models: ModelConfig,
    pub wisdom: WisdomSettings,
    pub http_client_timeout_secs: u64,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: Secret<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: Secret<String>,
    pub index_name: String,
    /// Data-plane host. When unset it is looked up through the controller.
    pub index_host: Option<String>,
    pub controller_url: String,
    pub namespace: String,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Embedding model (e.g., text-embedding-004)
    pub embedding_model: String,
    /// Generation model for condensation and answers (e.g., gemini-1.5-flash)
    pub text_model: String,
}

#[derive(Debug, Clone)]
pub struct WisdomSettings {
    /// Whose writings the index holds; used in prompts and the no-match reply.
    pub author: String,
    pub answer_top_k: u32,
    pub condense_quotes: bool,
    /// Sampling temperature for quote condensation. `None` keeps the model default.
    pub condense_temperature: Option<f32>,
    /// Sampling temperature for grounded answers. `None` keeps the model default.
    pub answer_temperature: Option<f32>,
    /// Output token cap for every generation call.
    pub max_output_tokens: Option<i32>,
}

impl Default for WisdomSettings {
    fn default() -> Self {
        Self {
            author: DEFAULT_AUTHOR.to_string(),
            answer_top_k: DEFAULT_ANSWER_TOP_K,
            condense_quotes: true,
            condense_temperature: None,
            answer_temperature: None,
            max_output_tokens: None,
        }
    }
}

impl WisdomSettings {
    pub fn no_match_quote(&self) -> String {
        format!("No relevant {} text found. Please try again.", self.author)
    }

    /// Reject values the upstream APIs would refuse on every request.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.answer_top_k == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "WISDOM_ANSWER_TOP_K must be at least 1"
            )));
        }

        for (key, value) in [
            ("WISDOM_CONDENSE_TEMPERATURE", self.condense_temperature),
            ("WISDOM_ANSWER_TEMPERATURE", self.answer_temperature),
        ] {
            if let Some(t) = value {
                if !(0.0..=MAX_TEMPERATURE).contains(&t) {
                    return Err(AppError::ConfigError(anyhow::anyhow!(
                        "{} must be between 0.0 and {}, got {}",
                        key,
                        MAX_TEMPERATURE,
                        t
                    )));
                }
            }
        }

        if matches!(self.max_output_tokens, Some(n) if n <= 0) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GENAI_MAX_OUTPUT_TOKENS must be positive"
            )));
        }

        Ok(())
    }
}

impl WisdomConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let wisdom = WisdomSettings {
            author: get_env("WISDOM_AUTHOR", Some(DEFAULT_AUTHOR))?,
            answer_top_k: get_parsed("WISDOM_ANSWER_TOP_K", DEFAULT_ANSWER_TOP_K)?,
            condense_quotes: get_parsed("WISDOM_CONDENSE_QUOTES", true)?,
            condense_temperature: get_optional("WISDOM_CONDENSE_TEMPERATURE")?,
            answer_temperature: get_optional("WISDOM_ANSWER_TEMPERATURE")?,
            max_output_tokens: get_optional("GENAI_MAX_OUTPUT_TOKENS")?,
        };
        wisdom.validate()?;

        Ok(WisdomConfig {
            common,
            google: GoogleConfig {
                api_key: Secret::new(get_env("GEMINI_API_KEY", None)?),
                api_base: get_env("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE))?,
            },
            pinecone: PineconeConfig {
                api_key: Secret::new(get_env("PINECONE_API_KEY", None)?),
                index_name: get_env("PINECONE_INDEX_NAME", None)?,
                index_host: env::var("PINECONE_INDEX_HOST")
                    .ok()
                    .filter(|h| !h.is_empty()),
                controller_url: get_env(
                    "PINECONE_CONTROLLER_URL",
                    Some(DEFAULT_PINECONE_CONTROLLER_URL),
                )?,
                namespace: get_env("PINECONE_NAMESPACE", Some(DEFAULT_NAMESPACE))?,
            },
            models: ModelConfig {
                embedding_model: get_env("GENAI_EMBEDDING_MODEL", Some("text-embedding-004"))?,
                text_model: get_env("GENAI_TEXT_MODEL", Some("gemini-1.5-flash"))?,
            },
            wisdom,
            http_client_timeout_secs: get_parsed(
                "HTTP_CLIENT_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|e| !e.is_empty()),
        })
    }
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => default.map(str::to_string).ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("{} is required but not set", key))
        }),
    }
}

fn get_parsed<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(get_optional(key)?.unwrap_or(default))
}

fn get_optional<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map(Some).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
        }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_values_fall_back_to_default_when_unset() {
        let k: u32 = get_parsed("WISDOM_TEST_UNSET_TOP_K", 7).unwrap();
        assert_eq!(k, 7);
    }

    #[test]
    fn invalid_number_is_a_config_error() {
        env::set_var("WISDOM_TEST_BAD_TOP_K", "ten");
        let result: Result<u32, _> = get_parsed("WISDOM_TEST_BAD_TOP_K", 10);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn missing_required_value_is_a_config_error() {
        let result = get_env("WISDOM_TEST_MISSING_KEY", None);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn no_match_quote_names_the_author() {
        let settings = WisdomSettings {
            author: "Charlie Munger".to_string(),
            ..WisdomSettings::default()
        };
        assert_eq!(
            settings.no_match_quote(),
            "No relevant Charlie Munger text found. Please try again."
        );
    }

    #[test]
    fn default_settings_are_valid() {
        assert!(WisdomSettings::default().validate().is_ok());
    }

    #[test]
    fn zero_top_k_is_a_config_error() {
        let settings = WisdomSettings {
            answer_top_k: 0,
            ..WisdomSettings::default()
        };
        assert!(matches!(settings.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn out_of_range_temperature_is_a_config_error() {
        let settings = WisdomSettings {
            condense_temperature: Some(2.5),
            ..WisdomSettings::default()
        };
        assert!(matches!(settings.validate(), Err(AppError::ConfigError(_))));

        let settings = WisdomSettings {
            answer_temperature: Some(-0.1),
            ..WisdomSettings::default()
        };
        assert!(matches!(settings.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn non_positive_token_cap_is_a_config_error() {
        let settings = WisdomSettings {
            max_output_tokens: Some(0),
            ..WisdomSettings::default()
        };
        assert!(matches!(settings.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn optional_value_is_none_when_unset() {
        let t: Option<f32> = get_optional("WISDOM_TEST_UNSET_TEMPERATURE").unwrap();
        assert_eq!(t, None);
    }
}
