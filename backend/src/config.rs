use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::inference::OutputKind;
use crate::models::Threshold;

pub const DEFAULT_MODEL_PATH: &str = "models/pipeline_best_model_top20.onnx";
pub const DEFAULT_JSON_LIMIT: usize = 64 * 1024;

/// Deployment settings, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub model_path: PathBuf,
    pub model_output: OutputKind,
    pub threshold: Threshold,
    pub cors_origins: Vec<String>,
    pub json_limit: usize,
}

impl ServerConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        // No default: the threshold differs between deployments.
        let raw_threshold = get("SCORING_THRESHOLD").ok_or(ConfigError::Missing("SCORING_THRESHOLD"))?;
        let threshold = raw_threshold
            .parse::<f64>()
            .map_err(|e| e.to_string())
            .and_then(Threshold::new)
            .map_err(|message| ConfigError::Invalid {
                var: "SCORING_THRESHOLD",
                message,
            })?;

        let model_output = match get("MODEL_OUTPUT") {
            Some(raw) => raw.parse::<OutputKind>().map_err(|message| ConfigError::Invalid {
                var: "MODEL_OUTPUT",
                message,
            })?,
            None => OutputKind::Probabilities,
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                message: e.to_string(),
            })?,
            None => 8000,
        };

        let workers = match get("WORKERS") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "WORKERS",
                        message: format!("expected a positive integer, got `{}`", raw),
                    })
                }
            },
            None => num_cpus::get(),
        };

        let json_limit = match get("JSON_LIMIT_BYTES") {
            Some(raw) => raw.parse::<usize>().map_err(|e| ConfigError::Invalid {
                var: "JSON_LIMIT_BYTES",
                message: e.to_string(),
            })?,
            None => DEFAULT_JSON_LIMIT,
        };

        let cors_origins: Vec<String> = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(ServerConfig {
            host: get("HOST").unwrap_or("127.0.0.1").to_string(),
            port,
            workers,
            model_path: PathBuf::from(get("MODEL_PATH").unwrap_or(DEFAULT_MODEL_PATH)),
            model_output,
            threshold,
            cors_origins,
            json_limit,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn threshold_is_required() {
        let err = ServerConfig::from_vars(&vars(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SCORING_THRESHOLD"));
    }

    #[test]
    fn defaults_apply_around_the_threshold() {
        let config = ServerConfig::from_vars(&vars(&[("SCORING_THRESHOLD", "0.29")])).unwrap();
        assert_eq!(config.threshold.value(), 0.29);
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.model_output, OutputKind::Probabilities);
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
        assert_eq!(config.json_limit, DEFAULT_JSON_LIMIT);
        assert!(config.workers > 0);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn reads_every_setting() {
        let config = ServerConfig::from_vars(&vars(&[
            ("SCORING_THRESHOLD", "0.65"),
            ("MODEL_PATH", "/srv/model.onnx"),
            ("MODEL_OUTPUT", "logit"),
            ("HOST", "0.0.0.0"),
            ("PORT", "10000"),
            ("WORKERS", "3"),
            ("JSON_LIMIT_BYTES", "2048"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:8501, https://dash.example.org"),
        ]))
        .unwrap();
        assert_eq!(config.model_path, PathBuf::from("/srv/model.onnx"));
        assert_eq!(config.model_output, OutputKind::Logit);
        assert_eq!(config.bind_address(), "0.0.0.0:10000");
        assert_eq!(config.workers, 3);
        assert_eq!(config.json_limit, 2048);
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:8501", "https://dash.example.org"]
        );
    }

    #[test]
    fn rejects_bad_values() {
        for (key, value) in [
            ("SCORING_THRESHOLD", "abc"),
            ("SCORING_THRESHOLD", "1.2"),
            ("MODEL_OUTPUT", "softmax"),
            ("PORT", "http"),
            ("WORKERS", "0"),
        ] {
            let mut env = vars(&[("SCORING_THRESHOLD", "0.5")]);
            env.insert(key.to_string(), value.to_string());
            match ServerConfig::from_vars(&env) {
                Err(ConfigError::Invalid { var, .. }) => assert_eq!(var, key),
                other => panic!("{}={} accepted: {:?}", key, value, other),
            }
        }
    }
}
