use std::env;
use std::path::PathBuf;

/// Server configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub model_path: PathBuf,
    pub audit_db_path: PathBuf,
    /// Permutations sampled per attribution.
    pub explainer_permutations: usize,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8000),
            model_path: env::var("MODEL_PATH")
                .unwrap_or_else(|_| "model.json".to_string())
                .into(),
            audit_db_path: env::var("AUDIT_DB_PATH")
                .unwrap_or_else(|_| "audit.db".to_string())
                .into(),
            explainer_permutations: env::var("EXPLAINER_PERMUTATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(25),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:8000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        }
    }
}
