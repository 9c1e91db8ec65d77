use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout:free";

/// Thresholds and limits of the label resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Only the top N observations are considered (default: 15)
    pub max_observations: usize,

    /// Item cap for the keyword pass (default: 8)
    pub max_items: usize,

    /// Item cap for the fallback pass (default: 5)
    pub max_fallback_items: usize,

    /// Unmatched labels above this confidence get a heuristic estimate (default: 0.3)
    pub estimate_min_confidence: f64,

    /// Fallback pass accepts any label above this confidence (default: 0.5)
    pub fallback_min_confidence: f64,

    pub default_portion: String,
    pub fallback_portion: String,
    pub no_food_message: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_observations: 15,
            max_items: 8,
            max_fallback_items: 5,
            estimate_min_confidence: 0.3,
            fallback_min_confidence: 0.5,
            default_portion: "100g".to_string(),
            fallback_portion: "porción".to_string(),
            no_food_message: "no food detected".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Only required when images go to the remote classifier
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,
    pub food_database_path: Option<PathBuf>,
    pub resolver: ResolverConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut resolver = ResolverConfig::default();
        if let Some(n) = parse_count(&non_empty, "MAX_RESULTS_TO_ANALYZE")? {
            resolver.max_observations = n;
        }
        if let Some(n) = parse_count(&non_empty, "MAX_FOOD_ITEMS")? {
            resolver.max_items = n;
        }
        if let Some(n) = parse_count(&non_empty, "MAX_FALLBACK_ITEMS")? {
            resolver.max_fallback_items = n;
        }

        Ok(Self {
            openrouter_api_key: non_empty("OPENROUTER_API_KEY"),
            openrouter_model: non_empty("OPENROUTER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            food_database_path: non_empty("FOOD_DATABASE_PATH").map(PathBuf::from),
            resolver,
        })
    }
}

fn parse_count<F>(lookup: &F, key: &str) -> Result<Option<usize>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    let value: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("{} must be a positive integer, got '{}'", key, raw))?;
    if value == 0 {
        anyhow::bail!("{} must be greater than zero", key);
    }
    Ok(Some(value))
}
