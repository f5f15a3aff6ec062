use serde::{Deserialize, Serialize};

/// Accepted deviation between the number of rows a labeling response carries
/// and the number of rows the batch sent out. Below `min_ratio` × expected the
/// batch is accepted with a warning; above `max_ratio` × expected it is
/// rejected as malformed generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResponseTolerance {
    pub min_ratio: f64,
    pub max_ratio: f64,
}

impl Default for ResponseTolerance {
    fn default() -> Self {
        Self {
            min_ratio: 0.9,
            max_ratio: 1.2,
        }
    }
}

/// Explicit pipeline configuration, constructed by the caller and passed into
/// each component. No component reads ambient global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Asset identifiers the prediction cycle iterates over.
    pub tracked_assets: Vec<String>,
    /// Currency predictions are priced in.
    pub main_currency: String,
    /// Default look-ahead for fusion and prediction, in hours.
    pub horizon_hours: i64,
    pub tolerance: ResponseTolerance,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tracked_assets: vec!["bitcoin".to_string(), "ethereum".to_string()],
            main_currency: "usd".to_string(),
            horizon_hours: 12,
            tolerance: ResponseTolerance::default(),
        }
    }
}

impl PipelineConfig {
    /// Build a config from environment variables, falling back to defaults:
    /// `TRACKED_ASSETS` (comma-separated), `MAIN_CURRENCY`,
    /// `PREDICTION_HORIZON_HOURS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let tracked_assets = std::env::var("TRACKED_ASSETS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.tracked_assets);

        let main_currency = std::env::var("MAIN_CURRENCY")
            .map(|v| v.trim().to_lowercase())
            .unwrap_or(defaults.main_currency);

        let horizon_hours = std::env::var("PREDICTION_HORIZON_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.horizon_hours);

        Self {
            tracked_assets,
            main_currency,
            horizon_hours,
            tolerance: ResponseTolerance::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tolerance_matches_documented_thresholds() {
        let tol = ResponseTolerance::default();
        assert_eq!(tol.min_ratio, 0.9);
        assert_eq!(tol.max_ratio, 1.2);
    }

    #[test]
    fn default_config_has_tracked_assets() {
        let cfg = PipelineConfig::default();
        assert!(!cfg.tracked_assets.is_empty());
        assert_eq!(cfg.horizon_hours, 12);
    }
}
