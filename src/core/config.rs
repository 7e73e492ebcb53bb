// Configuration Management for the Market Event Engine
// JSON file + environment overrides, thresholds for every detector

use crate::core::event_types::EventType;
use crate::core::types::CooldownClock;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

// ============================================================================
// Configuration Structures
// ============================================================================

/// Thresholds consumed by the detector plugins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionThresholds {
    // Shared liquidity gate
    pub min_volume: f64,                     // Cumulative day volume floor (shares)

    // Volume detector
    pub rvol_spike: f64,                     // RVOL crossing level
    pub rvol_spike_min_volume: f64,
    pub volume_surge_rvol: f64,
    pub volume_surge_min_volume: f64,
    pub volume_spike_1min: f64,              // Shares in the rolling 1-minute window
    pub block_trade_volume: f64,             // Shares in the current minute bar
    pub unusual_prints_z: f64,

    // Momentum detector
    pub running_chg_5min_pct: f64,
    pub running_min_volume: f64,
    pub daily_change_pct: f64,               // PERCENT_UP_5 / PERCENT_DOWN_5 level
    pub daily_change_large_pct: f64,         // PERCENT_UP_10 / PERCENT_DOWN_10 level

    // Pullback detector
    pub pullback_shallow_fraction: f64,      // PULLBACK_25_* retracement
    pub pullback_deep_fraction: f64,         // PULLBACK_75_* retracement
    pub pullback_min_range_pct: f64,         // Range floor relative to reference price (%)

    // Gap detectors
    pub gap_min_pct: f64,

    // Stochastic detector
    pub stoch_bullish_zone: f64,             // Bullish %K/%D cross only below this %K
    pub stoch_bearish_zone: f64,             // Bearish cross only above this %K
    pub stoch_oversold: f64,
    pub stoch_overbought: f64,

    // Opening range breakout
    pub orb_window_minutes: i64,
    pub orb_min_width_pct: f64,

    // Consolidation breakout
    pub consolidation_max_chg_5min_pct: f64,
    pub consolidation_max_chg_10min_pct: f64,
    pub consolidation_breakout_chg_1min_pct: f64,
    pub consolidation_min_rvol: f64,

    // Confirmed cross
    pub confirmation_secs: i64,

    // Daily levels / multi-window momentum
    pub sustained_chg_10min_pct: f64,
    pub confirmed_chg_5min_pct: f64,
    pub confirmed_chg_15min_pct: f64,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            min_volume: 10_000.0,

            rvol_spike: 3.0,
            rvol_spike_min_volume: 50_000.0,
            volume_surge_rvol: 5.0,
            volume_surge_min_volume: 100_000.0,
            volume_spike_1min: 50_000.0,
            block_trade_volume: 50_000.0,
            unusual_prints_z: 3.0,

            running_chg_5min_pct: 2.0,
            running_min_volume: 50_000.0,
            daily_change_pct: 5.0,
            daily_change_large_pct: 10.0,

            pullback_shallow_fraction: 0.25,
            pullback_deep_fraction: 0.75,
            pullback_min_range_pct: 1.0,

            gap_min_pct: 2.0,

            stoch_bullish_zone: 30.0,
            stoch_bearish_zone: 70.0,
            stoch_oversold: 20.0,
            stoch_overbought: 80.0,

            orb_window_minutes: 5,
            orb_min_width_pct: 0.1,

            consolidation_max_chg_5min_pct: 0.5,
            consolidation_max_chg_10min_pct: 1.0,
            consolidation_breakout_chg_1min_pct: 0.8,
            consolidation_min_rvol: 1.5,

            confirmation_secs: 30,

            sustained_chg_10min_pct: 3.0,
            confirmed_chg_5min_pct: 2.0,
            confirmed_chg_15min_pct: 4.0,
        }
    }
}

impl DetectionThresholds {
    fn validate(&self, errors: &mut Vec<String>) {
        let non_negative = [
            ("min_volume", self.min_volume),
            ("rvol_spike", self.rvol_spike),
            ("rvol_spike_min_volume", self.rvol_spike_min_volume),
            ("volume_surge_rvol", self.volume_surge_rvol),
            ("volume_surge_min_volume", self.volume_surge_min_volume),
            ("volume_spike_1min", self.volume_spike_1min),
            ("block_trade_volume", self.block_trade_volume),
            ("unusual_prints_z", self.unusual_prints_z),
            ("running_chg_5min_pct", self.running_chg_5min_pct),
            ("running_min_volume", self.running_min_volume),
            ("daily_change_pct", self.daily_change_pct),
            ("daily_change_large_pct", self.daily_change_large_pct),
            ("pullback_min_range_pct", self.pullback_min_range_pct),
            ("gap_min_pct", self.gap_min_pct),
            ("stoch_bullish_zone", self.stoch_bullish_zone),
            ("stoch_bearish_zone", self.stoch_bearish_zone),
            ("orb_min_width_pct", self.orb_min_width_pct),
            ("consolidation_max_chg_5min_pct", self.consolidation_max_chg_5min_pct),
            ("consolidation_max_chg_10min_pct", self.consolidation_max_chg_10min_pct),
            ("consolidation_breakout_chg_1min_pct", self.consolidation_breakout_chg_1min_pct),
            ("consolidation_min_rvol", self.consolidation_min_rvol),
            ("sustained_chg_10min_pct", self.sustained_chg_10min_pct),
            ("confirmed_chg_5min_pct", self.confirmed_chg_5min_pct),
            ("confirmed_chg_15min_pct", self.confirmed_chg_15min_pct),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{} must be a non-negative number", name));
            }
        }

        for (name, fraction) in [
            ("pullback_shallow_fraction", self.pullback_shallow_fraction),
            ("pullback_deep_fraction", self.pullback_deep_fraction),
        ] {
            if !(fraction > 0.0 && fraction < 1.0) {
                errors.push(format!("{} must lie strictly between 0 and 1", name));
            }
        }
        if self.stoch_oversold >= self.stoch_overbought {
            errors.push("stoch_oversold must be below stoch_overbought".to_string());
        }
        if self.orb_window_minutes <= 0 {
            errors.push("orb_window_minutes must be positive".to_string());
        }
        if self.confirmation_secs <= 0 {
            errors.push("confirmation_secs must be positive".to_string());
        }
    }
}

/// Engine-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub state_max_age_secs: i64,
    pub cooldown_clock: CooldownClock,
    pub cooldown_overrides: HashMap<EventType, u64>,
    pub shards: usize,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_max_age_secs: 300,
            cooldown_clock: CooldownClock::Wall,
            cooldown_overrides: HashMap::new(),
            shards: 4,
            log_level: "INFO".to_string(),
            json_logs: false,
        }
    }
}

impl EngineConfig {
    /// Effective cooldown for `event_type`: override if configured, else the catalog default
    pub fn cooldown_secs(&self, event_type: EventType) -> u64 {
        self.cooldown_overrides
            .get(&event_type)
            .copied()
            .unwrap_or_else(|| event_type.default_cooldown_secs())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    engine: EngineConfig,
    thresholds: DetectionThresholds,
}

// ============================================================================
// Configuration Manager
// ============================================================================

pub struct ConfigManager {
    engine: Arc<RwLock<EngineConfig>>,
    thresholds: Arc<RwLock<DetectionThresholds>>,
}

impl ConfigManager {
    pub fn new(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut manager = Self {
            engine: Arc::new(RwLock::new(EngineConfig::default())),
            thresholds: Arc::new(RwLock::new(DetectionThresholds::default())),
        };

        if let Some(path) = config_path {
            manager.load_from_file(path)?;
        }

        manager.load_from_env();

        info!("Configuration initialized");
        Ok(manager)
    }

    /// Load configuration from a JSON file with optional `engine` and `thresholds` sections
    pub fn load_from_file(&mut self, config_path: &str) -> Result<(), ConfigError> {
        let path = Path::new(config_path);
        if !path.exists() {
            warn!(path = config_path, "Config file not found, using defaults");
            return Ok(());
        }

        let content = fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&content)?;

        *self.engine.write() = file.engine;
        *self.thresholds.write() = file.thresholds;

        info!(path = config_path, "Configuration loaded");
        Ok(())
    }

    /// Environment overrides
    pub fn load_from_env(&mut self) {
        if let Ok(level) = std::env::var("MARKET_EVENTS_LOG_LEVEL") {
            self.engine.write().log_level = level;
        }
        if let Ok(max_age) = std::env::var("MARKET_EVENTS_STATE_MAX_AGE_SECS") {
            match max_age.parse::<i64>() {
                Ok(secs) => self.engine.write().state_max_age_secs = secs,
                Err(_) => warn!(value = %max_age, "Ignoring invalid MARKET_EVENTS_STATE_MAX_AGE_SECS"),
            }
        }
        if let Ok(clock) = std::env::var("MARKET_EVENTS_COOLDOWN_CLOCK") {
            match clock.parse::<CooldownClock>() {
                Ok(clock) => self.engine.write().cooldown_clock = clock,
                Err(e) => warn!(error = %e, "Ignoring invalid MARKET_EVENTS_COOLDOWN_CLOCK"),
            }
        }
    }

    pub fn save_to_file(&self, config_path: &str) -> Result<(), ConfigError> {
        let file = ConfigFile {
            engine: self.engine.read().clone(),
            thresholds: self.thresholds.read().clone(),
        };

        if let Some(parent) = Path::new(config_path).parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&file)?;
        fs::write(config_path, json)?;

        info!(path = config_path, "Configuration saved");
        Ok(())
    }

    /// Validate configuration; returns every problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let engine = self.engine.read();

        if engine.state_max_age_secs <= 0 {
            errors.push("state_max_age_secs must be positive".to_string());
        }
        if engine.shards == 0 {
            errors.push("shards must be at least 1".to_string());
        }
        self.thresholds.read().validate(&mut errors);

        if !errors.is_empty() {
            for error in &errors {
                warn!(error = %error, "Config validation error");
            }
            return Err(ConfigError::Validation(errors.join("; ")));
        }

        info!("Configuration validated successfully");
        Ok(())
    }

    pub fn engine(&self) -> EngineConfig {
        self.engine.read().clone()
    }

    pub fn thresholds(&self) -> DetectionThresholds {
        self.thresholds.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let thresholds = DetectionThresholds::default();
        assert_eq!(thresholds.min_volume, 10_000.0);
        assert_eq!(thresholds.rvol_spike, 3.0);
        assert_eq!(thresholds.pullback_deep_fraction, 0.75);

        let engine = EngineConfig::default();
        assert_eq!(engine.state_max_age_secs, 300);
        assert_eq!(engine.cooldown_clock, CooldownClock::Wall);
    }

    #[test]
    fn test_config_manager_defaults_validate() {
        let manager = ConfigManager::new(None).unwrap();
        assert!(manager.validate().is_ok());
    }

    #[test]
    fn test_cooldown_override() {
        let mut engine = EngineConfig::default();
        assert_eq!(engine.cooldown_secs(EventType::NewHigh), 30);
        engine.cooldown_overrides.insert(EventType::NewHigh, 0);
        assert_eq!(engine.cooldown_secs(EventType::NewHigh), 0);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let manager = ConfigManager::new(None).unwrap();
        manager.thresholds.write().pullback_deep_fraction = 1.5;
        manager.engine.write().shards = 0;

        match manager.validate() {
            Err(ConfigError::Validation(msg)) => {
                assert!(msg.contains("pullback_deep_fraction"));
                assert!(msg.contains("shards"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_negative_change_thresholds_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("negative.json");
        fs::write(
            &path,
            r#"{"thresholds":{"daily_change_pct":-5.0,"running_chg_5min_pct":-2.0,"unusual_prints_z":-3.0,"confirmed_chg_15min_pct":-4.0}}"#,
        )
        .unwrap();

        let manager = ConfigManager::new(Some(path.to_str().unwrap())).unwrap();
        match manager.validate() {
            Err(ConfigError::Validation(msg)) => {
                for field in ["daily_change_pct", "running_chg_5min_pct", "unusual_prints_z", "confirmed_chg_15min_pct"] {
                    assert!(msg.contains(field), "{} missing from: {}", field, msg);
                }
            }
            other => panic!("expected validation error, got {:?}", other.map(|_| ())),
        }

        manager.thresholds.write().stoch_bearish_zone = f64::NAN;
        manager.thresholds.write().daily_change_pct = 5.0;
        let msg = manager.validate().unwrap_err().to_string();
        assert!(msg.contains("stoch_bearish_zone"));
        assert!(!msg.contains("daily_change_pct must"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let path = path.to_str().unwrap();

        let manager = ConfigManager::new(None).unwrap();
        manager.engine.write().cooldown_clock = CooldownClock::EventTime;
        manager.engine.write().cooldown_overrides.insert(EventType::BlockTrade, 15);
        manager.thresholds.write().min_volume = 25_000.0;
        manager.save_to_file(path).unwrap();

        let loaded = ConfigManager::new(Some(path)).unwrap();
        assert_eq!(loaded.thresholds().min_volume, 25_000.0);
        assert_eq!(loaded.engine().cooldown_secs(EventType::BlockTrade), 15);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{"thresholds":{"gap_min_pct":3.0}}"#).unwrap();

        let manager = ConfigManager::new(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(manager.thresholds().gap_min_pct, 3.0);
        assert_eq!(manager.thresholds().min_volume, 10_000.0);
        assert_eq!(manager.engine().state_max_age_secs, 300);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let manager = ConfigManager::new(Some("/nonexistent/market_events.json")).unwrap();
        assert_eq!(manager.engine(), EngineConfig::default());
    }
}
