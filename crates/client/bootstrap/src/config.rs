//! Client configuration structures and loaders.
use std::env;
use std::path::PathBuf;

use game_content::CampaignLayout;

const APPLICATION: &str = "tabletop";

/// Everything a front-end needs to open one campaign.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Root holding `<world>/<campaign>` directories.
    pub worlds_dir: PathBuf,
    pub world: String,
    pub campaign: String,
    pub log_dir: PathBuf,
    /// Seed for reproducible dice; entropy when unset.
    pub dice_seed: Option<u64>,
    pub step_limit: u64,
    pub transcribe_rolls: bool,
    /// Capacity of the input queue in front of the session.
    pub queue_depth: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let dirs = directories::ProjectDirs::from("", "", APPLICATION);
        let worlds_dir = dirs
            .as_ref()
            .map_or_else(|| PathBuf::from("."), |d| d.data_dir().to_path_buf())
            .join("worlds");
        let log_dir = dirs
            .as_ref()
            .map_or_else(|| PathBuf::from("."), |d| d.cache_dir().to_path_buf())
            .join("logs");

        Self {
            worlds_dir,
            world: "default".to_string(),
            campaign: "default".to_string(),
            log_dir,
            dice_seed: None,
            step_limit: 10_000,
            transcribe_rolls: false,
            queue_depth: 32,
        }
    }
}

impl ClientConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `TABLETOP_WORLDS_DIR` - Root of all worlds (default: platform data dir)
    /// - `TABLETOP_WORLD` - World name (default: `default`)
    /// - `TABLETOP_CAMPAIGN` - Campaign name (default: `default`)
    /// - `TABLETOP_LOG_DIR` - Log directory (default: platform cache dir)
    /// - `TABLETOP_DICE_SEED` - Seed dice for a reproducible session
    /// - `TABLETOP_STEP_LIMIT` - Formula instruction ceiling (default: 10000)
    /// - `TABLETOP_TRANSCRIBE_ROLLS` - Log every manifest roll (default: false)
    /// - `TABLETOP_QUEUE_DEPTH` - Input queue size (default: 32)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = read("TABLETOP_WORLDS_DIR") {
            config.worlds_dir = PathBuf::from(dir);
        }
        if let Some(world) = read("TABLETOP_WORLD") {
            config.world = world;
        }
        if let Some(campaign) = read("TABLETOP_CAMPAIGN") {
            config.campaign = campaign;
        }
        if let Some(dir) = read("TABLETOP_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        config.dice_seed = read("TABLETOP_DICE_SEED").and_then(|v| v.trim().parse().ok());
        let step_limit = read("TABLETOP_STEP_LIMIT").and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(limit) = step_limit {
            config.step_limit = limit.max(1);
        }
        if let Some(flag) = read("TABLETOP_TRANSCRIBE_ROLLS") {
            config.transcribe_rolls = parse_flag(&flag);
        }
        let queue_depth = read("TABLETOP_QUEUE_DEPTH").and_then(|v| v.trim().parse::<usize>().ok());
        if let Some(depth) = queue_depth {
            config.queue_depth = depth.max(1);
        }

        config
    }

    pub fn layout(&self) -> CampaignLayout {
        CampaignLayout::new(&self.worlds_dir, &self.world, &self.campaign)
    }

    /// Directory for this campaign's client log.
    pub fn campaign_log_dir(&self) -> PathBuf {
        self.log_dir.join(&self.campaign)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.world, "default");
        assert_eq!(config.campaign, "default");
        assert_eq!(config.step_limit, 10_000);
        assert_eq!(config.queue_depth, 32);
        assert_eq!(config.dice_seed, None);
        assert!(!config.transcribe_rolls);
        assert!(config.worlds_dir.ends_with("worlds"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("TABLETOP_WORLDS_DIR", "/srv/worlds"),
            ("TABLETOP_WORLD", "greyhawk"),
            ("TABLETOP_CAMPAIGN", "keep"),
            ("TABLETOP_LOG_DIR", "/var/log/tabletop"),
            ("TABLETOP_DICE_SEED", "42"),
            ("TABLETOP_STEP_LIMIT", "500"),
            ("TABLETOP_TRANSCRIBE_ROLLS", "yes"),
            ("TABLETOP_QUEUE_DEPTH", "0"),
        ]);
        assert_eq!(config.layout().root(), PathBuf::from("/srv/worlds/greyhawk/keep"));
        assert_eq!(config.campaign_log_dir(), PathBuf::from("/var/log/tabletop/keep"));
        assert_eq!(config.dice_seed, Some(42));
        assert_eq!(config.step_limit, 500);
        assert!(config.transcribe_rolls);
        assert_eq!(config.queue_depth, 1);
    }

    #[test]
    fn test_garbage_values_keep_defaults() {
        let config = config(&[
            ("TABLETOP_DICE_SEED", "lucky"),
            ("TABLETOP_STEP_LIMIT", "-3"),
            ("TABLETOP_WORLD", "  "),
        ]);
        assert_eq!(config.dice_seed, None);
        assert_eq!(config.step_limit, 10_000);
        assert_eq!(config.world, "default");
    }
}
