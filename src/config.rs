use serde::{Deserialize, Serialize};

use crate::semantic::provider::EmbeddingConfig;
use crate::semantic::scheduler::UpdatePolicy;
use crate::storage::{BackendLocal, StorageManager};

/// Default Zotero local API user prefix.
const DEFAULT_ZOTERO_URL: &str = "http://localhost:23119/api/users/0";

const DEFAULT_UPDATE_POLICY: &str = "manual";
const DEFAULT_UPDATE_DAYS: u32 = 7;
const DEFAULT_RESULT_LIMIT: usize = 10;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Zotero local API.
    #[serde(default = "default_zotero_url")]
    pub zotero_url: String,

    /// Active embedding provider configuration. Changing any field here
    /// moves the index to a new version tag; existing vectors stay on
    /// disk but queries return nothing until items are re-embedded.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Update frequency: "manual", "on-startup", "daily", "every-n-days".
    #[serde(default = "default_update_policy")]
    pub update_policy: String,

    /// Interval for the "every-n-days" policy.
    #[serde(default = "default_update_days")]
    pub update_days: u32,

    /// Default sync mode: embed extracted document text instead of
    /// metadata fields.
    #[serde(default)]
    pub fulltext: bool,

    /// Default number of search results.
    #[serde(default = "default_result_limit")]
    pub default_limit: usize,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zotero_url: default_zotero_url(),
            embedding: EmbeddingConfig::default(),
            update_policy: default_update_policy(),
            update_days: default_update_days(),
            fulltext: false,
            default_limit: default_result_limit(),
            base_path: String::new(),
        }
    }
}

fn default_zotero_url() -> String {
    DEFAULT_ZOTERO_URL.to_string()
}

fn default_update_policy() -> String {
    DEFAULT_UPDATE_POLICY.to_string()
}

fn default_update_days() -> u32 {
    DEFAULT_UPDATE_DAYS
}

fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

impl Config {
    fn validate(&self) {
        if UpdatePolicy::parse(&self.update_policy, self.update_days).is_none() {
            panic!(
                "update_policy must be one of manual, on-startup, daily, every-n-days \
                 (with update_days > 0), got '{}'",
                self.update_policy
            );
        }

        if self.default_limit == 0 {
            panic!("default_limit must be greater than 0");
        }

        if self.zotero_url.trim().is_empty() {
            panic!("zotero_url must not be empty");
        }

        if self.embedding.model.trim().is_empty() {
            panic!("embedding.model must not be empty");
        }
    }

    pub fn policy(&self) -> UpdatePolicy {
        UpdatePolicy::parse(&self.update_policy, self.update_days)
            .expect("validated at load time")
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Resolve the data directory: `$ZOTSEM_BASE_PATH` override, otherwise
    /// `~/.local/share/zotsem`.
    pub fn resolve_base_path() -> String {
        std::env::var("ZOTSEM_BASE_PATH").unwrap_or(format!(
            "{}/.local/share/zotsem",
            homedir::my_home()
                .expect("couldnt find home dir")
                .expect("couldnt find home dir")
                .to_string_lossy()
        ))
    }

    pub fn load() -> Self {
        Self::load_with(&Self::resolve_base_path())
    }

    pub fn load_with(base_path: &str) -> Self {
        let store = BackendLocal::new(base_path).expect("couldnt create data directory");

        // create new if does not exist
        if !store.exists("config.yaml") {
            store
                .write(
                    "config.yaml",
                    serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
                )
                .expect("couldnt write default config");
        }

        let config_str = String::from_utf8(store.read("config.yaml").expect("couldnt read config"))
            .expect("config file is not valid utf8");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let store = BackendLocal::new(&self.base_path).expect("couldnt create data directory");

        let config_str = serde_yml::to_string(&self).unwrap();
        store
            .write("config.yaml", config_str.as_bytes())
            .expect("couldnt write config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::provider::ProviderKind;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate();
        assert_eq!(config.policy(), UpdatePolicy::Manual);
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.embedding.provider, ProviderKind::Local);
    }

    #[test]
    fn load_creates_default_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_str().unwrap();

        let config = Config::load_with(base);
        assert!(dir.path().join("config.yaml").exists());
        assert_eq!(config.zotero_url, DEFAULT_ZOTERO_URL);
    }

    #[test]
    fn load_roundtrips_custom_fields() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_str().unwrap();

        let mut config = Config::load_with(base);
        config.update_policy = "every-n-days".to_string();
        config.update_days = 3;
        config.embedding.provider = ProviderKind::Openai;
        config.embedding.model = "text-embedding-3-small".to_string();
        config.save();

        let reloaded = Config::load_with(base);
        assert_eq!(reloaded.policy(), UpdatePolicy::EveryDays(3));
        assert_eq!(reloaded.embedding.provider, ProviderKind::Openai);
    }

    #[test]
    #[should_panic(expected = "update_policy")]
    fn invalid_policy_panics() {
        let config = Config {
            update_policy: "hourly".to_string(),
            ..Default::default()
        };
        config.validate();
    }

    #[test]
    #[should_panic(expected = "default_limit")]
    fn zero_limit_panics() {
        let config = Config {
            default_limit: 0,
            ..Default::default()
        };
        config.validate();
    }
}
