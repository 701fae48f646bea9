use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

//node settings
pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 9000;

//execution engine settings
pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:9100";
pub const DEFAULT_ENGINE_TIMEOUT_SEC: u64 = 30;

//block settings
pub const DEFAULT_CONFIRM_INTERVAL_SEC: u64 = 10;
pub const DEFAULT_BLOCKS_PER_LEADER: u64 = 10;
pub const DEFAULT_LEADER: &str = "hx0000000000000000000000000000000000000001";

const BLOCK_MANAGER_DIR_NAME: &str = ".tbears-block-manager";
const BLOCK_MANAGER_CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration file exists: '{0}'")]
    AlreadyExists(String),
    #[error("Configuration file does not exist: '{0}'")]
    NotFound(String),
    #[error("Failed to parse configuration: {0}")]
    ParsingFailed(#[from] config::ConfigError),
    #[error("Failed to serialize configuration: {0}")]
    SerializationFailed(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Unable to locate home directory")]
    NoHomeDir,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub node: NodeConfiguration,
    pub storage: DatabaseConfiguration,
    pub http: HttpConfiguration,
    pub engine: EngineConfiguration,
    pub block: BlockManagerConfiguration,
    #[serde(default)]
    pub genesis: GenesisConfiguration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfiguration {
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfiguration {
    pub rocksdb_path: String,
    pub sqlite_path: String,
    pub create_if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfiguration {
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfiguration {
    /// JSON-RPC endpoint of the execution engine
    pub url: String,
    /// Upper bound for a single engine call. Expiry aborts the cycle.
    pub timeout_sec: u64,
}

/// Sender/recipient pair which marks a transaction as a block confirmation trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugTransaction {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockManagerConfiguration {
    /// Interval between periodic block confirmations
    pub confirm_interval_sec: u64,
    /// Produce blocks even when there are no pending transactions
    pub confirm_empty_blocks: bool,
    /// Confirm blocks only when the debug transaction arrives, no timer
    pub manual_confirm: bool,
    pub debug_transaction: Option<DebugTransaction>,
    pub leader_rotation: bool,
    pub blocks_per_leader: u64,
    /// Initial roster, head is the first generator
    pub preps: Vec<String>,
    /// Generator used while the roster is empty
    pub default_leader: String,
    /// Put transactions of an aborted cycle back to the queue instead of dropping them
    pub requeue_on_abort: bool,
}

impl Default for BlockManagerConfiguration {
    fn default() -> Self {
        Self {
            confirm_interval_sec: DEFAULT_CONFIRM_INTERVAL_SEC,
            confirm_empty_blocks: true,
            manual_confirm: false,
            debug_transaction: None,
            leader_rotation: false,
            blocks_per_leader: DEFAULT_BLOCKS_PER_LEADER,
            preps: vec![],
            default_leader: DEFAULT_LEADER.to_string(),
            requeue_on_abort: false,
        }
    }
}

impl BlockManagerConfiguration {
    pub fn is_debug_transaction(&self, from: Option<&str>, to: Option<&str>) -> bool {
        match (&self.debug_transaction, from, to) {
            (Some(debug), Some(from), Some(to)) => debug.from == from && debug.to == to,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub name: String,
    pub address: String,
    pub balance: String,
}

/// Initial state carried by the genesis transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisConfiguration {
    pub accounts: Vec<GenesisAccount>,
    pub message: String,
}

impl Default for GenesisConfiguration {
    fn default() -> Self {
        Self {
            accounts: vec![
                GenesisAccount {
                    name: "genesis".to_string(),
                    address: "hx0000000000000000000000000000000000000000".to_string(),
                    balance: "0x2961fff8ca4a62327800000".to_string(),
                },
                GenesisAccount {
                    name: "fee_treasury".to_string(),
                    address: "hx1000000000000000000000000000000000000000".to_string(),
                    balance: "0x0".to_string(),
                },
            ],
            message: "genesis block of a local development chain".to_string(),
        }
    }
}

impl Configuration {
    pub fn try_load<I: Into<PathBuf>>(path: I) -> Result<Configuration> {
        let path = path.into();
        if !path.exists() {
            return Err(ConfigurationError::NotFound(path.display().to_string()));
        }
        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;

        let configuration: Configuration = config.try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn try_load_from_home_dir(node_name: &str) -> Result<Configuration> {
        let file_path = Self::config_file(node_name)?;
        Self::try_load(file_path)
    }

    pub fn try_write<I: Into<PathBuf>>(&self, path: I) -> Result<()> {
        let path = path.into();
        if path.exists() {
            return Err(ConfigurationError::AlreadyExists(
                path.display().to_string(),
            ));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config = toml::to_string(&self)?;
        let config = format!(
            "#This file is generated by cli and can be edited before starting the node\n{config}",
        );

        let mut file = std::fs::File::create(path)?;
        file.write_all(config.as_bytes())?;
        Ok(())
    }

    pub fn try_write_home_dir(&self, node_name: &str) -> Result<()> {
        let file_path = Self::config_file(node_name)?;
        self.try_write(file_path)
    }

    pub fn block_manager_root_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(BLOCK_MANAGER_DIR_NAME))
            .ok_or(ConfigurationError::NoHomeDir)
    }

    pub fn config_file(node_name: &str) -> Result<PathBuf> {
        Ok(Self::block_manager_root_dir()?
            .join(node_name)
            .join(BLOCK_MANAGER_CONFIG_FILE))
    }

    /// Rejects combinations the block manager can't run with.
    pub fn validate(&self) -> Result<()> {
        let block = &self.block;
        if block.manual_confirm && block.debug_transaction.is_none() {
            return Err(ConfigurationError::Invalid(
                "manual block confirmation requires block.debug_transaction".to_string(),
            ));
        }
        if !block.manual_confirm && block.confirm_interval_sec == 0 {
            return Err(ConfigurationError::Invalid(
                "block.confirm_interval_sec must be positive".to_string(),
            ));
        }
        if block.leader_rotation && block.blocks_per_leader == 0 {
            return Err(ConfigurationError::Invalid(
                "block.blocks_per_leader must be positive when leader rotation is enabled"
                    .to_string(),
            ));
        }
        if block.default_leader.is_empty() {
            return Err(ConfigurationError::Invalid(
                "block.default_leader must not be empty".to_string(),
            ));
        }
        if self.engine.url.is_empty() {
            return Err(ConfigurationError::Invalid(
                "engine.url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use assert_matches::assert_matches;

    use super::*;

    pub(crate) fn configuration() -> Configuration {
        Configuration {
            node: NodeConfiguration {
                ip: DEFAULT_LISTEN_ADDRESS.to_string(),
            },
            storage: DatabaseConfiguration {
                rocksdb_path: "/tmp/rocksdb".to_string(),
                sqlite_path: "/tmp/block_manager.sqlite".to_string(),
                create_if_not_exists: true,
            },
            http: HttpConfiguration {
                port: DEFAULT_HTTP_PORT,
            },
            engine: EngineConfiguration {
                url: DEFAULT_ENGINE_URL.to_string(),
                timeout_sec: DEFAULT_ENGINE_TIMEOUT_SEC,
            },
            block: BlockManagerConfiguration::default(),
            genesis: GenesisConfiguration::default(),
        }
    }

    #[test]
    fn default_configuration_is_valid() {
        assert!(configuration().validate().is_ok());
    }

    #[test]
    fn manual_confirm_requires_debug_transaction() {
        let mut config = configuration();
        config.block.manual_confirm = true;
        assert_matches!(config.validate(), Err(ConfigurationError::Invalid(_)));

        config.block.debug_transaction = Some(DebugTransaction {
            from: "hxa".to_string(),
            to: "hxb".to_string(),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rotation_requires_positive_quota() {
        let mut config = configuration();
        config.block.leader_rotation = true;
        config.block.blocks_per_leader = 0;
        assert_matches!(config.validate(), Err(ConfigurationError::Invalid(_)));
    }

    #[test]
    fn periodic_mode_requires_interval() {
        let mut config = configuration();
        config.block.confirm_interval_sec = 0;
        assert_matches!(config.validate(), Err(ConfigurationError::Invalid(_)));

        config.block.manual_confirm = true;
        config.block.debug_transaction = Some(DebugTransaction {
            from: "hxa".to_string(),
            to: "hxb".to_string(),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_transaction_matches_exact_pair() {
        let mut block = BlockManagerConfiguration::default();
        assert!(!block.is_debug_transaction(Some("hxa"), Some("hxb")));

        block.debug_transaction = Some(DebugTransaction {
            from: "hxa".to_string(),
            to: "hxb".to_string(),
        });
        assert!(block.is_debug_transaction(Some("hxa"), Some("hxb")));
        assert!(!block.is_debug_transaction(Some("hxb"), Some("hxa")));
        assert!(!block.is_debug_transaction(Some("hxa"), None));
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node").join("config.toml");
        let mut config = configuration();
        config.block.preps = vec!["V0".to_string(), "V1".to_string()];

        config.try_write(&path).unwrap();
        let loaded = Configuration::try_load(&path).unwrap();

        assert_eq!(loaded, config);
        assert_matches!(
            config.try_write(&path),
            Err(ConfigurationError::AlreadyExists(_))
        );
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            Configuration::try_load(dir.path().join("missing.toml")),
            Err(ConfigurationError::NotFound(_))
        );
    }
}
