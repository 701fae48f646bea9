use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;

use crate::config::{
    BlockManagerConfiguration, Configuration, ConfigurationError, DatabaseConfiguration,
    DebugTransaction, EngineConfiguration, GenesisConfiguration, HttpConfiguration,
    NodeConfiguration, DEFAULT_BLOCKS_PER_LEADER, DEFAULT_CONFIRM_INTERVAL_SEC,
    DEFAULT_ENGINE_TIMEOUT_SEC, DEFAULT_ENGINE_URL, DEFAULT_HTTP_PORT, DEFAULT_LEADER,
    DEFAULT_LISTEN_ADDRESS,
};

#[derive(Debug, Clone, Parser)]
pub struct Cmd {
    #[arg(long, default_value = "default")]
    pub node_name: String,
    #[clap(long, default_value = DEFAULT_LISTEN_ADDRESS)]
    pub ip: String,
    #[clap(long, default_value_t = DEFAULT_HTTP_PORT)]
    pub http_api_port: u16,
    #[clap(long, default_value = DEFAULT_ENGINE_URL)]
    pub engine_url: String,
    #[clap(long, default_value_t = DEFAULT_ENGINE_TIMEOUT_SEC)]
    pub engine_timeout_sec: u64,
    #[clap(long, default_value_t = DEFAULT_CONFIRM_INTERVAL_SEC)]
    pub confirm_interval_sec: u64,
    /// Skip blocks when there are no pending transactions
    #[clap(long)]
    pub skip_empty_blocks: bool,
    /// Confirm blocks only when the debug transaction arrives
    #[clap(long)]
    pub manual_confirm: bool,
    #[clap(long, requires = "debug_to")]
    pub debug_from: Option<String>,
    #[clap(long, requires = "debug_from")]
    pub debug_to: Option<String>,
    #[clap(long)]
    pub leader_rotation: bool,
    #[clap(long, default_value_t = DEFAULT_BLOCKS_PER_LEADER)]
    pub blocks_per_leader: u64,
    /// Initial validator roster, first entry produces first
    #[clap(long, value_delimiter = ',')]
    pub preps: Vec<String>,
    #[clap(long, default_value = DEFAULT_LEADER)]
    pub default_leader: String,
    #[clap(long)]
    pub requeue_on_abort: bool,
}

impl Cmd {
    pub fn execute(self) -> anyhow::Result<()> {
        let path = Configuration::block_manager_root_dir()?.join(&self.node_name);
        match Configuration::try_load_from_home_dir(&self.node_name) {
            Err(ConfigurationError::NotFound(_)) => {}
            _ => {
                return Err(anyhow!(
                    "Configuration already exists for node '{}' in {path:?}",
                    self.node_name
                ))
            }
        }
        println!("Creating block manager node configuration in: {path:?}",);

        let configuration = self.configuration(&path)?;
        configuration.validate()?;

        let db_dir = path.join("db");
        std::fs::create_dir_all(db_dir.join("rocksdb"))?;

        configuration.try_write_home_dir(&self.node_name)?;
        println!("Configuration: {configuration:?}",);
        Ok(())
    }

    fn configuration(&self, path: &std::path::Path) -> anyhow::Result<Configuration> {
        let db_dir = path.join("db");
        let rocksdb_path = path_to_string(db_dir.join("rocksdb"))?;
        let sqlite_path = path_to_string(db_dir.join("block_manager.sqlite"))?;

        let debug_transaction = match (&self.debug_from, &self.debug_to) {
            (Some(from), Some(to)) => Some(DebugTransaction {
                from: from.clone(),
                to: to.clone(),
            }),
            _ => None,
        };

        Ok(Configuration {
            node: NodeConfiguration {
                ip: self.ip.clone(),
            },
            storage: DatabaseConfiguration {
                rocksdb_path,
                sqlite_path,
                create_if_not_exists: true,
            },
            http: HttpConfiguration {
                port: self.http_api_port,
            },
            engine: EngineConfiguration {
                url: self.engine_url.clone(),
                timeout_sec: self.engine_timeout_sec,
            },
            block: BlockManagerConfiguration {
                confirm_interval_sec: self.confirm_interval_sec,
                confirm_empty_blocks: !self.skip_empty_blocks,
                manual_confirm: self.manual_confirm,
                debug_transaction,
                leader_rotation: self.leader_rotation,
                blocks_per_leader: self.blocks_per_leader,
                preps: self.preps.clone(),
                default_leader: self.default_leader.clone(),
                requeue_on_abort: self.requeue_on_abort,
            },
            genesis: GenesisConfiguration::default(),
        })
    }
}

fn path_to_string(path: PathBuf) -> anyhow::Result<String> {
    path.into_os_string()
        .into_string()
        .map_err(|path| anyhow!("Path is not valid UTF-8: {path:?}"))
}
