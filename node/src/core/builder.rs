use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use log::{error, info};
use tokio::task::JoinHandle;

use crate::{
    api::{http, ApiListener, BlockManagerApi},
    block::builder::BlockManagerBuilder,
    config::Configuration,
    core::{
        node::BlockManagerNode,
        shutdown::{Shutdown, ShutdownHandle, ShutdownManager},
    },
    engine::{http::HttpExecutionEngine, ExecutionEngine},
    storage::ChainDatabase,
};

#[cfg(feature = "rocksdb_storage")]
use crate::storage::rocksdb::RocksDbStorage;
#[cfg(feature = "sqlite_storage")]
use crate::storage::sqlite::SqliteStorage;

#[derive(Clone)]
pub(crate) struct NodeInfo {
    pub(crate) ip: String,
    pub(crate) http_port: u16,
    pub(crate) engine_url: String,
}

impl NodeInfo {
    pub(crate) fn new(config: &Configuration) -> Self {
        Self {
            ip: config.node.ip.clone(),
            http_port: config.http.port,
            engine_url: config.engine.url.clone(),
        }
    }

    pub(crate) fn api_address_http(&self) -> String {
        format!("http://{}:{}", self.ip, self.http_port)
    }
}

impl Display for NodeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "NodeInfo {{ ip: {}, http_port: {}, engine: {} }}",
            self.ip, self.http_port, self.engine_url
        )
    }
}

#[derive(Clone)]
pub struct NodeHandle {
    /// Block manager API
    pub api: BlockManagerApi,
    /// Node shutdown handle
    pub shutdown: ShutdownHandle,
}

pub struct NodeStarter {
    config: Configuration,
    node_info: NodeInfo,
    engine: Option<Arc<dyn ExecutionEngine>>,
    storage: Option<Box<dyn ChainDatabase>>,
    api_listener: ApiListener,
    api: BlockManagerApi,
}

impl NodeStarter {
    //Crate pure data structures, no resource allocation nor threads
    pub fn new(config: Configuration) -> anyhow::Result<Self> {
        config.validate()?;
        let node_info = NodeInfo::new(&config);
        let (api, api_listener) = BlockManagerApi::new();

        Ok(NodeStarter {
            config,
            node_info,
            engine: None,
            storage: None,
            api_listener,
            api,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_engine(self, engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            engine: Some(engine),
            ..self
        }
    }

    //opens database, connects the engine and spawns dependent tasks
    pub async fn init_tasks(self) -> anyhow::Result<BlockManagerNode> {
        info!("Initializing block manager tasks...");
        cfg_if::cfg_if! {
            if #[cfg(feature = "sqlite_storage")] {
                let mut starter = self.connect_sqlite()?;
            } else if #[cfg(feature = "rocksdb_storage")] {
                let mut starter = self.connect_rocksdb()?;
            } else {
                compile_error!("Must enable either sqlite or rocksdb feature");
            }
        };

        let engine = starter.connect_engine().await?;
        let storage = starter
            .storage
            .take()
            .ok_or_else(|| anyhow!("Database connection is not initialized"))?;

        let engine_timeout = Duration::from_secs(starter.config.engine.timeout_sec);
        let block_manager = BlockManagerBuilder::new(
            starter.config.block.clone(),
            starter.config.genesis.clone(),
            engine_timeout,
        )
        .build(storage, engine)
        .await?;

        let (mut shutdown_manager, shutdown_handle) = ShutdownManager::init();
        starter.start_tasks(&mut shutdown_manager)?;

        let node_handle = NodeHandle {
            api: starter.api,
            shutdown: shutdown_handle,
        };
        Ok(BlockManagerNode {
            node_info: starter.node_info,
            block_manager,
            api_listener: starter.api_listener,
            node_handle,
            shutdown_manager: Some(shutdown_manager),
        })
    }

    /// The engine must answer within `engine.timeout_sec` before anything else starts.
    async fn connect_engine(&mut self) -> anyhow::Result<Arc<dyn ExecutionEngine>> {
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => Arc::new(HttpExecutionEngine::new(self.config.engine.url.clone())),
        };
        info!("Connecting to execution engine at {}", self.config.engine.url);

        let timeout = Duration::from_secs(self.config.engine.timeout_sec);
        let reason = match tokio::time::timeout(timeout, engine.hello()).await {
            Ok(Ok(())) => return Ok(engine),
            Ok(Err(err)) => err.to_string(),
            Err(_) => format!("no answer within {timeout:?}"),
        };
        error!("Execution engine is unreachable: {reason}");
        Err(anyhow!(
            "Execution engine at {} is unreachable: {reason}",
            self.config.engine.url
        ))
    }

    fn start_tasks(&mut self, shutdown_manager: &mut ShutdownManager) -> anyhow::Result<()> {
        info!("Starting http server...");
        match self.start_http(shutdown_manager.subscribe()) {
            Ok(http_task) => {
                shutdown_manager.add_handle(http_task);
            }
            Err(err) => {
                error!("Failed to start http server: {}", err);
                return Err(err);
            }
        }
        Ok(())
    }

    fn start_http(&mut self, mut shutdown: Shutdown) -> anyhow::Result<JoinHandle<()>> {
        let http = http::init(&self.node_info, self.api.clone())?;

        let join_handle = tokio::spawn(async move {
            let server_handle = http.handle();

            tokio::select! {
                _ = shutdown.shutdown_signal_rcv.recv() => {
                    info!("Shutting down http server");
                    server_handle.stop(true).await;
                }
                http_stopped = http => {
                    match http_stopped {
                        Ok(_) => info!("Http server stopped unexpectedly"),
                        Err(e) => error!("Http server stopped with error: {}", e),
                    }
                }
            }
            info!("Http task finished");
        });
        Ok(join_handle)
    }

    //allocate database connection
    #[cfg(feature = "rocksdb_storage")]
    fn connect_rocksdb(mut self) -> anyhow::Result<Self> {
        info!("Opening database...");
        let database = RocksDbStorage::open(&self.config.storage)?;
        self.storage = Some(Box::new(database));
        Ok(self)
    }

    #[cfg(feature = "sqlite_storage")]
    fn connect_sqlite(mut self) -> anyhow::Result<Self> {
        info!("Opening database...");
        let database = SqliteStorage::open(&self.config.storage)?;
        self.storage = Some(Box::new(database));
        Ok(self)
    }
}

#[cfg(all(test, feature = "sqlite_storage"))]
mod test {
    use std::sync::atomic::Ordering;

    use crate::config::test::configuration;
    use crate::engine::mock::MockEngine;

    use super::*;

    fn config(dir: &tempfile::TempDir, port: u16) -> Configuration {
        let mut config = configuration();
        config.storage.sqlite_path = dir.path().join("chain.sqlite").display().to_string();
        config.http.port = port;
        config
    }

    #[tokio::test]
    async fn unreachable_engine_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());
        engine.unreachable.store(true, Ordering::SeqCst);

        let result = NodeStarter::new(config(&dir, 0))
            .unwrap()
            .with_engine(engine.clone())
            .init_tasks()
            .await;

        assert!(result.is_err());
        assert!(engine.invocations().is_empty());
    }

    #[tokio::test]
    async fn silent_engine_fails_startup_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());
        engine.hello_stalls.store(true, Ordering::SeqCst);
        let mut config = config(&dir, 0);
        config.engine.timeout_sec = 1;

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            NodeStarter::new(config)
                .unwrap()
                .with_engine(engine.clone())
                .init_tasks(),
        )
        .await
        .expect("startup should give up on a silent engine");

        assert!(result.is_err());
        assert!(engine.invocations().is_empty());
    }

    #[tokio::test]
    async fn node_serves_api_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());

        let node = NodeStarter::new(config(&dir, 0))
            .unwrap()
            .with_engine(engine.clone())
            .init_tasks()
            .await
            .unwrap();
        let mut handle = node.handle();
        let node_task = tokio::spawn(node.run());

        let genesis = handle.api.get_last_block().await.unwrap();
        assert_eq!(genesis.get_height(), 0);
        let status = handle.api.get_chain_status().await.unwrap();
        assert_eq!(status.last_block_hash, genesis.get_hash().to_string());

        handle.shutdown.shutdown();
        node_task.await.unwrap();
    }
}
