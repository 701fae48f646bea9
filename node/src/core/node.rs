use futures_util::StreamExt;

use crate::api::ApiListener;
use crate::block::manager::BlockManager;
use crate::core::api_cmd::ApiCmdProcessor;
use crate::core::builder::{NodeHandle, NodeInfo};
use crate::core::shutdown::ShutdownManager;

pub struct BlockManagerNode {
    pub(crate) node_info: NodeInfo,

    /// Owns the transaction queue, the roster, the chain state and the storage.
    pub(crate) block_manager: BlockManager,

    /// A component which listens API requests.
    pub(crate) api_listener: ApiListener,

    ///Interface to external Rust code
    pub(crate) node_handle: NodeHandle,

    /// A component which handles shutdown.
    pub(crate) shutdown_manager: Option<ShutdownManager>,
}

impl BlockManagerNode {
    ///Provides external api for Rust code to interact with the node.
    pub fn handle(&self) -> NodeHandle {
        self.node_handle.clone()
    }

    /// Main loop of the node.
    ///
    /// Timer ticks, API requests and shutdown are handled one at a time. A production cycle
    /// runs to completion before the next request is looked at, so transactions submitted
    /// meanwhile wait in the API channel and end up in the next block.
    pub async fn run(mut self) {
        log::info!("Starting block manager node {}", self.node_info);

        let mut shutdown_manager = match self.shutdown_manager.take() {
            Some(manager) => manager,
            None => {
                log::error!("Shutdown manager not set, node can't run");
                return;
            }
        };

        loop {
            tokio::select! {
                // PERIODIC BLOCK CONFIRMATION
                Some(()) = self.block_manager.next() => {
                    self.block_manager.confirm_block().await;
                }

                //PROCESSING EXTERNAL API REQUESTS
                api = self.api_listener.commands_rcv.recv() => {
                    match api {
                        Some(cmd) => {
                            if let Err(err) = ApiCmdProcessor::process_api_requests(&mut self.block_manager, cmd).await {
                                log::error!("Error processing api request: {:?}", err);
                            }
                        }
                        None => {
                            log::error!("Error: Api listener channel closed");
                            shutdown_manager.stop().await;
                            break;
                        }
                    }
                }

                //PROCESSING SHUTDOWN REQUEST
                _ = shutdown_manager.external_shutdown.recv() => {
                    log::info!("Shutting down block manager node");
                    shutdown_manager.stop().await;
                    break;
                }
            }
        }
    }
}
