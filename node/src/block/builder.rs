use std::sync::Arc;
use std::time::Duration;

use futures_timer::Delay;
use log::{debug, info, warn};

use crate::block::manager::{BlockChainState, BlockManager};
use crate::block::producer::BlockProducer;
use crate::block::roster::ValidatorRoster;
use crate::config::{BlockManagerConfiguration, GenesisConfiguration};
use crate::engine::ExecutionEngine;
use crate::storage::ChainDatabase;

pub(crate) struct BlockManagerBuilder {
    config: BlockManagerConfiguration,
    block_producer: BlockProducer,
    engine_timeout: Duration,
}

impl BlockManagerBuilder {
    pub(crate) fn new(
        config: BlockManagerConfiguration,
        genesis: GenesisConfiguration,
        engine_timeout: Duration,
    ) -> Self {
        Self {
            config,
            block_producer: BlockProducer::new(genesis),
            engine_timeout,
        }
    }

    /// Resumes from the last stored block and its roster, or commits genesis through the engine on an empty chain.
    pub(crate) async fn build(
        self,
        storage: Box<dyn ChainDatabase>,
        engine: Arc<dyn ExecutionEngine>,
    ) -> anyhow::Result<BlockManager> {
        let most_recent_block = storage.get_last_block()?;
        let delay = Delay::new(Duration::from_secs(self.config.confirm_interval_sec));

        let mut block_manager = BlockManager {
            block_chain_state: BlockChainState::new(&self.config),
            config: self.config,
            block_producer: self.block_producer,
            engine,
            storage,
            engine_timeout: self.engine_timeout,
            delay,
        };

        match most_recent_block {
            Some(block) => {
                debug!("Most recent block: {}", block);
                match block_manager.storage.get_roster_state()? {
                    Some(state) => {
                        debug!("Restoring roster: {:?}", state);
                        block_manager.block_chain_state.roster =
                            ValidatorRoster::restore(&block_manager.config, state);
                    }
                    None => warn!("No stored roster, starting from configured preps"),
                }
                block_manager.block_chain_state.last_committed_block = Some(block);
            }
            None => {
                info!("No last block found in database. Creating genesis block.");
                let genesis = block_manager.bootstrap().await?;
                info!("Genesis block committed: {}", genesis);
            }
        }
        Ok(block_manager)
    }
}
