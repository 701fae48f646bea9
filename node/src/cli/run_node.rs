use std::path::PathBuf;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};

use crate::config::Configuration;
use crate::core::builder::NodeStarter;

#[derive(Debug, Clone, Parser)]
pub struct Cmd {
    #[clap(short, long)]
    pub config_file: String,
}

impl Cmd {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let conf = match Configuration::try_load(PathBuf::from(self.config_file.as_str())) {
            Ok(conf) => conf,
            Err(err) => anyhow::bail!("Error loading configuration file: {err:?}"),
        };

        let node = NodeStarter::new(conf)?.init_tasks().await?;

        let mut node_shutdown = node.handle().shutdown;

        let node_handle = tokio::spawn(node.run());

        let mut stream_int = signal(SignalKind::interrupt())?;
        let mut stream_term = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = stream_int.recv() => {
                node_shutdown.shutdown();
            }
            _ = stream_term.recv() => {
               node_shutdown.shutdown();
            }
        }

        //Wait until the node stopped
        node_handle.await?;
        Ok(())
    }
}
