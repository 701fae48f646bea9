use clap::Parser;

pub mod init;
pub mod run_node;

#[derive(Parser, Debug, Clone)]
#[command()]
pub struct Cli {
    #[command(subcommand)]
    pub subcommand: Subcommand,
}

#[derive(Clone, Debug, clap::Subcommand)]
pub enum Subcommand {
    Init(init::Cmd),
    RunNode(run_node::Cmd),
}

impl Cli {
    pub async fn execute(self) -> anyhow::Result<()> {
        match self.subcommand {
            Subcommand::Init(init) => init.execute(),
            Subcommand::RunNode(run_node) => run_node.execute().await,
        }
    }
}
