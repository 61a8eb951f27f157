use clap::Parser;
use kbase_session::Cli;
use kbase_session::run_main;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_main(cli).await
}
