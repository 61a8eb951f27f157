#![deny(clippy::unwrap_used, clippy::expect_used)]

use kbase_client::DocumentBackend;
use kbase_client::HttpClient;
use kbase_session::SessionConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SessionConfig::from_env()?;
    println!("base_url: {}", config.base_url);
    println!("path_style: {:?}", config.path_style);
    println!("user_agent: {}", config.user_agent);

    let client = HttpClient::new(config.base_url.clone())?
        .with_user_agent(config.user_agent.clone())
        .with_path_style(config.path_style);

    let files = tokio::time::timeout(config.list_timeout, client.list_files())
        .await
        .map_err(|_| anyhow::anyhow!("list timed out after {:?}", config.list_timeout))?
        .map_err(|e| anyhow::anyhow!("list failed: {e}"))?;
    println!("files: {}", files.len());
    for name in files {
        println!("  {name}");
    }
    Ok(())
}
