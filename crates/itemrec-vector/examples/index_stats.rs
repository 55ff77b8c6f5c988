use itemrec_core::config::Config;
use itemrec_vector::RemoteIndexClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let Some(client) = RemoteIndexClient::from_settings(&settings.remote)? else {
        println!("remote.host is not set");
        return Ok(());
    };
    let stats = client.describe_stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
