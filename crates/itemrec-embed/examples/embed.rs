use itemrec_core::config::Config;
use itemrec_embed::get_default_embedder;

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let embedder = get_default_embedder(&settings.embedding)?;
    let texts = vec!["solid oak dining table".to_string(), "black leather sofa".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("id={} B={} dim={}", embedder.embedder_id(), embs.len(), embedder.dim());
    Ok(())
}
