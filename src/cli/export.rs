use std::path::Path;

use crate::{
    Res,
    cli::auth::access_token,
    config::Config,
    info,
    management::PlaylistExporter,
    spotify::client::SpotifyClient,
    success, warning,
};

pub async fn export(config: &Config, dir: &Path, playlist: Option<String>) -> Res<()> {
    let token = access_token(config).await?;
    let client = SpotifyClient::new(&config.api_url, token);
    let exporter = PlaylistExporter::new(&client, config.limits);

    match playlist {
        Some(name) => {
            let path = exporter.export_named(dir, &name).await?;
            success!("Exported '{}' to {}", name, path.display());
        }
        None => {
            let summary = exporter.export_all(dir).await?;
            info!("Export summary:");
            success!("Successfully exported: {} playlists", summary.exported.len());
            if !summary.failed.is_empty() {
                warning!("Failed to export: {} playlists", summary.failed.len());
            }
        }
    }
    Ok(())
}
