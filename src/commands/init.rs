use crate::commands::Out;
use crate::memory::MerchantMap;
use crate::Config;
use crate::Result;
use std::path::Path;

/// Creates the home directory, its `.backups` subdirectory, `config.json` with default settings
/// and an empty merchant map.
///
/// # Arguments
/// - `spendwise_home` - The directory that will be the root of the data directory, e.g.
///   `$HOME/spendwise`
///
/// # Errors
/// - Returns an error if any file operations fail, or if an existing config or merchant map is
///   invalid.
pub async fn init(spendwise_home: &Path) -> Result<Out<()>> {
    let config = Config::create(spendwise_home).await?;
    let map = MerchantMap::from_config(&config).await?;
    Ok(format!(
        "Initialized {} with {} known merchants in {}",
        config.root().display(),
        map.len(),
        map.path().display()
    )
    .into())
}
