//! Command implementations.

mod distribute;
mod info;
mod status;
mod validate;

pub use distribute::run_distribute;
pub use info::run_info;
pub use status::run_status;
pub use validate::run_validate;

use anyhow::{Context, Result};
use contracts::DistributionBlueprint;
use std::path::Path;
use tracing::info;

/// Load and validate the blueprint at `path`
pub(crate) fn load_blueprint(path: &Path) -> Result<DistributionBlueprint> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    info!(
        config = %path.display(),
        connectors = blueprint.connectors.len(),
        variants = blueprint.templates.variants.len(),
        "Configuration loaded"
    );
    Ok(blueprint)
}
