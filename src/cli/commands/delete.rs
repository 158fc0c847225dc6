//! Delete command implementation.

use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the delete command.
pub async fn run_delete(guid: &str, settings: Settings) -> Result<()> {
    let store = super::build_store(&settings)?;

    if store.delete_episode(guid).await? {
        Output::success(&format!("Deleted episode '{}' and its chunks.", guid));
    } else {
        Output::warning(&format!("No episode found with guid '{}'.", guid));
    }

    Ok(())
}
