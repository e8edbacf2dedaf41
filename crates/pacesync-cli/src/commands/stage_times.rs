//! Stage times command handler

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pacesync_core::{
    Config, RaceStatQuery, StageTimesQuery, StageTimesReply, StageTimesRequest,
};

use crate::logging::init_logging;
use crate::output::Output;

/// Run the stage time query once and print the result
pub async fn query(
    config_path: Option<&PathBuf>,
    stage_id: i64,
    slot_id: i64,
    root: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config, None);

    let Some(install_root) = root.or(config.folder_path) else {
        bail!("No folder configured. Pass --root or run: pacesync config set folder_path <DIR>");
    };

    let request = StageTimesRequest { stage_id, slot_id };
    let reply =
        tokio::task::spawn_blocking(move || RaceStatQuery.stage_times(&request, &install_root))
            .await
            .context("Stage time query panicked")?;

    output.print_stage_times(&reply);
    match reply {
        StageTimesReply::Rows(_) => Ok(()),
        StageTimesReply::Failure { error } => bail!(error),
        StageTimesReply::Unavailable => {
            bail!("Could not read Cars.ini or the race statistics database (set PACESYNC_LOG=debug for details)")
        }
    }
}
