//! Activation and deactivation of the rule artifact.

use crate::masking::MaskControl;

/// Sync the rule artifact with the loaded configuration.
pub fn activate(control: &MaskControl) {
    match control.activate() {
        Some(report) => tracing::info!(
            path = %report.path.display(),
            block = report.block_written,
            "Path masking activated"
        ),
        None if control.artifact().is_none() => {
            tracing::info!("Path masking activated (no rule artifact configured)")
        }
        None => tracing::warn!("Path masking activated without a synced rule artifact"),
    }
}

/// Strip the rule block on shutdown when the live config asks for it.
pub fn deactivate(control: &MaskControl) {
    if !control.remove_on_shutdown() {
        return;
    }
    if let Some(report) = control.deactivate() {
        tracing::info!(path = %report.path.display(), "Path masking deactivated");
    }
}
