//! Host-facing display settings, rewritten only when the layout changes.

use livesync_core::{ArtifactUpdate, ChangeKind, PolledSnapshot, Projection};
use serde::Serialize;

use crate::layout::{DisplayInfo, DisplayLayout, Topology};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplaySettingsModel {
    pub topology: Topology,
    pub display_count: usize,
    pub displays: Vec<DisplayInfo>,
}

impl DisplaySettingsModel {
    pub fn primary(&self) -> Option<&DisplayInfo> {
        self.displays.iter().find(|d| d.is_primary)
    }
}

impl Projection for DisplaySettingsModel {
    type Payload = DisplayLayout;
    type Artifact = ();

    fn refresh(
        &mut self,
        snapshot: &PolledSnapshot<DisplayLayout>,
        change: ChangeKind,
        _artifact: ArtifactUpdate<()>,
    ) {
        // Everything here is keyed by the layout digest.
        if !change.is_changed() {
            return;
        }
        let layout = snapshot.payload();
        self.topology = layout.topology;
        self.display_count = layout.displays.len();
        self.displays.clone_from(&layout.displays);
        tracing::info!(
            topology = ?self.topology,
            displays = self.display_count,
            "display layout changed"
        );
    }
}
