use std::collections::BTreeMap;

use livesync_core::{ArtifactUpdate, ChangeKind, PolledSnapshot, Projection};
use serde::Serialize;

use crate::pointer::FieldValue;
use crate::source::GameReading;

/// Host-facing game state: the configured fields by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameModel {
    pub process: String,
    pub resolution_epoch: u64,
    pub fields: BTreeMap<String, Option<FieldValue>>,
}

impl GameModel {
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).copied().flatten()
    }
}

impl Projection for GameModel {
    type Payload = GameReading;
    type Artifact = ();

    fn refresh(
        &mut self,
        snapshot: &PolledSnapshot<GameReading>,
        change: ChangeKind,
        _artifact: ArtifactUpdate<()>,
    ) {
        let reading = snapshot.payload();
        if change.is_changed() {
            self.process.clone_from(&reading.process);
            self.resolution_epoch = reading.epoch;
        }
        for (name, value) in &reading.values {
            self.fields.insert(name.clone(), *value);
        }
    }
}
