//! livesync-source-game: values read from a running game's memory.
//! The process is found by image name, its memory opened once per instance,
//! pointer chains re-resolved every couple of seconds and fields read on the
//! data cadence.

pub mod config;
pub mod memory;
pub mod model;
pub mod pointer;
pub mod source;

use livesync_engine::{EngineConfig, NoDerived, SyncEngine};
use livesync_process::{ProcessLister, ProcessMatcher, SysinfoProcessLister};

pub use config::GameConfig;
pub use memory::{MemoryOpener, NativeOpener, ProcessMemory};
pub use model::GameModel;
pub use pointer::{FieldKind, FieldSpec, FieldValue, PointerChain};
pub use source::{GameReading, GameSource};

pub type GameEngine<L = SysinfoProcessLister, O = NativeOpener> =
    SyncEngine<GameSource<L, O>, NoDerived, GameModel>;

/// Wire a game engine from configuration. The game's resolution cadence
/// applies unless the engine section sets its own.
pub fn build_engine<L: ProcessLister, O: MemoryOpener>(
    game: &GameConfig,
    mut engine: EngineConfig,
    lister: L,
    opener: O,
) -> GameEngine<L, O> {
    engine.resolve_interval_ms.get_or_insert(game.resolve_interval_ms);
    let source = GameSource::new(
        lister,
        ProcessMatcher::new(&game.process_names),
        opener,
        game.fields.clone(),
    );
    SyncEngine::new(source, NoDerived, engine)
}
