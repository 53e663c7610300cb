//! livesync-source-media: the YouTube Music Desktop player as a live source.
//! Polls the app's local `/query` endpoint while the app process runs and
//! derives a color swatch from each new album cover.

pub mod artwork;
pub mod client;
pub mod config;
pub mod model;
pub mod palette;
pub mod source;

use livesync_engine::{EngineConfig, SyncEngine};
use livesync_process::{ProcessLister, ProcessMatcher, SysinfoProcessLister};

pub use artwork::AlbumArtDeriver;
pub use client::{MediaClient, QueryResponse};
pub use config::MediaConfig;
pub use model::{LikeStatus, MediaModel, PlayerState, RepeatState, TrackState};
pub use palette::{ColorSwatch, Rgb, Variation};
pub use source::MediaSource;

pub type MediaEngine<L = SysinfoProcessLister> = SyncEngine<MediaSource<L>, AlbumArtDeriver, MediaModel>;

/// Wire a media engine from configuration.
pub fn build_engine<L: ProcessLister>(
    media: &MediaConfig,
    engine: EngineConfig,
    lister: L,
) -> Result<MediaEngine<L>, reqwest::Error> {
    let client = MediaClient::new(&media.endpoint, media.query_timeout())?;
    let mut source = MediaSource::new(client, lister, ProcessMatcher::new(&media.process_names));
    if !media.require_process {
        source = source.without_process_check();
    }
    let deriver = AlbumArtDeriver::new(media.artwork_timeout(), media.max_colors)?
        .with_ignore_limits(media.ignore_limits);
    Ok(SyncEngine::new(source, deriver, engine))
}
