//! Host-facing media model.

use std::sync::Arc;

use livesync_core::{ArtifactUpdate, ChangeKind, PlaybackClock, PolledSnapshot, Projection};
use serde::Serialize;

use crate::client::{PlayerInfo, QueryResponse, TrackInfo};
use crate::palette::ColorSwatch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeStatus {
    #[default]
    Indifferent,
    Like,
    Dislike,
}

impl LikeStatus {
    /// Case-insensitive; anything unrecognized is `Indifferent`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LIKE" => Self::Like,
            "DISLIKE" => Self::Dislike,
            _ => Self::Indifferent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatState {
    #[default]
    None,
    All,
    One,
}

impl RepeatState {
    /// Case-insensitive; anything unrecognized is `None`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ALL" => Self::All,
            "ONE" => Self::One,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerState {
    pub is_running: bool,
    pub has_song: bool,
    pub is_paused: bool,
    pub volume_percent: f64,
    /// Seconds into the current track, interpolated between polls.
    pub seekbar_position: f64,
    /// `seekbar_position / duration`, 0 without a track.
    pub state_percent: f64,
    pub like_status: LikeStatus,
    pub repeat_type: RepeatState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackState {
    pub id: String,
    pub author: String,
    pub title: String,
    pub album: String,
    pub cover: String,
    pub duration: f64,
    pub url: String,
    pub is_video: bool,
    pub is_advertisement: bool,
    pub in_library: bool,
    pub colors: Option<Arc<ColorSwatch>>,
}

impl TrackState {
    fn describe(&mut self, track: &TrackInfo) {
        self.id.clone_from(&track.id);
        self.author.clone_from(&track.author);
        self.title.clone_from(&track.title);
        self.album.clone_from(&track.album);
        self.cover.clone_from(&track.cover);
        self.duration = track.duration.max(0.0);
        self.url.clone_from(&track.url);
        self.is_video = track.is_video;
        self.is_advertisement = track.is_advertisement;
        self.in_library = track.in_library;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaModel {
    pub player: PlayerState,
    pub track: TrackState,
    #[serde(skip)]
    clock: PlaybackClock,
}

impl MediaModel {
    fn update_player(&mut self, player: &PlayerInfo) {
        self.player.is_running = true;
        self.player.has_song = player.has_song;
        self.player.is_paused = player.is_paused;
        self.player.volume_percent = player.volume_percent;
        self.player.like_status = LikeStatus::parse(&player.like_status);
        self.player.repeat_type = RepeatState::parse(&player.repeat_type);
    }

    fn sync_clock(&mut self) {
        self.player.seekbar_position = self.clock.position_secs();
        self.player.state_percent = self.clock.ratio();
    }
}

impl Projection for MediaModel {
    type Payload = QueryResponse;
    type Artifact = ColorSwatch;

    fn refresh(
        &mut self,
        snapshot: &PolledSnapshot<QueryResponse>,
        change: ChangeKind,
        colors: ArtifactUpdate<ColorSwatch>,
    ) {
        let query = snapshot.payload();
        self.update_player(&query.player);

        match query.current_track() {
            Some(track) => {
                if change.is_changed() {
                    self.track.describe(track);
                }
                colors.apply_to(&mut self.track.colors);
            }
            None => self.track = TrackState::default(),
        }

        self.clock.sync(
            query.player.seekbar_current_position,
            self.track.duration,
            query.player.is_paused,
        );
        self.sync_clock();
    }

    fn interpolate(&mut self, delta_secs: f64) {
        if self.clock.advance(delta_secs) {
            self.sync_clock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livesync_core::{HandleAllocator, SourceHandle, SourceTarget};

    fn handle() -> SourceHandle {
        HandleAllocator::new().allocate(
            SourceTarget::Endpoint {
                url: "http://localhost:9863".into(),
                owner_pid: Some(1),
            },
            Default::default(),
        )
    }

    fn query(id: &str, position: f64, paused: bool) -> QueryResponse {
        QueryResponse {
            player: PlayerInfo {
                has_song: true,
                is_paused: paused,
                volume_percent: 50.0,
                seekbar_current_position: position,
                like_status: "like".into(),
                repeat_type: "one".into(),
                ..PlayerInfo::default()
            },
            track: Some(TrackInfo {
                id: id.into(),
                title: format!("title-{id}"),
                cover: format!("https://img/{id}.jpg"),
                duration: 200.0,
                ..TrackInfo::default()
            }),
        }
    }

    fn refresh(model: &mut MediaModel, q: QueryResponse, change: ChangeKind) {
        let snapshot = PolledSnapshot::new(&handle(), q);
        model.refresh(&snapshot, change, ArtifactUpdate::Keep);
    }

    #[test]
    fn parse_enums_case_insensitively() {
        assert_eq!(RepeatState::parse("all"), RepeatState::All);
        assert_eq!(RepeatState::parse("One"), RepeatState::One);
        assert_eq!(RepeatState::parse("shuffle"), RepeatState::None);
        assert_eq!(LikeStatus::parse("DISLIKE"), LikeStatus::Dislike);
        assert_eq!(LikeStatus::parse(""), LikeStatus::Indifferent);
    }

    #[test]
    fn changed_refresh_writes_track_and_player() {
        let mut m = MediaModel::default();
        refresh(&mut m, query("a", 10.0, false), ChangeKind::Changed);
        assert!(m.player.is_running);
        assert_eq!(m.player.repeat_type, RepeatState::One);
        assert_eq!(m.player.like_status, LikeStatus::Like);
        assert_eq!(m.track.title, "title-a");
        assert_eq!(m.player.seekbar_position, 10.0);
        assert!((m.player.state_percent - 0.05).abs() < 1e-12);
    }

    #[test]
    fn unchanged_refresh_keeps_track_fields() {
        let mut m = MediaModel::default();
        refresh(&mut m, query("a", 10.0, false), ChangeKind::Changed);
        let mut renamed = query("a", 20.0, false);
        if let Some(t) = renamed.track.as_mut() {
            t.title = "edited".into();
        }
        refresh(&mut m, renamed, ChangeKind::Unchanged);
        assert_eq!(m.track.title, "title-a");
        assert_eq!(m.player.seekbar_position, 20.0);
    }

    #[test]
    fn no_song_empties_track() {
        let mut m = MediaModel::default();
        refresh(&mut m, query("a", 10.0, false), ChangeKind::Changed);
        let mut idle = query("a", 0.0, false);
        idle.player.has_song = false;
        refresh(&mut m, idle, ChangeKind::Changed);
        assert_eq!(m.track, TrackState::default());
        assert!(m.player.is_running);
        assert_eq!(m.player.state_percent, 0.0);
    }

    #[test]
    fn interpolation_follows_pause() {
        let mut m = MediaModel::default();
        refresh(&mut m, query("a", 10.0, false), ChangeKind::Changed);
        m.interpolate(3.0);
        assert_eq!(m.player.seekbar_position, 13.0);
        assert!((m.player.state_percent - 0.065).abs() < 1e-12);

        refresh(&mut m, query("a", 13.5, true), ChangeKind::Unchanged);
        m.interpolate(3.0);
        assert_eq!(m.player.seekbar_position, 13.5);
    }

    #[test]
    fn colors_follow_artifact_update() {
        let mut m = MediaModel::default();
        let snapshot = PolledSnapshot::new(&handle(), query("a", 0.0, false));
        let swatch = Arc::new(ColorSwatch::default());
        m.refresh(
            &snapshot,
            ChangeKind::Changed,
            ArtifactUpdate::Replace(Some(Arc::clone(&swatch))),
        );
        assert!(m.track.colors.is_some());
        m.refresh(&snapshot, ChangeKind::Unchanged, ArtifactUpdate::Keep);
        assert!(m.track.colors.is_some());
        m.refresh(&snapshot, ChangeKind::Changed, ArtifactUpdate::Replace(None));
        assert!(m.track.colors.is_none());
    }

    #[test]
    fn default_is_empty_sentinel() {
        assert!(MediaModel::default().is_empty());
        let mut m = MediaModel::default();
        refresh(&mut m, query("a", 1.0, false), ChangeKind::Changed);
        assert!(!m.is_empty());
        m.reset();
        assert!(m.is_empty());
    }
}
