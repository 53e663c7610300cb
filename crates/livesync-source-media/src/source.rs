//! The desktop player as an [`ExternalSource`].

use livesync_core::{FetchError, PolledSnapshot, SourceHandle, SourceTarget};
use livesync_engine::ExternalSource;
use livesync_process::{ProcessLister, ProcessMatcher};

use crate::client::{MediaClient, QueryResponse};

pub struct MediaSource<L> {
    client: MediaClient,
    lister: L,
    matcher: ProcessMatcher,
    require_process: bool,
}

impl<L: ProcessLister> MediaSource<L> {
    pub fn new(client: MediaClient, lister: L, matcher: ProcessMatcher) -> Self {
        Self {
            client,
            lister,
            matcher,
            require_process: true,
        }
    }

    /// Skip the process check and treat the endpoint as always present.
    #[must_use]
    pub fn without_process_check(mut self) -> Self {
        self.require_process = false;
        self
    }
}

impl<L: ProcessLister> ExternalSource for MediaSource<L> {
    type Payload = QueryResponse;

    fn name(&self) -> &str {
        "media"
    }

    fn discover(&mut self) -> Option<SourceTarget> {
        let owner_pid = if self.require_process {
            Some(self.matcher.find(&mut self.lister)?.pid)
        } else {
            None
        };
        Some(SourceTarget::Endpoint {
            url: self.client.base_url().to_string(),
            owner_pid,
        })
    }

    async fn fetch_snapshot(
        &mut self,
        handle: &SourceHandle,
    ) -> Result<PolledSnapshot<QueryResponse>, FetchError> {
        let query = self.client.query().await?;
        let track = query.current_track();
        let identity = track.map(|t| t.id.clone()).filter(|id| !id.is_empty());
        let cover = track.map(|t| t.cover.clone());

        let mut snapshot = PolledSnapshot::new(handle, query);
        if let Some(id) = identity {
            snapshot = snapshot.with_identity(id);
        }
        if let Some(cover) = cover {
            snapshot = snapshot.with_derived_key(cover);
        }
        Ok(snapshot)
    }
}
