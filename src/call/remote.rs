use crate::session::{StreamId, StreamInfo, SurfaceId};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Subscribing,
    Live,
}

/// A remote stream and the surface it renders into
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteView {
    pub stream: StreamInfo,
    pub surface: SurfaceId,
    pub status: RemoteStatus,
}

/// Remote video surfaces, at most one per stream id
#[derive(Debug, Clone, Default)]
pub struct RemoteStreams {
    views: BTreeMap<StreamId, RemoteView>,
}

impl RemoteStreams {
    /// Add a surface for a new stream. Returns false if the stream already has one.
    pub fn insert(&mut self, stream: StreamInfo) -> bool {
        if self.views.contains_key(&stream.stream_id) {
            return false;
        }
        let surface = SurfaceId::for_stream(&stream.stream_id);
        self.views.insert(
            stream.stream_id.clone(),
            RemoteView {
                stream,
                surface,
                status: RemoteStatus::Subscribing,
            },
        );
        true
    }

    pub fn mark_live(&mut self, stream_id: &StreamId) -> bool {
        match self.views.get_mut(stream_id) {
            Some(view) => {
                view.status = RemoteStatus::Live;
                true
            }
            None => false,
        }
    }

    /// Remove the surface for `stream_id`, if there is one
    pub fn remove(&mut self, stream_id: &StreamId) -> Option<RemoteView> {
        self.views.remove(stream_id)
    }

    pub fn get(&self, stream_id: &StreamId) -> Option<&RemoteView> {
        self.views.get(stream_id)
    }

    pub fn views(&self) -> impl Iterator<Item = &RemoteView> {
        self.views.values()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
