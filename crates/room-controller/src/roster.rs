//! Participant roster - the single source of truth for room membership and
//! per-participant flags.
//!
//! The registry is an arena of records addressed by participant id. Every
//! mutation touches exactly one record or leaves the registry unchanged, so
//! readers never observe a partially applied update. Display ordering is a
//! policy of the read path ([`list`](ParticipantRegistry::list)), not of
//! storage.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaStream;

/// Roster mutation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A participant with this id is already present.
    #[error("participant already in roster: {0}")]
    DuplicateId(String),

    /// No participant with this id.
    #[error("participant not found: {0}")]
    NotFound(String),

    /// The configured participant cap was reached.
    #[error("roster at capacity ({0})")]
    CapacityExceeded(usize),
}

/// One roster entry.
///
/// `stream` is a display reference to a stream owned elsewhere (the media
/// controller for the local entry, the transport for remote ones); the
/// registry never starts or stops tracks.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Opaque id, unique within the roster, stable for the session.
    pub id: String,
    /// User-supplied display name.
    pub nickname: String,
    /// Host privilege, immutable after join.
    pub is_host: bool,
    pub is_muted: bool,
    pub is_camera_on: bool,
    pub is_screen_sharing: bool,
    /// Set once at roster insertion.
    pub joined_at: DateTime<Utc>,
    /// Display handle to the participant's current stream, if any.
    pub stream: Option<MediaStream>,
}

impl Participant {
    /// Create an entry with all capability flags off.
    #[must_use]
    pub fn new(id: impl Into<String>, nickname: impl Into<String>, is_host: bool) -> Self {
        Self {
            id: id.into(),
            nickname: nickname.into(),
            is_host,
            is_muted: false,
            is_camera_on: false,
            is_screen_sharing: false,
            joined_at: Utc::now(),
            stream: None,
        }
    }

    /// Serializable snapshot without the stream handle.
    #[must_use]
    pub fn to_info(&self) -> ParticipantInfo {
        ParticipantInfo {
            id: self.id.clone(),
            nickname: self.nickname.clone(),
            is_host: self.is_host,
            is_muted: self.is_muted,
            is_camera_on: self.is_camera_on,
            is_screen_sharing: self.is_screen_sharing,
            joined_at: self.joined_at,
        }
    }
}

/// Snapshot of a roster entry for rendering and signaling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: String,
    pub nickname: String,
    pub is_host: bool,
    pub is_muted: bool,
    pub is_camera_on: bool,
    pub is_screen_sharing: bool,
    pub joined_at: DateTime<Utc>,
}

/// Partial boolean-flag merge for one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagUpdate {
    pub muted: Option<bool>,
    pub camera_on: Option<bool>,
    pub screen_sharing: Option<bool>,
}

impl FlagUpdate {
    #[must_use]
    pub fn muted(value: bool) -> Self {
        Self {
            muted: Some(value),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn camera_on(value: bool) -> Self {
        Self {
            camera_on: Some(value),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn screen_sharing(value: bool) -> Self {
        Self {
            screen_sharing: Some(value),
            ..Self::default()
        }
    }
}

/// Arena of participant records addressed by id.
pub struct ParticipantRegistry {
    entries: HashMap<String, Participant>,
    /// Join order, for display of non-local entries.
    order: Vec<String>,
    local_id: Option<String>,
    capacity: usize,
}

impl ParticipantRegistry {
    /// Create an empty registry bounded at `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            local_id: None,
            capacity,
        }
    }

    /// Insert or fully replace the local user's entry.
    ///
    /// At most one local entry exists; replacing it under a new id removes
    /// the previous record.
    pub fn upsert_local(&mut self, participant: Participant) {
        if let Some(previous) = self.local_id.take() {
            if previous != participant.id {
                self.entries.remove(&previous);
                self.order.retain(|id| *id != previous);
            }
        }
        self.local_id = Some(participant.id.clone());
        if !self.order.contains(&participant.id) {
            self.order.push(participant.id.clone());
        }
        self.entries.insert(participant.id.clone(), participant);
    }

    /// Insert a remote participant.
    ///
    /// # Errors
    ///
    /// `DuplicateId` if the id is already present, `CapacityExceeded` if the
    /// roster is full. The registry is unchanged on error.
    pub fn insert(&mut self, participant: Participant) -> Result<(), RegistryError> {
        if self.entries.contains_key(&participant.id) {
            return Err(RegistryError::DuplicateId(participant.id));
        }
        if self.entries.len() >= self.capacity {
            return Err(RegistryError::CapacityExceeded(self.capacity));
        }
        self.order.push(participant.id.clone());
        self.entries.insert(participant.id.clone(), participant);
        Ok(())
    }

    /// Merge flag changes into the matching entry.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is absent; the registry is unchanged.
    pub fn update_flags(
        &mut self,
        id: &str,
        update: FlagUpdate,
    ) -> Result<ParticipantInfo, RegistryError> {
        let participant = self
            .entries
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if let Some(muted) = update.muted {
            participant.is_muted = muted;
        }
        if let Some(camera_on) = update.camera_on {
            participant.is_camera_on = camera_on;
        }
        if let Some(screen_sharing) = update.screen_sharing {
            participant.is_screen_sharing = screen_sharing;
        }
        Ok(participant.to_info())
    }

    /// Delete an entry. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: &str) -> Option<Participant> {
        let removed = self.entries.remove(id)?;
        self.order.retain(|entry| entry != id);
        if self.local_id.as_deref() == Some(id) {
            self.local_id = None;
        }
        Some(removed)
    }

    /// Attach or clear the display stream reference for an entry.
    ///
    /// The caller is responsible for stopping device-owned tracks before
    /// displacement; the registry only swaps the reference.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is absent.
    pub fn set_stream(
        &mut self,
        id: &str,
        stream: Option<MediaStream>,
    ) -> Result<(), RegistryError> {
        let participant = self
            .entries
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        participant.stream = stream;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.entries.get(id)
    }

    /// The local user's entry, if present.
    #[must_use]
    pub fn local(&self) -> Option<&Participant> {
        self.local_id.as_deref().and_then(|id| self.entries.get(id))
    }

    #[must_use]
    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// Lazy, restartable display-ordered sequence: local user first, then
    /// hosts, then remaining participants in join order.
    pub fn list(&self) -> impl Iterator<Item = &Participant> + '_ {
        let local = self.local_id.as_deref();
        let local_entry = local.and_then(|id| self.entries.get(id));
        let hosts = self
            .order
            .iter()
            .filter_map(move |id| self.entries.get(id))
            .filter(move |p| p.is_host && Some(p.id.as_str()) != local);
        let rest = self
            .order
            .iter()
            .filter_map(move |id| self.entries.get(id))
            .filter(move |p| !p.is_host && Some(p.id.as_str()) != local);
        local_entry.into_iter().chain(hosts).chain(rest)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, local included. Used on session termination.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.local_id = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::media::{MediaTrack, TrackKind};

    fn registry() -> ParticipantRegistry {
        ParticipantRegistry::new(100)
    }

    #[test]
    fn test_list_orders_local_then_hosts_then_join_order() {
        let mut registry = registry();
        registry.insert(Participant::new("p1", "Ana", false)).unwrap();
        registry.insert(Participant::new("h1", "Hugo", true)).unwrap();
        registry.insert(Participant::new("p2", "Bea", false)).unwrap();
        registry.upsert_local(Participant::new("me", "Mia", false));

        let ids: Vec<&str> = registry.list().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["me", "h1", "p1", "p2"]);

        // The sequence is restartable
        let again: Vec<&str> = registry.list().map(|p| p.id.as_str()).collect();
        assert_eq!(again, ids);
    }

    #[test]
    fn test_local_host_is_not_listed_twice() {
        let mut registry = registry();
        registry.upsert_local(Participant::new("me", "Mia", true));
        registry.insert(Participant::new("p1", "Ana", false)).unwrap();

        let ids: Vec<&str> = registry.list().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["me", "p1"]);
    }

    #[test]
    fn test_upsert_local_replaces_previous_entry() {
        let mut registry = registry();
        registry.upsert_local(Participant::new("old", "Mia", true));
        registry.upsert_local(Participant::new("new", "Mia", true));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.local().unwrap().id, "new");
        assert!(registry.get("old").is_none());
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut registry = registry();
        registry.insert(Participant::new("p1", "Ana", false)).unwrap();
        let result = registry.insert(Participant::new("p1", "Imposter", false));
        assert_eq!(result, Err(RegistryError::DuplicateId("p1".to_string())));
        assert_eq!(registry.get("p1").unwrap().nickname, "Ana");
    }

    #[test]
    fn test_insert_rejects_over_capacity() {
        let mut registry = ParticipantRegistry::new(2);
        registry.upsert_local(Participant::new("me", "Mia", true));
        registry.insert(Participant::new("p1", "Ana", false)).unwrap();
        let result = registry.insert(Participant::new("p2", "Bea", false));
        assert_eq!(result, Err(RegistryError::CapacityExceeded(2)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = registry();
        registry.insert(Participant::new("p1", "Ana", false)).unwrap();
        assert!(registry.remove("p1").is_some());
        assert!(registry.remove("p1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_flags_merges_partially() {
        let mut registry = registry();
        registry.insert(Participant::new("p1", "Ana", false)).unwrap();

        let info = registry.update_flags("p1", FlagUpdate::muted(true)).unwrap();
        assert!(info.is_muted);
        assert!(!info.is_camera_on);

        let info = registry
            .update_flags("p1", FlagUpdate::camera_on(true))
            .unwrap();
        assert!(info.is_muted);
        assert!(info.is_camera_on);
    }

    #[test]
    fn test_update_flags_not_found_leaves_registry_unchanged() {
        let mut registry = registry();
        registry.insert(Participant::new("p1", "Ana", false)).unwrap();
        let result = registry.update_flags("ghost", FlagUpdate::muted(true));
        assert_eq!(result, Err(RegistryError::NotFound("ghost".to_string())));
        assert!(!registry.get("p1").unwrap().is_muted);
    }

    #[test]
    fn test_set_stream_attaches_and_clears() {
        let mut registry = registry();
        registry.upsert_local(Participant::new("me", "Mia", true));

        let stream = MediaStream::new(vec![MediaTrack::new(TrackKind::Video)]);
        registry.set_stream("me", Some(stream.clone())).unwrap();
        assert_eq!(
            registry.local().unwrap().stream.as_ref().map(MediaStream::id),
            Some(stream.id())
        );

        registry.set_stream("me", None).unwrap();
        assert!(registry.local().unwrap().stream.is_none());

        let missing = registry.set_stream("ghost", None);
        assert!(matches!(missing, Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_clear_drops_local_entry() {
        let mut registry = registry();
        registry.upsert_local(Participant::new("me", "Mia", true));
        registry.insert(Participant::new("p1", "Ana", false)).unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.local().is_none());
        assert_eq!(registry.list().count(), 0);
    }
}
