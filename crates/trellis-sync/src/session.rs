//! Saving a document and absorbing other instances' writes
//!
//! Every instance writes only its own fragment set. A save first looks for a
//! marker announcing a foreign write this instance has not absorbed yet; if
//! one exists the local document is thrown away and replaced by that
//! instance's fragments (a restart). Otherwise the pending chunks are
//! written, followed by a fresh marker.

use crate::error::{StoreError, SyncError};
use crate::fragment::{FragmentStore, InstanceMarker};
use crate::identity::{IdentityProvider, InstanceId};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use trellis_chunk::{chunk_for, convert_to_chunk_id, create_all_chunks, inflate_state, Chunk, ChunkId, CodecError};
use trellis_model::{DocumentState, Store};

/// Result of a successful save
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// First save of this session: the full fragment set was written
    Bound {
        /// Number of fragments written
        written: usize,
    },

    /// Pending chunks were written
    Written {
        /// Ids of the fragments written
        written: Vec<ChunkId>,
    },

    /// Nothing was pending
    Unchanged,

    /// Another instance wrote first; its document replaced ours
    Restarted {
        /// Instance whose document was absorbed
        from: InstanceId,
        /// Absorbed document, already installed in the store
        state: DocumentState,
        /// Local pending chunks that were dropped
        discarded: Vec<ChunkId>,
    },
}

impl SaveOutcome {
    /// Check if the local document was replaced
    #[inline]
    #[must_use]
    pub fn is_restarted(&self) -> bool {
        matches!(self, Self::Restarted { .. })
    }
}

/// Connection between one instance's store and the shared fragment store
pub struct SyncSession {
    fragments: Arc<dyn FragmentStore>,
    identity: Arc<dyn IdentityProvider>,
    bound: bool,
    observed: BTreeMap<InstanceId, u64>,
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("instance", &self.identity.instance_id())
            .field("bound", &self.bound)
            .field("observed", &self.observed)
            .finish_non_exhaustive()
    }
}

impl SyncSession {
    /// Open a session and restore this instance's own document, if it has
    /// saved before
    ///
    /// # Errors
    /// Returns error if the fragment store cannot be read, or the stored
    /// document is corrupt or inconsistent
    pub async fn load(
        fragments: Arc<dyn FragmentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<(Self, Option<DocumentState>), SyncError> {
        let me = identity.instance_id();
        let own_marker = fragments
            .read_instance_markers()
            .await?
            .into_iter()
            .find(|marker| marker.instance_id == me);

        let observed = match &own_marker {
            Some(marker) => {
                if marker.seq > identity.current_sequence() {
                    warn!(
                        "Instance {} marker is at seq {} but identity is at {}",
                        me,
                        marker.seq,
                        identity.current_sequence()
                    );
                }
                marker.observed.clone()
            }
            None => BTreeMap::new(),
        };

        let chunks = fragments.read_all_fragments(me).await?;
        let state = if chunks.is_empty() {
            None
        } else {
            let state = inflate_state(&chunks)?;
            state
                .check_integrity()
                .map_err(|source| SyncError::Integrity { instance: me, source })?;
            info!("Restored instance {} from {} fragments", me, chunks.len());
            Some(state)
        };

        let session = Self {
            fragments,
            identity,
            bound: false,
            observed,
        };
        Ok((session, state))
    }

    /// Id of this instance
    #[must_use]
    pub fn instance_id(&self) -> InstanceId {
        self.identity.instance_id()
    }

    /// Check if the full fragment set has been written this session
    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Highest absorbed sequence per foreign instance
    #[inline]
    #[must_use]
    pub fn observed(&self) -> &BTreeMap<InstanceId, u64> {
        &self.observed
    }

    /// Persist `store`'s pending changes, or absorb a newer foreign document
    ///
    /// # Errors
    /// Returns error if the fragment store fails or an absorbed document is
    /// invalid. The store and its pending set are left untouched.
    pub async fn save(&mut self, store: &mut Store) -> Result<SaveOutcome, SyncError> {
        if let Some(marker) = self.unseen_foreign_marker().await? {
            return self.restart(store, marker).await;
        }

        let me = self.instance_id();
        if !self.bound {
            let written = self.write_everything(store.state()).await?;
            self.publish().await?;
            self.bound = true;
            store.clear_pending();
            info!("Bound instance {} with {} fragments", me, written);
            return Ok(SaveOutcome::Bound { written });
        }

        if !store.has_pending() {
            return Ok(SaveOutcome::Unchanged);
        }

        let ids = match pending_chunk_ids(store) {
            Ok(ids) => ids,
            Err(CodecError::CollectionAddress(field)) => {
                debug!(%field, "whole collection written, saving everything");
                self.write_everything(store.state()).await?;
                self.publish().await?;
                store.clear_pending();
                let written = trellis_chunk::ChunkIter::new(store.state()).collect();
                return Ok(SaveOutcome::Written { written });
            }
            Err(e) => return Err(e.into()),
        };

        let chunks = ids
            .iter()
            .map(|id| chunk_for(store.state(), id))
            .collect::<Result<Vec<Chunk>, _>>()?;
        self.fragments.write_fragments(me, &chunks).await?;
        self.publish().await?;
        store.clear_pending();
        debug!(%me, count = chunks.len(), "saved pending fragments");
        Ok(SaveOutcome::Written {
            written: ids.into_iter().collect(),
        })
    }

    async fn unseen_foreign_marker(&self) -> Result<Option<InstanceMarker>, StoreError> {
        let me = self.instance_id();
        Ok(self
            .fragments
            .read_instance_markers()
            .await?
            .into_iter()
            .filter(|marker| marker.instance_id != me && marker.is_unseen_by(&self.observed))
            .max_by_key(|marker| (marker.written_at, marker.seq)))
    }

    async fn restart(&mut self, store: &mut Store, marker: InstanceMarker) -> Result<SaveOutcome, SyncError> {
        let me = self.instance_id();
        let from = marker.instance_id;
        let discarded: Vec<ChunkId> = store
            .pending_addresses()
            .iter()
            .filter_map(|address| convert_to_chunk_id(address).ok())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let chunks = self.fragments.read_all_fragments(from).await?;
        let state = inflate_state(&chunks)?;
        state
            .check_integrity()
            .map_err(|source| SyncError::Integrity { instance: from, source })?;
        self.fragments.replace_fragments(me, &chunks).await?;

        let mut observed = self.observed.clone();
        for (instance, seq) in marker.observed.iter().filter(|(instance, _)| **instance != me) {
            let entry = observed.entry(*instance).or_insert(0);
            *entry = (*entry).max(*seq);
        }
        observed.insert(from, marker.seq);
        // Copied documents keep the current seq; only local writes advance it.
        self.write_marker(self.identity.current_sequence(), observed.clone())
            .await?;
        self.observed = observed;
        self.bound = true;

        if !discarded.is_empty() {
            warn!(
                "Instance {} absorbed {} and discarded {} unsaved fragments",
                me,
                from,
                discarded.len()
            );
        }
        info!("Instance {} restarted from {} at seq {}", me, from, marker.seq);
        store.replace_state(state.clone());
        Ok(SaveOutcome::Restarted { from, state, discarded })
    }

    async fn write_everything(&self, state: &DocumentState) -> Result<usize, SyncError> {
        let chunks = create_all_chunks(state)?;
        self.fragments
            .replace_fragments(self.instance_id(), &chunks)
            .await?;
        Ok(chunks.len())
    }

    async fn publish(&self) -> Result<(), StoreError> {
        let seq = self.identity.next_sequence().await?;
        self.write_marker(seq, self.observed.clone()).await
    }

    async fn write_marker(&self, seq: u64, observed: BTreeMap<InstanceId, u64>) -> Result<(), StoreError> {
        let marker = InstanceMarker {
            instance_id: self.instance_id(),
            seq,
            written_at: Utc::now(),
            observed,
        };
        self.fragments.write_instance_marker(&marker).await
    }
}

fn pending_chunk_ids(store: &Store) -> Result<BTreeSet<ChunkId>, CodecError> {
    trellis_chunk::chunk_ids_for(store.pending_addresses())
}
