//! Lifecycle orchestrator
//!
//! Composes the codec and a gateway into the Create / Read / Update / Delete
//! entry points the host drives, plus Import. A managed SLO is either
//! Absent (empty id in the handle) or Present:
//!
//! ```text
//!   Absent ──create──▶ Present ──update──▶ Present
//!     ▲                  │
//!     └──── delete ──────┤
//!                        └── read observes NotFound ──▶ Absent (drift)
//! ```
//!
//! The host serialises calls for a given resource; nothing here keeps state
//! between calls.

use std::future::Future;

use tracing::{debug, info, instrument, warn};

use crate::cancel::Cancellation;
use crate::codec;
use crate::error::{SloError, SloResult, ValidationError};
use crate::gateway::{ROOT_FOLDER, SloGateway};
use crate::model::{Slo, SloKind};
use crate::resource::ResourceState;

/// What a Read observed on the server
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// The SLO exists; its document has been written into the handle
    Present(Box<Slo>),
    /// The SLO is gone (or was never created); the handle's id is now empty
    Absent,
}

impl ReadOutcome {
    pub fn is_absent(&self) -> bool {
        matches!(self, ReadOutcome::Absent)
    }

    pub fn into_slo(self) -> Option<Slo> {
        match self {
            ReadOutcome::Present(slo) => Some(*slo),
            ReadOutcome::Absent => None,
        }
    }
}

/// Drives a single SLO resource against a gateway
pub struct SloResource<G> {
    gateway: G,
    cancellation: Cancellation,
}

impl<G> SloResource<G>
where
    G: SloGateway,
{
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            cancellation: Cancellation::never(),
        }
    }

    pub fn with_cancellation(gateway: G, cancellation: Cancellation) -> Self {
        Self {
            gateway,
            cancellation,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Race a gateway call against the cancellation signal. A cancelled call
    /// is dropped mid-flight.
    async fn guarded<T>(&self, call: impl Future<Output = SloResult<T>>) -> SloResult<T> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(SloError::Cancelled),
            result = call => result,
        }
    }

    /// Create the configured SLO and bind its id to `state`.
    ///
    /// A handle that already carries an id is only refreshed.
    #[instrument(skip_all)]
    pub async fn create<S>(&self, state: &mut S) -> SloResult<()>
    where
        S: ResourceState + ?Sized,
    {
        if !state.id().is_empty() {
            debug!(id = state.id(), "resource already created, refreshing");
            self.read(state).await?;
            return Ok(());
        }

        let mut slo = codec::decode(state, SloKind::SlosLibrarySlo)?;

        if slo.parent_id.is_empty() {
            let root = self.guarded(self.gateway.get_folder(ROOT_FOLDER)).await?;
            debug!(parent_id = %root.id, "defaulting parent to root folder");
            slo.parent_id = root.id;
        }

        let id = self
            .guarded(self.gateway.create_slo(&slo, &slo.parent_id))
            .await?;
        state.set_id(&id);
        info!(%id, name = %slo.name, "created SLO");

        self.read(state).await?;
        Ok(())
    }

    /// Refresh `state` from the server.
    ///
    /// A missing SLO is drift, not a failure: the id is cleared and
    /// [`ReadOutcome::Absent`] returned.
    #[instrument(skip_all, fields(id = state.id()))]
    pub async fn read<S>(&self, state: &mut S) -> SloResult<ReadOutcome>
    where
        S: ResourceState + ?Sized,
    {
        if state.id().is_empty() {
            return Ok(ReadOutcome::Absent);
        }

        let id = state.id().to_string();
        match self.guarded(self.gateway.read_slo(&id)).await {
            Ok(slo) => {
                codec::encode(&slo, state)?;
                Ok(ReadOutcome::Present(Box::new(slo)))
            }
            Err(e) if e.is_not_found() => {
                warn!(%id, "SLO no longer exists on the server, removing it from state");
                state.set_id("");
                Ok(ReadOutcome::Absent)
            }
            Err(e) => Err(e),
        }
    }

    /// Push the configured SLO to the server, then refresh `state`.
    #[instrument(skip_all, fields(id = state.id()))]
    pub async fn update<S>(&self, state: &mut S) -> SloResult<()>
    where
        S: ResourceState + ?Sized,
    {
        if state.id().is_empty() {
            return Err(ValidationError::missing("id").into());
        }

        let slo = codec::decode(state, SloKind::SlosLibrarySloUpdate)?;
        self.guarded(self.gateway.update_slo(&slo)).await?;
        info!(id = %slo.id, name = %slo.name, "updated SLO");

        self.read(state).await?;
        Ok(())
    }

    /// Delete the SLO bound to `state`. Deleting an absent SLO succeeds.
    ///
    /// The handle's id is left for the host to clear.
    #[instrument(skip_all, fields(id = state.id()))]
    pub async fn delete<S>(&self, state: &S) -> SloResult<()>
    where
        S: ResourceState + ?Sized,
    {
        let id = state.id();
        if id.is_empty() {
            debug!("nothing to delete");
            return Ok(());
        }

        match self.guarded(self.gateway.delete_slo(id)).await {
            Ok(()) => {
                info!(%id, "deleted SLO");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(%id, "SLO already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Adopt an existing SLO into an empty handle.
    ///
    /// Unlike [`read`](Self::read), a missing SLO is an error here.
    #[instrument(skip(self, state))]
    pub async fn import<S>(&self, state: &mut S, id: &str) -> SloResult<Slo>
    where
        S: ResourceState + ?Sized,
    {
        let slo = self.guarded(self.gateway.read_slo(id)).await?;

        state.set_id(id);
        codec::encode(&slo, state)?;
        info!(%id, name = %slo.name, "imported SLO");
        Ok(slo)
    }
}
