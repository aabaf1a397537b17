//! Remote gateway for SLO documents
//!
//! This module provides a trait-based abstraction over the SLO endpoints of
//! the remote service.
//!
//! ## Implementations
//!
//! - **HTTP** (`HttpGateway`): talks to the real service with `reqwest`
//! - **In-Memory** (`MemoryGateway`): process-local store with the same
//!   contract, used by tests and dry runs
//!
//! ## Error Contract
//!
//! | call          | failures                                         |
//! |---------------|--------------------------------------------------|
//! | `get_folder`  | NotFound, Transport                              |
//! | `create_slo`  | Validation, Transport                            |
//! | `read_slo`    | NotFound, Transport                              |
//! | `update_slo`  | NotFound, Conflict, Validation, Transport        |
//! | `delete_slo`  | NotFound, Transport                              |
//!
//! No implementation retries on its own.

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::SloResult;
use crate::model::{Folder, Slo};

pub use http::HttpGateway;
pub use memory::{GatewayCall, MemoryGateway, ROOT_FOLDER_ID};

/// Alias resolving to the caller's root SLO folder
pub const ROOT_FOLDER: &str = "root";

/// Contract over the SLO endpoints
///
/// Implementations must be `Send + Sync`; a single gateway is shared by
/// every managed resource.
#[async_trait]
pub trait SloGateway: Send + Sync {
    /// Look up a folder by id, or the root folder via [`ROOT_FOLDER`]
    async fn get_folder(&self, id_or_alias: &str) -> SloResult<Folder>;

    /// Create an SLO inside `parent_id` and return its new id
    async fn create_slo(&self, slo: &Slo, parent_id: &str) -> SloResult<String>;

    async fn read_slo(&self, id: &str) -> SloResult<Slo>;

    /// Replace the SLO identified by `slo.id`. The submitted `version` must
    /// match the stored one.
    async fn update_slo(&self, slo: &Slo) -> SloResult<()>;

    async fn delete_slo(&self, id: &str) -> SloResult<()>;
}

#[async_trait]
impl<G> SloGateway for Box<G>
where
    G: SloGateway + ?Sized,
{
    async fn get_folder(&self, id_or_alias: &str) -> SloResult<Folder> {
        (**self).get_folder(id_or_alias).await
    }

    async fn create_slo(&self, slo: &Slo, parent_id: &str) -> SloResult<String> {
        (**self).create_slo(slo, parent_id).await
    }

    async fn read_slo(&self, id: &str) -> SloResult<Slo> {
        (**self).read_slo(id).await
    }

    async fn update_slo(&self, slo: &Slo) -> SloResult<()> {
        (**self).update_slo(slo).await
    }

    async fn delete_slo(&self, id: &str) -> SloResult<()> {
        (**self).delete_slo(id).await
    }
}
