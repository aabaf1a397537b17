//! In-memory SLO gateway (no network)
//!
//! Mirrors the server's observable behaviour closely enough for tests and
//! dry runs:
//! - ids are 16 upper-case hex digits
//! - every SLO lives in an existing folder, the root folder by default
//! - updates must carry the stored `version`, which is bumped on success
//! - every call is recorded and can be inspected with [`MemoryGateway::calls`]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{ROOT_FOLDER, SloGateway};
use crate::error::{SloError, SloResult};
use crate::model::{Folder, Slo, SloKind};

/// Id of the root folder
pub const ROOT_FOLDER_ID: &str = "0000000000000001";

/// Principal recorded in `createdBy` / `modifiedBy`
const LOCAL_USER: &str = "0000000000000002";

/// A gateway call as observed by the in-memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    GetFolder(String),
    Create { parent_id: String, kind: SloKind },
    Read(String),
    Update { id: String, kind: SloKind, version: i64 },
    Delete(String),
}

#[derive(Debug)]
struct Inner {
    slos: HashMap<String, Slo>,
    folders: HashMap<String, Folder>,
    next_id: u64,
    calls: Vec<GatewayCall>,
}

impl Inner {
    fn allocate_id(&mut self) -> String {
        let id = format!("{:016X}", self.next_id);
        self.next_id += 1;
        id
    }
}

/// Process-local SLO store. Clones share the same store.
#[derive(Debug, Clone)]
pub struct MemoryGateway {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        let root = Folder {
            id: ROOT_FOLDER_ID.to_string(),
            name: "SLOs".to_string(),
            description: "Root folder".to_string(),
            parent_id: None,
        };

        Self {
            inner: Arc::new(RwLock::new(Inner {
                slos: HashMap::new(),
                folders: HashMap::from([(root.id.clone(), root)]),
                // ids below 0x100 are reserved for folders and principals
                next_id: 0x100,
                calls: Vec::new(),
            })),
        }
    }

    /// Every call made so far, oldest first
    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.inner.read().await.calls.clone()
    }

    /// Store `slo` as-is, allocating an id when it has none. Not recorded as
    /// a call.
    pub async fn seed(&self, mut slo: Slo) -> String {
        let mut inner = self.inner.write().await;
        if slo.id.is_empty() {
            slo.id = inner.allocate_id();
        }
        let id = slo.id.clone();
        inner.slos.insert(id.clone(), slo);
        id
    }

    /// Drop an SLO behind the caller's back, as an out-of-band deletion would
    pub async fn forget(&self, id: &str) -> Option<Slo> {
        self.inner.write().await.slos.remove(id)
    }

    pub async fn get(&self, id: &str) -> Option<Slo> {
        self.inner.read().await.slos.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.slos.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn slo_not_found(id: &str) -> SloError {
    SloError::NotFound {
        resource: "slo",
        id: id.to_string(),
    }
}

#[async_trait]
impl SloGateway for MemoryGateway {
    async fn get_folder(&self, id_or_alias: &str) -> SloResult<Folder> {
        let mut inner = self.inner.write().await;
        inner.calls.push(GatewayCall::GetFolder(id_or_alias.to_string()));

        let id = if id_or_alias == ROOT_FOLDER {
            ROOT_FOLDER_ID
        } else {
            id_or_alias
        };

        inner
            .folders
            .get(id)
            .cloned()
            .ok_or_else(|| SloError::NotFound {
                resource: "folder",
                id: id_or_alias.to_string(),
            })
    }

    async fn create_slo(&self, slo: &Slo, parent_id: &str) -> SloResult<String> {
        let mut inner = self.inner.write().await;
        inner.calls.push(GatewayCall::Create {
            parent_id: parent_id.to_string(),
            kind: slo.kind,
        });

        if !inner.folders.contains_key(parent_id) {
            return Err(SloError::NotFound {
                resource: "folder",
                id: parent_id.to_string(),
            });
        }

        let id = inner.allocate_id();
        let timestamp = now();
        let stored = Slo {
            id: id.clone(),
            version: 0,
            created_at: timestamp.clone(),
            created_by: LOCAL_USER.to_string(),
            modified_at: timestamp,
            modified_by: LOCAL_USER.to_string(),
            parent_id: parent_id.to_string(),
            kind: SloKind::SlosLibrarySlo,
            is_mutable: true,
            ..slo.clone()
        };
        inner.slos.insert(id.clone(), stored);

        debug!(%id, parent_id, "stored SLO in memory");
        Ok(id)
    }

    async fn read_slo(&self, id: &str) -> SloResult<Slo> {
        let mut inner = self.inner.write().await;
        inner.calls.push(GatewayCall::Read(id.to_string()));

        inner.slos.get(id).cloned().ok_or_else(|| slo_not_found(id))
    }

    async fn update_slo(&self, slo: &Slo) -> SloResult<()> {
        let mut inner = self.inner.write().await;
        inner.calls.push(GatewayCall::Update {
            id: slo.id.clone(),
            kind: slo.kind,
            version: slo.version,
        });

        let Some(stored) = inner.slos.get_mut(&slo.id) else {
            return Err(slo_not_found(&slo.id));
        };

        if stored.version != slo.version {
            return Err(SloError::Conflict(format!(
                "SLO {} is at version {}, update was based on version {}",
                slo.id, stored.version, slo.version
            )));
        }

        let parent_id = if slo.parent_id.is_empty() {
            stored.parent_id.clone()
        } else {
            slo.parent_id.clone()
        };

        *stored = Slo {
            id: stored.id.clone(),
            version: stored.version + 1,
            created_at: stored.created_at.clone(),
            created_by: stored.created_by.clone(),
            modified_at: now(),
            modified_by: LOCAL_USER.to_string(),
            parent_id,
            kind: SloKind::SlosLibrarySlo,
            is_system: stored.is_system,
            is_mutable: stored.is_mutable,
            ..slo.clone()
        };

        debug!(id = %slo.id, version = stored.version, "updated SLO in memory");
        Ok(())
    }

    async fn delete_slo(&self, id: &str) -> SloResult<()> {
        let mut inner = self.inner.write().await;
        inner.calls.push(GatewayCall::Delete(id.to_string()));

        inner
            .slos
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| slo_not_found(id))
    }
}
