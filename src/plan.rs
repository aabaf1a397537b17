//! Drift diff between the configured and the observed SLO

use crate::codec;
use crate::error::SloResult;
use crate::model::{Slo, SloKind};
use crate::resource::ResourceState;

/// What an apply would do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Nothing exists on the server yet
    Create,
    /// The listed fields differ from the server's copy
    Update(Vec<&'static str>),
    NoOp,
}

/// User-controlled fields of `desired` that differ from `current`.
///
/// Optional fields the server fills in (`parent_id`, `service`,
/// `application`, `signal_type`) only count when `desired` sets them.
pub fn diff(desired: &Slo, current: &Slo) -> Vec<&'static str> {
    let mut changed = Vec::new();

    if desired.name != current.name {
        changed.push("name");
    }
    if desired.description != current.description {
        changed.push("description");
    }
    if desired.signal_type.is_some() && desired.signal_type != current.signal_type {
        changed.push("signal_type");
    }
    if desired.compliance != current.compliance {
        changed.push("compliance");
    }
    if desired.indicator != current.indicator {
        changed.push("indicator");
    }
    if desired.is_locked != current.is_locked {
        changed.push("is_locked");
    }
    if !desired.parent_id.is_empty() && desired.parent_id != current.parent_id {
        changed.push("parent_id");
    }
    if desired.service.is_some() && desired.service != current.service {
        changed.push("service");
    }
    if desired.application.is_some() && desired.application != current.application {
        changed.push("application");
    }

    changed
}

/// Decide how to reconcile `state` (holding the user's configuration)
/// with `observed`, the server's copy from a fresh read.
pub fn plan<S>(state: &S, observed: Option<&Slo>) -> SloResult<Plan>
where
    S: ResourceState + ?Sized,
{
    let desired = codec::decode(state, SloKind::SlosLibrarySloUpdate)?;

    let Some(current) = observed.filter(|_| !state.id().is_empty()) else {
        return Ok(Plan::Create);
    };

    let changed = diff(&desired, current);
    if changed.is_empty() {
        Ok(Plan::NoOp)
    } else {
        Ok(Plan::Update(changed))
    }
}
