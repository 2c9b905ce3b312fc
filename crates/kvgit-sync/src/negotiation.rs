use std::collections::HashSet;

use kvgit_types::ObjectId;

use crate::types::Negotiation;

/// Object negotiation engine: computes wants/haves to minimize transfer.
pub struct NegotiationEngine;

impl NegotiationEngine {
    /// Ref targets the remote has that we don't.
    pub fn compute_wants(
        local_refs: &[(String, ObjectId)],
        remote_refs: &[(String, ObjectId)],
    ) -> Vec<ObjectId> {
        let local: HashSet<ObjectId> = local_refs.iter().map(|(_, id)| *id).collect();
        let mut wants: Vec<ObjectId> = remote_refs
            .iter()
            .filter(|(_, id)| !local.contains(id))
            .map(|(_, id)| *id)
            .collect();
        wants.sort();
        wants.dedup();
        wants
    }

    /// Ref targets we advertise, so the remote can skip their history.
    pub fn compute_haves(local_refs: &[(String, ObjectId)]) -> Vec<ObjectId> {
        let mut haves: Vec<ObjectId> = local_refs.iter().map(|(_, id)| *id).collect();
        haves.sort();
        haves.dedup();
        haves
    }

    /// Full negotiation.
    pub fn negotiate(
        local_refs: &[(String, ObjectId)],
        remote_refs: &[(String, ObjectId)],
    ) -> Negotiation {
        let wants = Self::compute_wants(local_refs, remote_refs);
        let haves = Self::compute_haves(local_refs);
        Negotiation { wants, haves }
    }
}
