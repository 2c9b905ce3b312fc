use kvgit_types::ObjectId;

/// Request to move a remote ref from `old` to `new`.
///
/// `old` is the value the pusher last observed (`None` for "absent"); the
/// remote applies the update only if its ref still holds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefUpdate {
    pub name: String,
    pub old: Option<ObjectId>,
    pub new: ObjectId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefRejection {
    pub name: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct FetchResult {
    pub objects_received: usize,
    /// Remote branch tip after the fetch; `None` if the remote has no commits.
    pub remote_head: Option<ObjectId>,
    pub refs_updated: Vec<RefUpdate>,
}

#[derive(Clone, Debug, Default)]
pub struct PushResult {
    pub objects_sent: usize,
    pub refs_updated: Vec<RefUpdate>,
}

impl PushResult {
    pub fn is_up_to_date(&self) -> bool {
        self.refs_updated.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct UpdateResult {
    pub fetch: FetchResult,
    /// Local branch tip before the reset.
    pub previous_head: Option<ObjectId>,
    /// Local branch tip after the reset (equal to the remote head).
    pub head: Option<ObjectId>,
}

impl UpdateResult {
    pub fn changed(&self) -> bool {
        self.previous_head != self.head
    }
}

#[derive(Clone, Debug, Default)]
pub struct Negotiation {
    pub wants: Vec<ObjectId>,
    pub haves: Vec<ObjectId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_result_defaults() {
        let f = FetchResult::default();
        assert_eq!(f.objects_received, 0);
        assert!(f.remote_head.is_none());
    }

    #[test]
    fn push_result_up_to_date() {
        assert!(PushResult::default().is_up_to_date());
        let p = PushResult {
            objects_sent: 3,
            refs_updated: vec![RefUpdate {
                name: "refs/heads/master".into(),
                old: None,
                new: ObjectId::from_bytes(b"c"),
            }],
        };
        assert!(!p.is_up_to_date());
    }

    #[test]
    fn update_result_changed() {
        let same = UpdateResult::default();
        assert!(!same.changed());
        let moved = UpdateResult {
            head: Some(ObjectId::from_bytes(b"c")),
            ..Default::default()
        };
        assert!(moved.changed());
    }
}
