use std::collections::HashSet;

use crate::domain::SenderId;

// ============== Authorization ==============

/// Sender ids allowed to trigger a relay.
///
/// Matching is exact string equality; an empty list authorizes nobody.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowList {
    senders: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            senders: senders.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_authorized(&self, sender: &SenderId) -> bool {
        self.senders.contains(&sender.0)
    }
}
