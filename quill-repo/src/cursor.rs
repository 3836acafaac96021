//! Keyset pagination over the binding table.
//!
//! Ordering and pagination are tightly coupled: rows are ordered by
//! `(update_time ASC, public_id ASC)` so new and updated items appear at
//! the end of the pagination, with the public id breaking ties between
//! rows sharing an update time. A cursor is simply that sort key taken
//! from the last item of the previous page; the continuation predicate
//! (`update_time > t OR (update_time = t AND public_id > id)`) yields
//! every row exactly once across pages without holding any lock between
//! requests.

use crate::binding::Binding;
use quill_types::{PublicId, Timestamp};
use serde::{Deserialize, Serialize};

/// Resume point for a listing: the sort key of the last-seen item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub update_time: Timestamp,
    pub public_id: PublicId,
}

impl PageCursor {
    /// Derives a cursor from a listed item. `None` if the item has no
    /// public id (which listed rows always do).
    #[must_use]
    pub fn from_item(item: &Binding) -> Option<Self> {
        item.public_id.as_ref().map(|id| Self {
            update_time: item.update_time,
            public_id: id.clone(),
        })
    }
}

/// Options recognized by list operations, with documented defaults.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Resume after this cursor; `None` starts from the beginning.
    pub after: Option<PageCursor>,
    /// Page size override; `None` uses the repository default. Never
    /// unbounded.
    pub limit: Option<usize>,
}

/// One page of results plus the cursor for the next page.
#[derive(Debug)]
pub struct Page {
    pub bindings: Vec<Binding>,
    /// Cursor derived from the final item; `None` when the page is
    /// empty.
    pub next: Option<PageCursor>,
}
