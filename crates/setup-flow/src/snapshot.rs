//! Serializable flow snapshots.
//!
//! A [`Snapshot`] captures everything needed to rebuild a flow after its
//! host was torn down: page order, every page's flags, which pages were
//! removed during the session, and the current index. Producing and applying
//! a snapshot are pure transformations; the only I/O is whatever the host does
//! with the JSON string.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, FlowResult};
use crate::page::{DEFAULT_NEXT_LABEL, Page, PageId};
use crate::page_list::PageList;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

fn default_next_label() -> String {
    DEFAULT_NEXT_LABEL.to_string()
}

/// One page as recorded in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: PageId,
    pub key: String,
    pub required: bool,
    pub completed: bool,
    /// `false` for pages removed earlier in the session.
    pub present: bool,
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default = "default_next_label")]
    pub next_label: String,
}

impl PageRecord {
    fn from_page(page: &Page, present: bool) -> Self {
        Self {
            id: page.id().clone(),
            key: page.key().to_string(),
            required: page.is_required(),
            completed: page.is_completed(),
            present,
            ephemeral: page.is_ephemeral(),
            terminal: page.is_terminal(),
            next_label: page.next_label().to_string(),
        }
    }

    fn to_page(&self) -> Page {
        let mut page = Page::new(self.id.clone(), self.key.clone())
            .with_required(self.required)
            .with_ephemeral(self.ephemeral)
            .with_next_label(self.next_label.clone());
        if self.terminal {
            page = page.terminal();
        }
        page.set_completed(self.completed);
        page
    }
}

/// Opaque, serializable capture of a flow's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    version: u32,
    pages: Vec<PageRecord>,
    current_index: usize,
}

/// Flow contents rebuilt from a validated snapshot.
#[derive(Debug)]
pub(crate) struct RestoredFlow {
    pub pages: PageList,
    pub removed: Vec<Page>,
    pub current_index: usize,
}

impl Snapshot {
    /// Capture present pages (in order), previously removed pages, and the
    /// current index.
    pub(crate) fn capture(pages: &PageList, removed: &[Page], current_index: usize) -> Self {
        let records = pages
            .iter()
            .map(|p| PageRecord::from_page(p, true))
            .chain(removed.iter().map(|p| PageRecord::from_page(p, false)))
            .collect();
        Self {
            version: SNAPSHOT_VERSION,
            pages: records,
            current_index,
        }
    }

    /// Get the snapshot format version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Get all page records, present pages first in navigation order.
    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    /// Get the recorded current index.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Encode the snapshot as JSON.
    pub fn to_json(&self) -> FlowResult<String> {
        serde_json::to_string(self).map_err(|e| FlowError::snapshot_corrupt(e.to_string()))
    }

    /// Decode a snapshot from JSON.
    ///
    /// Only the encoding is checked here; structural validation happens when
    /// the snapshot is loaded into a flow.
    pub fn from_json(json: &str) -> FlowResult<Self> {
        serde_json::from_str(json).map_err(|e| FlowError::snapshot_corrupt(e.to_string()))
    }

    /// Validate the snapshot and rebuild the flow contents.
    pub(crate) fn restore(&self) -> FlowResult<RestoredFlow> {
        if self.version != SNAPSHOT_VERSION {
            return Err(FlowError::snapshot_corrupt(format!(
                "unsupported version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }

        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for record in &self.pages {
            if !ids.insert(record.id.as_str()) {
                return Err(FlowError::snapshot_corrupt(format!("duplicate page id '{}'", record.id)));
            }
            if !keys.insert(record.key.as_str()) {
                return Err(FlowError::snapshot_corrupt(format!("duplicate page key '{}'", record.key)));
            }
            if record.terminal && !record.present {
                return Err(FlowError::snapshot_corrupt(format!(
                    "terminal page '{}' recorded as removed",
                    record.id
                )));
            }
        }

        let pages = PageList::from_pages(
            self.pages
                .iter()
                .filter(|r| r.present)
                .map(PageRecord::to_page),
        )
        .map_err(|e| FlowError::snapshot_corrupt(e.to_string()))?;

        let valid_index = if pages.is_empty() {
            self.current_index == 0
        } else {
            self.current_index < pages.size()
        };
        if !valid_index {
            return Err(FlowError::snapshot_corrupt(format!(
                "current index {} out of range for {} pages",
                self.current_index,
                pages.size()
            )));
        }

        let removed = self
            .pages
            .iter()
            .filter(|r| !r.present)
            .map(PageRecord::to_page)
            .collect();

        Ok(RestoredFlow {
            pages,
            removed,
            current_index: self.current_index,
        })
    }
}
