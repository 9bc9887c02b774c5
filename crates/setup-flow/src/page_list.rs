//! Ordered page collection.
//!
//! Insertion order is navigation order. Ids and keys are unique at every
//! instant, and at most one terminal page exists; it can never be removed.

use std::ops::Index;

use crate::error::{FlowError, FlowResult};
use crate::page::{Page, PageId};

/// The ordered list of pages in a flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageList {
    pages: Vec<Page>,
}

impl PageList {
    /// Create an empty page list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from pages in order, rejecting duplicates.
    pub fn from_pages(pages: impl IntoIterator<Item = Page>) -> FlowResult<Self> {
        let mut list = Self::new();
        for page in pages {
            list.append(page)?;
        }
        Ok(list)
    }

    /// Get the number of pages.
    pub fn size(&self) -> usize {
        self.pages.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Get the page at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= size()`. Callers bound-check with
    /// [`size`](Self::size) first; use [`try_get`](Self::try_get) when that
    /// is not possible.
    pub fn get(&self, index: usize) -> &Page {
        match self.pages.get(index) {
            Some(page) => page,
            None => panic!(
                "page index {index} out of range for list of {} pages",
                self.pages.len()
            ),
        }
    }

    /// Get the page at `index`, if any.
    pub fn try_get(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    /// Find a page by id.
    pub fn find_by_id(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id().as_str() == id)
    }

    pub(crate) fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id().as_str() == id)
    }

    /// Find a page by key.
    pub fn find_by_key(&self, key: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.key() == key)
    }

    /// Get the position of a page by id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.pages.iter().position(|p| p.id().as_str() == id)
    }

    /// Get the terminal page, if the flow has one.
    pub fn terminal(&self) -> Option<&Page> {
        self.pages.iter().find(|p| p.is_terminal())
    }

    /// Iterate over pages in navigation order.
    pub fn iter(&self) -> std::slice::Iter<'_, Page> {
        self.pages.iter()
    }

    /// Get the ids of all pages in order.
    pub fn ids(&self) -> Vec<PageId> {
        self.pages.iter().map(|p| p.id().clone()).collect()
    }

    /// Append a page at the end of the flow.
    pub fn append(&mut self, page: Page) -> FlowResult<()> {
        let index = self.pages.len();
        self.insert(index, page)
    }

    /// Insert a page at `index` (clamped to the list length).
    pub fn insert(&mut self, index: usize, page: Page) -> FlowResult<()> {
        self.check_insertable(&page)?;
        let index = index.min(self.pages.len());
        self.pages.insert(index, page);
        Ok(())
    }

    /// Remove a page by id.
    ///
    /// Absent pages and the terminal page are left alone; both return
    /// `None`. Otherwise returns the removed page and its former index.
    pub fn remove(&mut self, id: &str) -> Option<(usize, Page)> {
        let index = self.position(id)?;
        if !self.pages[index].is_removable() {
            return None;
        }
        Some((index, self.pages.remove(index)))
    }

    /// Index of the first required page that is not completed, or `size()`.
    pub fn first_blocking_index(&self) -> usize {
        self.pages
            .iter()
            .position(Page::blocks_navigation)
            .unwrap_or(self.pages.len())
    }

    fn check_insertable(&self, page: &Page) -> FlowResult<()> {
        if self.find_by_id(page.id().as_str()).is_some() {
            return Err(FlowError::duplicate_id(page.id().as_str()));
        }
        if self.find_by_key(page.key()).is_some() {
            return Err(FlowError::duplicate_key(page.key()));
        }
        if page.is_terminal()
            && let Some(existing) = self.terminal()
        {
            return Err(FlowError::TerminalPageExists {
                existing: existing.id().to_string(),
            });
        }
        Ok(())
    }
}

impl Index<usize> for PageList {
    type Output = Page;

    fn index(&self, index: usize) -> &Page {
        self.get(index)
    }
}

impl<'a> IntoIterator for &'a PageList {
    type Item = &'a Page;
    type IntoIter = std::slice::Iter<'a, Page>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PageList {
        PageList::from_pages([
            Page::new("welcome", "page_welcome"),
            Page::new("wifi", "page_wifi").required(),
            Page::new("finish", "page_finish").terminal(),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let list = sample();

        assert_eq!(list.size(), 3);
        assert_eq!(list.get(1).id(), &PageId::new("wifi"));
        assert_eq!(list[2].key(), "page_finish");
        assert_eq!(list.find_by_key("page_wifi").map(|p| p.id().as_str()), Some("wifi"));
        assert_eq!(list.position("finish"), Some(2));
        assert!(list.find_by_id("missing").is_none());
        assert!(list.find_by_key("missing").is_none());
        assert!(list.try_get(3).is_none());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_get_out_of_range_panics() {
        sample().get(3);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut list = sample();
        let err = list.append(Page::new("wifi", "other_key")).unwrap_err();
        assert!(matches!(err, FlowError::DuplicateKey { field: "id", .. }));
        assert_eq!(list.size(), 3);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut list = sample();
        let err = list.append(Page::new("other", "page_wifi")).unwrap_err();
        assert!(matches!(err, FlowError::DuplicateKey { field: "key", .. }));
    }

    #[test]
    fn test_second_terminal_rejected() {
        let mut list = sample();
        let err = list
            .append(Page::new("done", "page_done").terminal())
            .unwrap_err();
        assert!(matches!(err, FlowError::TerminalPageExists { .. }));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut list = sample();
        let (index, page) = list.remove("wifi").unwrap();

        assert_eq!(index, 1);
        assert_eq!(page.key(), "page_wifi");
        assert_eq!(list.ids(), vec![PageId::new("welcome"), PageId::new("finish")]);
        assert!(list.remove("wifi").is_none());
    }

    #[test]
    fn test_terminal_is_not_removable() {
        let mut list = sample();
        assert!(list.remove("finish").is_none());
        assert_eq!(list.size(), 3);
    }

    #[test]
    fn test_insert_clamps_index() {
        let mut list = sample();
        list.insert(1, Page::new("sim", "page_sim")).unwrap();
        list.insert(99, Page::new("extra", "page_extra")).unwrap();

        assert_eq!(list.position("sim"), Some(1));
        assert_eq!(list.position("extra"), Some(4));
    }

    #[test]
    fn test_first_blocking_index() {
        let mut list = PageList::from_pages([
            Page::new("a", "a").required(),
            Page::new("b", "b"),
            Page::new("c", "c").required(),
        ])
        .unwrap();
        assert_eq!(list.first_blocking_index(), 0);

        list.find_by_id_mut("a").unwrap().set_completed(true);
        assert_eq!(list.first_blocking_index(), 2);

        list.find_by_id_mut("c").unwrap().set_completed(true);
        assert_eq!(list.first_blocking_index(), list.size());
    }
}
