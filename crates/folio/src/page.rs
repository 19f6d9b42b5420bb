use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::DocumentError;

pub const NEW_PAGE_PLACEHOLDER: &str = "<p>New page content...</p>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u32);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub content: String,
}

/// Ordered pages of one document plus the active page id.
///
/// Never empty. `current` always names a page in `pages`, and ids are
/// handed out strictly increasing, even across deletions of the last page.
#[derive(Debug, Clone)]
pub struct PageStore {
    pages: Vec<Page>,
    current: PageId,
    last_id: PageId,
    placeholder: String,
}

impl PageStore {
    /// Bootstrap a store with a single page (id 1).
    pub fn new(initial_content: impl Into<String>) -> Self {
        let first = PageId(1);
        Self {
            pages: vec![Page {
                id: first,
                content: initial_content.into(),
            }],
            current: first,
            last_id: first,
            placeholder: NEW_PAGE_PLACEHOLDER.to_string(),
        }
    }

    /// Rebuild a store from persisted pages.
    ///
    /// `last_assigned` is the highest id ever handed out, if known; it is
    /// raised to the highest id present.
    pub fn from_pages(
        pages: Vec<Page>,
        current: PageId,
        last_assigned: Option<PageId>,
    ) -> Result<Self, DocumentError> {
        if pages.is_empty() {
            return Err(DocumentError::EmptyDocument);
        }

        let mut seen = HashSet::new();
        for page in &pages {
            if !seen.insert(page.id) {
                return Err(DocumentError::DuplicatePage(page.id));
            }
        }
        if !seen.contains(&current) {
            return Err(DocumentError::PageNotFound(current));
        }

        let highest = pages.iter().map(|p| p.id).max().unwrap_or(current);
        let last_id = last_assigned.map_or(highest, |id| id.max(highest));

        Ok(Self {
            pages,
            current,
            last_id,
            placeholder: NEW_PAGE_PLACEHOLDER.to_string(),
        })
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Append a page and make it current. Fails once the id space is used
    /// up, leaving the store unchanged.
    pub fn add_page(&mut self, initial_content: Option<String>) -> Result<&Page, DocumentError> {
        let highest = self.pages.iter().map(|p| p.id).max().unwrap_or(self.last_id);
        let last = self.last_id.max(highest);
        let id = last
            .0
            .checked_add(1)
            .map(PageId)
            .ok_or(DocumentError::PageIdsExhausted(last))?;
        self.last_id = id;

        self.pages.push(Page {
            id,
            content: initial_content.unwrap_or_else(|| self.placeholder.clone()),
        });
        self.current = id;
        log::debug!("Added page {} ({} pages)", id, self.pages.len());

        Ok(&self.pages[self.pages.len() - 1])
    }

    /// Remove a page. Does nothing when it is the only page or the id is
    /// unknown. Deleting the current page makes the first page current.
    pub fn delete_page(&mut self, id: PageId) -> bool {
        if self.pages.len() <= 1 {
            log::debug!("Refusing to delete page {}: last remaining page", id);
            return false;
        }

        let Some(index) = self.position(id) else {
            log::debug!("Delete of unknown page {} ignored", id);
            return false;
        };

        self.pages.remove(index);
        if self.current == id {
            self.current = self.pages[0].id;
        }
        log::debug!("Deleted page {}, current is {}", id, self.current);
        true
    }

    pub fn update_page_content(
        &mut self,
        id: PageId,
        content: impl Into<String>,
    ) -> Result<(), DocumentError> {
        let page = self
            .pages
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(DocumentError::PageNotFound(id))?;
        page.content = content.into();
        Ok(())
    }

    pub fn get_page(&self, id: PageId) -> Result<&Page, DocumentError> {
        self.pages
            .iter()
            .find(|p| p.id == id)
            .ok_or(DocumentError::PageNotFound(id))
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    pub fn set_current(&mut self, id: PageId) -> Result<(), DocumentError> {
        if !self.contains(id) {
            return Err(DocumentError::PageNotFound(id));
        }
        self.current = id;
        Ok(())
    }

    pub fn current_page_id(&self) -> PageId {
        self.current
    }

    pub fn current_page(&self) -> &Page {
        let index = self.position(self.current).unwrap_or(0);
        &self.pages[index]
    }

    pub fn last_assigned_id(&self) -> PageId {
        self.last_id
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Whether a delete would do anything; the shell disables its delete
    /// control otherwise.
    pub fn can_delete(&self) -> bool {
        self.pages.len() > 1
    }
}
