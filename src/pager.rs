use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::PAGE_SIZE;

pub type Page = [u8; PAGE_SIZE];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PagerError {
    #[error("page {page} is past the {max_pages} page limit")]
    OutOfBounds { page: usize, max_pages: usize },
}

/// Lazily allocated, zero-filled pages keyed by page number.
///
/// A page comes into existence on its first [`Pager::page_mut`] call and
/// lives as long as the pager. Nothing is ever evicted.
#[derive(Debug)]
pub struct Pager {
    pages: BTreeMap<usize, Box<Page>>,
    max_pages: usize,
}

impl Pager {
    pub fn new(max_pages: usize) -> Self {
        Self {
            pages: BTreeMap::new(),
            max_pages,
        }
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn allocated(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, page: usize) -> Option<&Page> {
        self.pages.get(&page).map(|p| &**p)
    }

    pub fn page_mut(&mut self, page: usize) -> Result<&mut Page, PagerError> {
        if page >= self.max_pages {
            return Err(PagerError::OutOfBounds {
                page,
                max_pages: self.max_pages,
            });
        }

        let buf = self.pages.entry(page).or_insert_with(|| {
            debug!(page, "allocating page");
            Box::new([0u8; PAGE_SIZE])
        });
        Ok(&mut **buf)
    }
}
