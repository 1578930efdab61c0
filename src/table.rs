use thiserror::Error;
use tracing::{debug, warn};

use crate::pager::{Page, Pager, PagerError};
use crate::row::{Row, RowError};
use crate::{ROW_SIZE, ROWS_PER_PAGE, TABLE_MAX_PAGES, TABLE_MAX_ROWS};

pub type TableResult<T> = Result<T, TableError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("table full ({max_rows} rows)")]
    TableFull { max_rows: usize },

    #[error("page {page} holds rows but was never allocated")]
    PageNotAllocated { page: usize },

    #[error("row at offset {offset} runs past the end of page {page}")]
    SlotOutOfPage { page: usize, offset: usize },

    #[error(transparent)]
    Pager(#[from] PagerError),

    #[error(transparent)]
    Row(#[from] RowError),
}

/// Where a row lives: page number and byte offset inside that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Slot {
    pub page: usize,
    pub offset: usize,
}

pub fn row_slot(row_num: usize) -> Slot {
    Slot {
        page: row_num / ROWS_PER_PAGE,
        offset: (row_num % ROWS_PER_PAGE) * ROW_SIZE,
    }
}

fn row_bytes(page: &Page, slot: Slot) -> TableResult<&[u8; ROW_SIZE]> {
    page.get(slot.offset..)
        .and_then(|rest| rest.first_chunk())
        .ok_or(TableError::SlotOutOfPage {
            page: slot.page,
            offset: slot.offset,
        })
}

fn row_bytes_mut(page: &mut Page, slot: Slot) -> TableResult<&mut [u8; ROW_SIZE]> {
    page.get_mut(slot.offset..)
        .and_then(|rest| rest.first_chunk_mut())
        .ok_or(TableError::SlotOutOfPage {
            page: slot.page,
            offset: slot.offset,
        })
}

/// Append-only table of fixed-width rows addressed by row number.
#[derive(Debug)]
pub struct Table {
    pager: Pager,
    num_rows: usize,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    pub fn new() -> Self {
        Self {
            pager: Pager::new(TABLE_MAX_PAGES),
            num_rows: 0,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn max_rows(&self) -> usize {
        TABLE_MAX_ROWS
    }

    pub fn is_full(&self) -> bool {
        self.num_rows >= TABLE_MAX_ROWS
    }

    pub fn allocated_pages(&self) -> usize {
        self.pager.allocated()
    }

    /// Appends `row` after the last inserted row.
    ///
    /// On any error the table is left untouched: the row is serialized
    /// before its page is looked up.
    pub fn insert(&mut self, row: &Row) -> TableResult<()> {
        if self.is_full() {
            warn!(num_rows = self.num_rows, "insert rejected, table full");
            return Err(TableError::TableFull {
                max_rows: TABLE_MAX_ROWS,
            });
        }

        let bytes = row.serialize()?;
        let slot = row_slot(self.num_rows);
        let page = self.pager.page_mut(slot.page)?;
        *row_bytes_mut(page, slot)? = bytes;

        debug!(
            row_num = self.num_rows,
            page = slot.page,
            offset = slot.offset,
            "inserted row"
        );
        self.num_rows += 1;
        Ok(())
    }

    pub fn scan(&self) -> Scan<'_> {
        Scan {
            table: self,
            next: 0,
            end: self.num_rows,
        }
    }

    fn read_row(&self, row_num: usize) -> TableResult<Row> {
        let slot = row_slot(row_num);
        let Some(page) = self.pager.page(slot.page) else {
            return Err(TableError::PageNotAllocated { page: slot.page });
        };
        Ok(Row::deserialize(row_bytes(page, slot)?)?)
    }
}

/// Rows in insertion order, bounded by the row count at the time the scan
/// was started.
#[derive(Debug)]
pub struct Scan<'a> {
    table: &'a Table,
    next: usize,
    end: usize,
}

impl Iterator for Scan<'_> {
    type Item = TableResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let row = self.table.read_row(self.next);
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Scan<'_> {}
