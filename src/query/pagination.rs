use serde::Serialize;

use crate::error::{Error, Result};

/// An offset/limit window over an ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    offset: u64,
    limit: u64,
}

impl PageRequest {
    /// # Errors
    ///
    /// [`Error::InvalidCondition`] if `limit` is zero.
    pub fn new(offset: u64, limit: u64) -> Result<Self> {
        if limit == 0 {
            return Err(Error::invalid_condition("page limit must be greater than zero"));
        }
        Ok(Self { offset, limit })
    }

    /// The zero-based page `page` of size `size`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCondition`] if `size` is zero or the offset overflows.
    pub fn of_page(page: u64, size: u64) -> Result<Self> {
        let offset = page
            .checked_mul(size)
            .ok_or_else(|| Error::invalid_condition("page offset overflows"))?;
        Self::new(offset, size)
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// The window directly after this one.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
        }
    }
}

/// Whether the total is always counted with a separate statement, or derived from the
/// content page when that is provably exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountPolicy {
    Always,
    #[default]
    SkipWhenComplete,
}

/// One window of results together with the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    /// `false` if `total` was derived from the content page instead of counted.
    pub count_executed: bool,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.limit)
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.offset.saturating_add(self.limit) < self.total
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
            count_executed: self.count_executed,
        }
    }
}

/// The exact total, if it follows from the size of the content page alone.
///
/// A short page proves there is nothing after it, so the total is `offset + returned`. An
/// empty page past the first one proves nothing: rows may exist before the offset.
#[must_use]
pub const fn derive_total(request: PageRequest, returned: u64) -> Option<u64> {
    if returned >= request.limit {
        None
    } else if request.offset == 0 {
        Some(returned)
    } else if returned > 0 {
        Some(request.offset + returned)
    } else {
        None
    }
}
