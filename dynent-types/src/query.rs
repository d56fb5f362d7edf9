//! Pagination and ordering vocabulary shared by listings, lookups and the
//! trash.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Sort direction of an [`Order`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ascending",
            Self::Desc => "descending",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(Error::InvalidOrder(format!("unknown direction '{other}'"))),
        }
    }
}

/// Ordering of a result set by a single field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Order {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Desc)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_str())
    }
}

/// Parses `"<field>"` or `"<field> <asc|desc>"`.
impl FromStr for Order {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let field = parts
            .next()
            .ok_or_else(|| Error::InvalidOrder("empty order".to_string()))?;
        let direction = match parts.next() {
            Some(dir) => dir.parse()?,
            None => Direction::Asc,
        };
        if parts.next().is_some() {
            return Err(Error::InvalidOrder(format!("trailing input in '{s}'")));
        }
        Ok(Self::new(field, direction))
    }
}

/// Page, page size and ordering passed to listing and lookup operations.
///
/// Pages are 1-based. A missing page size means "everything on one page".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

impl QueryParams {
    pub fn new(page: u32, page_size: u32, order: Option<Order>) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
            order,
        }
    }

    /// No paging, no ordering.
    pub fn unpaged() -> Self {
        Self::default()
    }

    /// No paging, ordered by `order`.
    pub fn ordered(order: Order) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }

    pub fn is_paged(&self) -> bool {
        self.page_size.is_some()
    }

    /// The effective page number (at least 1).
    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Index range of the current page within a result set of `total` rows.
    pub fn page_range(&self, total: usize) -> Range<usize> {
        match self.page_size {
            Some(size) if size > 0 => {
                let size = size as usize;
                let start = (self.page_number() as usize - 1).saturating_mul(size).min(total);
                let end = start.saturating_add(size).min(total);
                start..end
            }
            _ => 0..total,
        }
    }

    /// Total number of pages needed for `total` rows.
    pub fn page_count(&self, total: usize) -> u32 {
        match self.page_size {
            Some(size) if size > 0 => u32::try_from(total.div_ceil(size as usize)).unwrap_or(u32::MAX),
            _ => u32::from(total > 0),
        }
    }

    /// Applies this page to an already-ordered result set.
    pub fn apply_page<T>(&self, mut rows: Vec<T>) -> Vec<T> {
        let range = self.page_range(rows.len());
        rows.truncate(range.end);
        rows.drain(..range.start);
        rows
    }
}

/// One page of a larger result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Records<T> {
    /// Current page (1-based).
    pub page: u32,
    /// Total number of pages.
    pub total: u32,
    /// Total number of rows across all pages.
    pub records: u64,
    pub rows: Vec<T>,
}

impl<T> Records<T> {
    /// Builds a page out of the full, already-ordered result set.
    pub fn paginate(all: Vec<T>, params: &QueryParams) -> Self {
        let total_rows = all.len();
        Self {
            page: params.page_number(),
            total: params.page_count(total_rows),
            records: total_rows as u64,
            rows: params.apply_page(all),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Records<U> {
        Records {
            page: self.page,
            total: self.total,
            records: self.records,
            rows: self.rows.into_iter().map(f).collect(),
        }
    }
}
