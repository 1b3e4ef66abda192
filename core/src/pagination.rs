//! Page requests and their query-string encoding.

use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort order rendered as `"<field>,<asc|desc>"` on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.field, self.direction.as_str())
    }
}

impl FromStr for Sort {
    type Err = ApiError;

    /// Parses `"field,asc"` / `"field,desc"`; a bare `"field"` sorts ascending.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(',') {
            Some((field, dir)) => {
                let direction = match dir.trim().to_ascii_lowercase().as_str() {
                    "asc" => SortDirection::Asc,
                    "desc" => SortDirection::Desc,
                    other => {
                        return Err(ApiError::InvalidPageRequest(format!(
                            "unknown sort direction `{other}`"
                        )))
                    }
                };
                (field.trim(), direction)
            }
            None => (s.trim(), SortDirection::Asc),
        };
        if field.is_empty() {
            return Err(ApiError::InvalidPageRequest(
                "sort field is empty".to_string(),
            ));
        }
        Ok(Sort {
            field: field.to_string(),
            direction,
        })
    }
}

/// Zero-based page request. Defaults to page 0 of size 10, unsorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: Option<Sort>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: None,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            sort: None,
        }
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.size == 0 {
            return Err(ApiError::InvalidPageRequest(
                "page size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Query parameters in wire order: `page`, `size`, then `sort` if set.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.size.to_string()),
        ];
        if let Some(sort) = &self.sort {
            pairs.push(("sort".to_string(), sort.to_string()));
        }
        pairs
    }
}
