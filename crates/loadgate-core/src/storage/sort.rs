//! Typed sort and paging parameters for list queries.
//!
//! Sort columns come from closed enums, so the rendered `ORDER BY` clause
//! never contains caller text.

use crate::model::ModelError;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

pub trait SortField: Copy + Default {
    fn column(&self) -> &'static str;
    fn parse(s: &str) -> Option<Self>;
}

/// Defaults to `name`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectSortField {
    Id,
    #[default]
    Name,
}

impl SortField for ProjectSortField {
    fn column(&self) -> &'static str {
        match self {
            ProjectSortField::Id => "id",
            ProjectSortField::Name => "name",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(ProjectSortField::Id),
            "name" => Some(ProjectSortField::Name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetailSortField {
    #[default]
    Id,
    Latency,
}

impl SortField for DetailSortField {
    fn column(&self) -> &'static str {
        match self {
            DetailSortField::Id => "id",
            DetailSortField::Latency => "latency",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(DetailSortField::Id),
            "latency" => Some(DetailSortField::Latency),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunSortField {
    #[default]
    Id,
    Count,
    Total,
    Average,
    Fastest,
    Slowest,
    Rps,
    Date,
}

impl SortField for RunSortField {
    fn column(&self) -> &'static str {
        match self {
            RunSortField::Id => "id",
            RunSortField::Count => "count",
            RunSortField::Total => "total",
            RunSortField::Average => "average",
            RunSortField::Fastest => "fastest",
            RunSortField::Slowest => "slowest",
            RunSortField::Rps => "rps",
            RunSortField::Date => "date",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "id" => RunSortField::Id,
            "count" => RunSortField::Count,
            "total" => RunSortField::Total,
            "average" => RunSortField::Average,
            "fastest" => RunSortField::Fastest,
            "slowest" => RunSortField::Slowest,
            "rps" => RunSortField::Rps,
            "date" => RunSortField::Date,
            _ => return None,
        })
    }
}

/// Defaults to the field's default column, descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub order: SortOrder,
}

pub type ProjectSort = Sort<ProjectSortField>;
pub type DetailSort = Sort<DetailSortField>;
pub type RunSort = Sort<RunSortField>;

impl<F: SortField> Sort<F> {
    pub fn new(field: F, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Parse request parameters such as `("latency", "asc")`. Both parts are
    /// matched exactly.
    pub fn parse(field: &str, order: &str) -> Result<Self, ModelError> {
        match (F::parse(field), SortOrder::parse(order)) {
            (Some(field), Some(order)) => Ok(Self { field, order }),
            _ => Err(ModelError::InvalidSort {
                field: field.to_string(),
                order: order.to_string(),
            }),
        }
    }

    /// `ORDER BY` body, with `id` as tie-breaker.
    pub(crate) fn order_by(&self) -> String {
        let column = self.field.column();
        if column == "id" {
            format!("id {}", self.order.as_sql())
        } else {
            format!("{} {}, id {}", column, self.order.as_sql(), self.order.as_sql())
        }
    }
}

/// Zero-based page of `size` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 0,
            size: 20,
        }
    }
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self { number, size }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} (size {})", self.number, self.size)
    }
}
