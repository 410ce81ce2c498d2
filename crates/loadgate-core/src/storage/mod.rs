pub mod schema;
pub mod sort;
pub mod store;
mod store_internal;

pub use sort::{
    DetailSort, DetailSortField, Page, ProjectSort, ProjectSortField, RunSort, RunSortField, Sort,
    SortOrder,
};
pub use store::{SqliteStore, StoreError};
