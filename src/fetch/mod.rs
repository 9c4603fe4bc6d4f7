//! Paginated, mirror-cached list fetching and the entity client built on it.

mod accessor;
mod client;
mod layer;

pub use accessor::{CollectionAccessor, RemotePage};
pub use client::{Entity, SpaClient};
pub use layer::{
  Page, PageRequest, PageSource, PaginatedCachedFetch, DEFAULT_PAGE_SIZE, FRESHNESS_MINUTES,
};
