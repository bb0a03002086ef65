pub mod filter;
pub mod search;
pub mod service;

pub use filter::{
    PageRequest, ProfileFilter, RemotePage, RequestFilter, RoleFilter, SearchQuery, UserFilter,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use search::{DebouncedSearch, SearchResult, SearchSequencer};
pub use service::{QueryOutcome, RequestQueryService};
