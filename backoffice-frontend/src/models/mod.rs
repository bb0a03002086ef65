pub mod operator;
pub mod views;

pub use operator::{Operator, ACCESS_TOKEN_KEY};
pub use views::{PageResponse, QueryError, RequestView, SessionView};
