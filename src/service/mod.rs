//! Query and mutation services over the record store.

mod mutation;
mod query;

pub use mutation::{MutationOptions, MutationService};
pub use query::QueryService;
