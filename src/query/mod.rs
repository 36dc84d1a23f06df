// BayunJoin Query Processing Module
//
// This module contains the query execution components.

pub mod executor;

// Export key public interfaces
pub use executor::result::QueryResult;
