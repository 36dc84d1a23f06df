// Catalog Module
//
// Field types and schemas shared by every operator in the executor.

pub mod column;
pub mod schema;

pub use column::Column;
pub use schema::{DataType, Schema, SchemaRef};
