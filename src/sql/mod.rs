pub mod accumulator;
pub mod extract;
pub mod parser;

pub use accumulator::{Accumulation, StatementAccumulator};
pub use extract::extract_tables;
pub use parser::parse_statements;
