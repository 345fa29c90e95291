//! Post-processing of agent traces

mod sql_extractor;

pub use sql_extractor::{extract_sql, extract_sql_or_sentinel, SQL_NOT_FOUND};
