mod result_set;
mod row;

pub use result_set::{ResultSet, RowStreamSummary};
pub use row::CustomDbRow;
