pub mod error;
pub mod ids;
pub mod messages;
pub mod operations;
pub mod value;

pub use error::CoreError;
pub use ids::*;
pub use messages::{CommitRequest, CommitResponse, InputOperations, InputXlog, XlogRecord};
pub use operations::{BinaryCondition, BinaryPred, ColumnValues, Operation, RangeCondition, RangePred};
pub use value::Value;
