pub mod catalog;
pub mod dedup;
pub mod encode;
pub mod error;
pub mod labels;
pub mod reader;
pub mod rows;
pub mod sample;
pub mod summary;

pub use catalog::Catalog;
pub use dedup::{DedupStats, dedup_partition, dedup_partitions, remove_consecutive_duplicates};
pub use error::{DataErr, Result};
pub use labels::LabelSpace;
pub use rows::{LabeledRows, RowsReport};
pub use sample::{Partition, Sample};
pub use summary::DataSummary;
