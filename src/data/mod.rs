//! Data structures for metabarcoding survey tables.

mod dataset;
mod schema;
mod table;

pub use dataset::{delimiter_for_path, Dataset, Record};
pub use schema::{
    resolve_schema, ColumnNames, DetectionScope, ReportLabels, ResolvedSchema, SchemaConvention,
};
pub use table::{DetectionTable, FinalRow, FinalTable, ReadSumTable, Table, TaxonCount};
