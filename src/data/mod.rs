//! Data module - loading, cleaning, reshaping and aggregation stages

mod aggregate;
mod columns;
mod encode;
mod filter;
mod join;
mod loader;
mod processor;

pub use aggregate::{AggregateSpec, Aggregator, Reduction};
pub use columns::{
    column_names, float_column, is_numeric, require_columns, string_column,
    unique_values,
};
pub use encode::{
    flag_value, hour_label, hour_name, month_label, month_name, parse_date_column, year_of,
};
pub use filter::{ExclusionSet, FilterRule, RowFilter};
pub use join::Joiner;
pub use loader::DataLoader;
pub use processor::{DataProcessor, DATE_COLUMN};
