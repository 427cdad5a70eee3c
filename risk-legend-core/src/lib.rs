pub mod bins;
pub mod color;
pub mod columns;
pub mod confusion;
pub mod description;
pub mod export;
pub mod histogram;
pub mod intervals;
pub mod io;
pub mod legend;
pub mod ranges;
pub use risk_legend_common::{LegendError, RangeFault, Result};
pub use intervals::{truncate, ContinuityMode, ContinuityReport, ContinuityViolation, Interval, PartitionOptions, Partitioner};
pub use description::DescriptionTable;
pub use legend::{Legend, LegendBatch, LegendBuilder, LegendCheck, LegendRow, LegendStyle, StyleTable};
pub use ranges::{IndicatorRange, RangeAccumulator};
