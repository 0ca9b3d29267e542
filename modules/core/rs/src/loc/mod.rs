pub use interval::{Interval, IntervalOp};
pub use region::Region;

mod interval;
mod region;
