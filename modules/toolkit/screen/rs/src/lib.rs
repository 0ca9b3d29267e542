pub use aggregate::{aggregate, Aggregated};
pub use config::Config;
pub use decode::{decode, decode_into, Symbol, Tally};
pub use engine::{Engine, EngineBuilder};
pub use lookup::Lookup;
pub use record::build;
pub use report::{SampleReport, SampleReportAssembler, Screened};
pub use result::{Outcome, Stats};

mod aggregate;
mod config;
mod decode;
mod engine;
pub mod lookup;
mod record;
mod report;
mod result;
mod worker;
