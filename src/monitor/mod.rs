mod service;

pub use service::{CycleOutcome, MonitorService};
