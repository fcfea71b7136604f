pub mod fetch;
pub mod populate;
pub mod progress;
pub mod registry;

pub use fetch::{FetchConfig, SpecFetcher};
pub use populate::{populate, PopulateSummary};
pub use progress::{IndexProgress, ProgressSnapshot, ServiceStatus};
pub use registry::{load_registry, ServiceEntry};
