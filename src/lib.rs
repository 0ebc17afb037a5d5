pub mod config;
pub mod executor;
pub mod github;
pub mod harvest;
pub mod metrics;
pub mod model;
pub mod scheduler;
pub mod server;
pub mod traits;

// Re-export common types for convenience
pub use executor::*;
pub use model::*;
pub use traits::*;
