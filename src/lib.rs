pub mod endpoint;
pub mod error;
pub mod logger;
pub mod resolver;
pub mod wait;

pub use endpoint::Endpoint;
pub use error::WaitError;
pub use wait::{
    wait_for, BudgetPolicy, Coordinator, EndpointStatus, ReachabilityReport, WaitConfig,
    WaitResult,
};
