pub mod config;
pub mod error;
pub mod logging;

pub use config::{ChannelConfig, ExecutorConfig, PoolConfig, StintConfig};
pub use error::*;
pub use logging::init_tracing;
