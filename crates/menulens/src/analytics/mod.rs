pub mod bcg;
pub mod elasticity;
pub mod metrics;
pub mod service;
pub mod stats;
