pub mod integrator;

pub use integrator::{DataIntegrator, JoinType, MergeConfig};
