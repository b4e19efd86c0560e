//! Shared primitives for the Ouinet distributed cache: resource and swarm
//! naming, and the error kinds every other crate wraps.

pub mod error;
pub mod resource_id;
pub mod swarm;

pub use error::CoreError;
pub use resource_id::ResourceId;
pub use swarm::{GroupName, InfoHash, SwarmName};
