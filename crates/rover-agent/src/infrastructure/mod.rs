//! Infrastructure layer for the agent.
//!
//! Contains the hardware adapters behind the
//! [`Actuator`](crate::application::drive::Actuator) trait and configuration
//! file storage.
//!
//! **Dependency rule**: this layer may depend on `application`, `rover_core`
//! and `rover_link`, but MUST NOT be imported by the `application` layer.

pub mod actuator;
pub mod storage;
