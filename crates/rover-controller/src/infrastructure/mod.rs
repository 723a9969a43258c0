//! Infrastructure layer for the controller.
//!
//! Contains the operator console (stdin line parser) and configuration file
//! storage.  The bus itself lives in `rover-link`.
//!
//! **Dependency rule**: this layer may depend on `application`, `rover_core`
//! and `rover_link`, but MUST NOT be imported by the `application` layer.

pub mod console;
pub mod storage;
