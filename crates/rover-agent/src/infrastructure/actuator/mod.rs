//! Actuator implementations.
//!
//! - **`simulated`** – a software rover used by the agent binary when no
//!   hardware driver is configured.
//! - **`mock`** – a recording double for tests.

pub mod mock;
pub mod simulated;

pub use simulated::SimulatedActuator;
