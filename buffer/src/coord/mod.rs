//! Coordination primitives shared by the buffer's producer and consumer sides.

pub mod capacity_gate;

pub use capacity_gate::{AcquireFuture, CapacityGate};
