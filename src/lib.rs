//! SATA link layer.
//!
//! Re-exports the link model from `satalink-core` and the wire vocabulary from
//! `satalink-wire` so downstream code can depend on a single crate.

pub use satalink_core::*;

pub mod wire {
    pub use satalink_wire::*;
}
