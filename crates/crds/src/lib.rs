//! BMC CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the BMC server controller.

pub mod server;
pub mod status;

pub use server::*;
pub use status::*;
