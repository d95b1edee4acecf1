//! Client side of the supervision daemon's XML-RPC interface.

mod client;
mod errors;
mod state;

pub use client::{SupervisorClient, XmlRpcSupervisor, instance_name};
pub use errors::SupervisorError;
pub use state::ProcessState;

#[cfg(test)]
pub(crate) use client::MockSupervisorClient;
