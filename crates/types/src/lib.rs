//! Shared types for the cloud facade client.
//!
//! The identifiers in [`ids`] are thin string newtypes minted either by the
//! backend (workflow ids, configuration ids) or by the caller (atomic service
//! ids, tickets). The [`outcome`] module defines the single result convention
//! every facade operation returns.

pub mod ids;
pub mod outcome;

pub use ids::{AtomicServiceConfigId, AtomicServiceId, PLACEHOLDER_MARKER, ResolvedEndpoint, Ticket, WorkflowId};
pub use outcome::{FailureKind, OperationFailure, OperationResult};
