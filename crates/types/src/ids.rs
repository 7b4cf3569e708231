//! Identifier newtypes exchanged with the cloud facade.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker substring the backend places in a redirection URL while the
/// attached service is still provisioning.
pub const PLACEHOLDER_MARKER: &str = "null";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a workflow container, minted by the backend on creation.
    WorkflowId
);

string_id!(
    /// Name of an atomic service registered with the backend.
    AtomicServiceId
);

string_id!(
    /// Identifier of a reusable atomic service configuration.
    AtomicServiceConfigId
);

string_id!(
    /// Externally reachable URL of a provisioned service instance.
    ResolvedEndpoint
);

impl ResolvedEndpoint {
    /// Whether the backend is still reporting its "not yet routable" value.
    pub fn is_placeholder(&self) -> bool {
        self.0.contains(PLACEHOLDER_MARKER)
    }
}

/// Opaque bearer credential supplied per call.
///
/// The ticket travels as the password half of HTTP basic auth with an empty
/// username. It is never inspected, cached or printed; `Debug` and `Display`
/// both render a redacted marker.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Ticket(String);

impl Ticket {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw credential, for placing on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ticket(<redacted>)")
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl From<String> for Ticket {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Ticket {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
