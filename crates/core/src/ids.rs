//! Identity newtypes for graph entities
//!
//! Every node, attribute, and relationship is addressed by a UUID wrapped in
//! a type-specific newtype so the compiler rejects mixing, say, a node id
//! where a relationship id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub const fn from_uuid(id: Uuid) -> Self {
                $name(id)
            }

            /// Borrow the underlying UUID.
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                $name(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(EntityId, "Identifies a node: a Root, Node, Attribute, AttributeValue, Relationship, or Boolean vertex.");
uuid_id!(AttributeId, "Identifies an attribute schema slot on a kind, not a value.");
uuid_id!(RelationshipId, "Identifies a relationship schema slot on a kind, not an edge instance.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_ids_are_distinct() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn round_trips_through_uuid() {
        let id = EntityId::new();
        let raw: Uuid = id.into();
        assert_eq!(EntityId::from(raw), id);
    }
}
