//! Type-safe identifiers.
//!
//! Every entity is keyed by a newtype around [`uuid::Uuid`] so that a room
//! id cannot be passed where a booking id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Creates an identifier from an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of a reservation.
    BookingId
);
uuid_id!(
    /// Identifier of a bookable resource (meeting room).
    ResourceId
);
uuid_id!(
    /// Identifier of a coworking site.
    SiteId
);
uuid_id!(
    /// Identifier of an individual user.
    UserId
);
uuid_id!(
    /// Identifier of a client company.
    CompanyId
);
uuid_id!(
    /// Identifier of a server-held booking wizard session.
    WizardId
);
uuid_id!(
    /// Identifier of an explicit credit transaction record.
    TransactionId
);

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        assert_ne!(BookingId::new(), BookingId::new());
    }

    #[test]
    fn display_is_uuid_format() {
        let s = ResourceId::new().to_string();
        assert_eq!(s.len(), 36);
        assert!(s.contains('-'));
    }

    #[test]
    fn parses_from_display() {
        let id = SiteId::new();
        let Ok(parsed) = id.to_string().parse::<SiteId>() else {
            panic!("parse failed");
        };
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<SiteId>().is_err());
    }

    #[test]
    fn serializes_transparently() {
        let uuid = uuid::Uuid::new_v4();
        let id = CompanyId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn hash_works_in_hashmap() {
        use std::collections::HashMap;
        let id = UserId::new();
        let mut map = HashMap::new();
        map.insert(id, "alice");
        assert_eq!(map.get(&id), Some(&"alice"));
    }
}
