//! Type-safe identifier wrappers around plant tag strings.
//!
//! Tanks and pumps are provisioned once with stable tag names such as
//! `T-100` and `P-100`. Wrapping them in distinct newtypes prevents
//! passing a pump tag where a tank tag is expected. On the wire they
//! serialize as plain strings.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around a [`String`] tag with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from a tag name.
            pub fn new(tag: impl Into<String>) -> Self {
                Self(tag.into())
            }

            /// Borrow the tag name.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(tag: &str) -> Self {
                Self(tag.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(tag: String) -> Self {
                Self(tag)
            }
        }
    };
}

define_id! {
    /// Identifier of a monitored tank (for example `T-100`).
    TankId
}

define_id! {
    /// Identifier of a pump (for example `P-100`).
    PumpId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TankId::new("T-100");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"T-100\"");
    }

    #[test]
    fn id_display_matches_tag() {
        let id = PumpId::from("P-200");
        assert_eq!(id.to_string(), "P-200");
        assert_eq!(id.as_str(), "P-200");
    }
}
