//! Newtype IDs for type-safe entity references.
//!
//! Two flavors exist because the backend is inconsistent about identifiers:
//! users are numbered rows, while products and orders are opaque strings the
//! client must never interpret.

/// Macro to define a numeric ID wrapper.
///
/// Creates a newtype wrapper around `i64` with transparent serde, `Display`,
/// and conversions to and from the raw integer.
///
/// # Example
///
/// ```rust
/// # use vdiamond_core::define_id;
/// define_id!(AddressId);
///
/// let id = AddressId::new(7);
/// assert_eq!(id.as_i64(), 7);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Macro to define an opaque string ID wrapper.
///
/// The wrapped value is compared byte-for-byte and otherwise left alone.
///
/// ```rust
/// # use vdiamond_core::define_string_id;
/// define_string_id!(CouponCode);
///
/// let code = CouponCode::new("WELCOME10");
/// assert_eq!(code.as_str(), "WELCOME10");
/// ```
#[macro_export]
macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the identifier.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);

define_string_id!(ProductId);
define_string_id!(OrderId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&UserId::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_product_id_serializes_as_bare_string() {
        let id: ProductId = serde_json::from_str("\"ring-001\"").unwrap();
        assert_eq!(id, ProductId::new("ring-001"));
        assert_eq!(id.to_string(), "ring-001");
    }

    #[test]
    fn test_product_ids_are_case_sensitive() {
        assert_ne!(ProductId::from("A"), ProductId::from("a"));
    }
}
