//! Declarative helpers for domain enums and cached value types
//!
//! - [`impl_domain_status_conversions!`]: `Display` + case-insensitive
//!   `FromStr` for string-tagged enums such as consistency modes and write
//!   types.
//! - [`impl_cacheable!`]: marks a plain value type as cacheable.
//! - [`impl_etag_cacheable!`]: marks a type as cacheable *and* versioned by
//!   an `Option<String>` etag field, so replaces are compare-and-swap.
//!
//! # Example
//!
//! ```rust
//! use cachefront_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Tier {
//!     Hot,
//!     Cold,
//! }
//!
//! impl_domain_status_conversions!(Tier {
//!     Hot => "hot",
//!     Cold => "cold",
//! });
//!
//! assert_eq!(Tier::Hot.to_string(), "hot");
//! assert_eq!("COLD".parse::<Tier>(), Ok(Tier::Cold));
//! ```

/// Implements Display and FromStr traits for status enums
///
/// This macro generates:
/// - Display trait: writes the mapped string
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// Mapped strings must be lowercase for parsing to round-trip.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

/// Marks types without a version token as cacheable
///
/// ```rust
/// use cachefront_domain::{impl_cacheable, Cacheable};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct Profile {
///     name: String,
/// }
///
/// impl_cacheable!(Profile);
///
/// let profile = Profile { name: "ada".into() };
/// assert!(profile.as_etag_entity().is_none());
/// ```
#[macro_export]
macro_rules! impl_cacheable {
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::cacheable::Cacheable for $ty {})+
    };
}

/// Marks a type carrying an `Option<String>` etag field as a versioned
/// cacheable entity
///
/// ```rust
/// use cachefront_domain::{impl_etag_cacheable, Cacheable, EtagEntity};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct Account {
///     balance: i64,
///     etag: Option<String>,
/// }
///
/// impl_etag_cacheable!(Account, etag);
///
/// let mut account = Account { balance: 10, etag: None };
/// account.as_etag_entity_mut().unwrap().set_etag("v1".into());
/// assert_eq!(account.etag(), Some("v1"));
/// ```
#[macro_export]
macro_rules! impl_etag_cacheable {
    ($ty:ty, $field:ident) => {
        impl $crate::cacheable::EtagEntity for $ty {
            fn etag(&self) -> Option<&str> {
                self.$field.as_deref()
            }

            fn set_etag(&mut self, etag: String) {
                self.$field = Some(etag);
            }
        }

        impl $crate::cacheable::Cacheable for $ty {
            fn as_etag_entity(&self) -> Option<&dyn $crate::cacheable::EtagEntity> {
                Some(self)
            }

            fn as_etag_entity_mut(&mut self) -> Option<&mut dyn $crate::cacheable::EtagEntity> {
                Some(self)
            }
        }
    };
}
