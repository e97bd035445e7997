//! Macros for string-backed enums
//!
//! Queue item states and eviction policies are written to logs and read from
//! configuration files, so they share one Display/FromStr implementation.

/// Implements Display and FromStr traits for status enums
///
/// This macro generates:
/// - Display trait: converts enum variants to lowercase strings
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their string
///   representations
///
/// # Features
///
/// - Case-insensitive parsing (e.g., "PENDING", "pending", "Pending" all work)
/// - Consistent lowercase string output
/// - Descriptive error messages with enum name
///
/// # Example
///
/// ```rust
/// use cachefront_common::impl_status_conversions;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// pub enum DeliveryState {
///     Ready,
///     InFlight,
///     Acked,
/// }
///
/// impl_status_conversions!(DeliveryState {
///     Ready => "ready",
///     InFlight => "in_flight",
///     Acked => "acked",
/// });
///
/// assert_eq!(DeliveryState::InFlight.to_string(), "in_flight");
/// assert_eq!("ACKED".parse::<DeliveryState>(), Ok(DeliveryState::Acked));
/// ```
#[macro_export]
macro_rules! impl_status_conversions {
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
