//! Macros for changelog error handling.
//!
//! Shorthands for building [`crate::error::EtlError`] values and returning them early.

/// Creates an [`crate::error::EtlError`] from error kind and description.
///
/// An optional third argument is rendered with [`ToString`] and stored as the dynamic detail,
/// and an optional `source:` attaches the originating error.
#[macro_export]
macro_rules! etl_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::EtlError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::EtlError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::EtlError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::EtlError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns an [`crate::error::EtlError`] from the current function.
///
/// Accepts the same arguments as [`etl_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr $(, $($rest:tt)+)?) => {
        return ::core::result::Result::Err($crate::etl_error!($kind, $desc $(, $($rest)+)?))
    };
}

/// Returns an [`crate::error::EtlError`] unless the condition holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $kind:expr, $desc:expr $(, $($rest:tt)+)?) => {
        if !$cond {
            $crate::bail!($kind, $desc $(, $($rest)+)?);
        }
    };
}
