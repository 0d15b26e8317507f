//! Logging facade.
//!
//! Emissions route to the `log` crate behind the `log` cargo feature and
//! compile away without it.

/// Emit a record at the given level, e.g. `emit!(warn, "accept failed")`.
///
/// The level is any of the `log` crate level macros: `trace`, `debug`,
/// `info`, `warn`, `error`.
macro_rules! emit {
    ($level:ident, $($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::$level!($($tt)*);
    };
}

pub(crate) use emit;
