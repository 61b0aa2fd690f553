/// In debug builds, panics on failure like `debug_assert!`.
/// In release builds, logs an error via `tracing::error!` instead of
/// aborting the event loop thread over an internal invariant.
macro_rules! safe_assert {
    ($cond:expr $(,)?) => {
        #[cfg(debug_assertions)]
        { debug_assert!($cond); }
        #[cfg(not(debug_assertions))]
        { if !$cond { tracing::error!("ASSERT FAILED: {}", stringify!($cond)); } }
    };
    ($cond:expr, $($arg:tt)+) => {
        #[cfg(debug_assertions)]
        { debug_assert!($cond, $($arg)+); }
        #[cfg(not(debug_assertions))]
        { if !$cond { tracing::error!($($arg)+); } }
    };
}

pub(crate) use safe_assert;
