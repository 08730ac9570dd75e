//! Maps `Box<dyn Error>` from the `Instrument` boundary to typed `CyclerError`.
//!
//! The traits in `cycler_traits` use `Box<dyn Error + Send + Sync>` for
//! maximum flexibility; this module converts those to our typed error enum,
//! with an optional feature-gated path for `cycler_hardware::HwError`
//! downcasting.

use crate::error::CyclerError;

/// Map a trait-boundary error to a typed `CyclerError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_link_error(e: &(dyn std::error::Error + 'static)) -> CyclerError {
    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<cycler_hardware::error::HwError>() {
            return match hw {
                cycler_hardware::error::HwError::Timeout => CyclerError::Timeout,
                other => CyclerError::LinkFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        CyclerError::Timeout
    } else {
        CyclerError::Link(s)
    }
}
