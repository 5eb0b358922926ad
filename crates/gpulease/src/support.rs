use std::fmt;

/// Result of a platform capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Available,
    Unsupported(UnsupportedReason),
}

impl Support {
    pub fn is_supported(&self) -> bool {
        matches!(self, Support::Available)
    }

    /// Human readable diagnostic for logs and UI fallbacks.
    ///
    /// Returns the unknown-reason text for [`Support::Available`] so callers
    /// can print it unconditionally after a failed acquisition.
    pub fn reason(&self) -> String {
        match self {
            Support::Available => UnsupportedReason::Unknown.to_string(),
            Support::Unsupported(reason) => reason.to_string(),
        }
    }
}

/// Why GPU access is not available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// No graphics API is enabled for this process (empty backend set,
    /// missing driver interface).
    NoGraphicsApi,
    /// A graphics API exists but the host cannot reach an adapter, e.g. a
    /// headless container or sandbox.
    HostEnvironment,
    Unknown,
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedReason::NoGraphicsApi => f.write_str(
                "no graphics API is enabled; enable at least one of Vulkan, Metal, DX12 or GL",
            ),
            UnsupportedReason::HostEnvironment => f.write_str(
                "no GPU adapter is reachable from this environment (headless or sandboxed host)",
            ),
            UnsupportedReason::Unknown => f.write_str("GPU access is unavailable for an unknown reason"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_distinguishable() {
        let api = UnsupportedReason::NoGraphicsApi.to_string();
        let host = UnsupportedReason::HostEnvironment.to_string();
        let unknown = UnsupportedReason::Unknown.to_string();
        assert_ne!(api, host);
        assert_ne!(host, unknown);
        assert_ne!(api, unknown);
    }

    #[test]
    fn available_reports_supported() {
        assert!(Support::Available.is_supported());
        let unsupported = Support::Unsupported(UnsupportedReason::HostEnvironment);
        assert!(!unsupported.is_supported());
        assert!(unsupported.reason().contains("headless"));
    }
}
