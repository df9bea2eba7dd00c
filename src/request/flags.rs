use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};

/// Per-call lifecycle flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestFlags {
    /// Skip the blocking guard and the cache lookup, always dispatch.
    pub is_invalidate: bool,
    /// Warm the cache without publishing lifecycle state.
    pub is_pre_process: bool,
}

impl RequestFlags {
    pub const fn invalidate() -> Self {
        Self {
            is_invalidate: true,
            is_pre_process: false,
        }
    }

    pub const fn pre_process() -> Self {
        Self {
            is_invalidate: false,
            is_pre_process: true,
        }
    }

    /// The two flags are mutually exclusive.
    pub fn validate(&self) -> Result<()> {
        if self.is_invalidate && self.is_pre_process {
            return Err(Error::configuration_with_context(
                "is_invalidate and is_pre_process cannot be used together",
                ErrorContext::new()
                    .with_field_path("flags")
                    .with_details("is_invalidate = true, is_pre_process = true"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_flags_are_rejected() {
        let flags = RequestFlags {
            is_invalidate: true,
            is_pre_process: true,
        };
        assert!(flags.validate().unwrap_err().is_configuration());
        assert!(RequestFlags::invalidate().validate().is_ok());
        assert!(RequestFlags::pre_process().validate().is_ok());
        assert!(RequestFlags::default().validate().is_ok());
    }
}
