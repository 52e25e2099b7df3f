use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

/// Commit timestamp attached to a ledger write.
///
/// Mirrors the seconds/nanos split used by ledger transaction headers.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerTimestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl LedgerTimestamp {
    pub const fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            seconds: elapsed.as_secs() as i64,
            nanos: elapsed.subsec_nanos() as i32,
        }
    }

    /// Render as RFC 3339 in UTC with whole seconds, e.g. `2024-05-01T10:00:00Z`.
    pub fn to_rfc3339(&self) -> CodecResult<String> {
        let invalid = || CodecError::InvalidTimestamp {
            seconds: self.seconds,
            nanos: self.nanos,
        };
        let nanos = u32::try_from(self.nanos).map_err(|_| invalid())?;
        let at = DateTime::from_timestamp(self.seconds, nanos).ok_or_else(invalid)?;
        Ok(at.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl fmt::Debug for LedgerTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerTimestamp({}.{:09})", self.seconds, self.nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_utc_rfc3339() {
        let ts = LedgerTimestamp::new(1_714_557_600, 0);
        assert_eq!(ts.to_rfc3339().unwrap(), "2024-05-01T10:00:00Z");
    }

    #[test]
    fn sub_second_part_is_truncated() {
        let ts = LedgerTimestamp::new(0, 999_999_999);
        assert_eq!(ts.to_rfc3339().unwrap(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn negative_nanos_are_rejected() {
        let ts = LedgerTimestamp::new(10, -1);
        assert_eq!(
            ts.to_rfc3339(),
            Err(CodecError::InvalidTimestamp { seconds: 10, nanos: -1 })
        );
    }

    #[test]
    fn ordering_follows_time() {
        let a = LedgerTimestamp::new(5, 10);
        let b = LedgerTimestamp::new(5, 11);
        let c = LedgerTimestamp::new(6, 0);
        assert!(a < b && b < c);
    }

    #[test]
    fn now_is_after_epoch() {
        assert!(LedgerTimestamp::now().seconds > 0);
    }
}
