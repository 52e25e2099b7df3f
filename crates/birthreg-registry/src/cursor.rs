use birthreg_ledger::{LedgerError, LedgerIterator};
use tracing::warn;

use crate::error::{RegistryError, RegistryResult};

/// Owns a ledger cursor for the duration of one operation.
///
/// The cursor is closed when fully drained and, on any early return, when
/// the guard is dropped.
pub(crate) struct ScopedCursor<T: 'static> {
    inner: Box<dyn LedgerIterator<T>>,
    closed: bool,
}

impl<T: 'static> ScopedCursor<T> {
    pub(crate) fn new(inner: Box<dyn LedgerIterator<T>>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Drain the cursor through `f`, stopping at the first failure.
    pub(crate) fn try_collect<U>(
        mut self,
        on_ledger_error: fn(LedgerError) -> RegistryError,
        mut f: impl FnMut(T) -> RegistryResult<U>,
    ) -> RegistryResult<Vec<U>> {
        let mut out = Vec::new();
        while let Some(item) = self.inner.next() {
            let item = item.map_err(on_ledger_error)?;
            out.push(f(item)?);
        }
        self.closed = true;
        self.inner.close().map_err(on_ledger_error)?;
        Ok(out)
    }
}

impl<T: 'static> Drop for ScopedCursor<T> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.inner.close() {
                warn!(error = %e, "failed to close ledger cursor");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use birthreg_ledger::{InMemoryLedger, LedgerStub};

    use super::*;

    #[test]
    fn drained_cursor_is_closed() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin("Org1MSP");
        tx.put_state("k", b"v").unwrap();
        tx.commit().unwrap();

        let tx = ledger.begin("Org1MSP");
        let cursor = ScopedCursor::new(tx.get_history_for_key("k").unwrap());
        let values = cursor
            .try_collect(RegistryError::StoreRead, |m| Ok(m.value))
            .unwrap();
        assert_eq!(values, vec![b"v".to_vec()]);
        assert_eq!(ledger.open_cursors(), 0);
    }

    #[test]
    fn failing_callback_still_closes() {
        let ledger = InMemoryLedger::new();
        for value in [b"a", b"b"] {
            let tx = ledger.begin("Org1MSP");
            tx.put_state("k", value).unwrap();
            tx.commit().unwrap();
        }

        let tx = ledger.begin("Org1MSP");
        let cursor = ScopedCursor::new(tx.get_history_for_key("k").unwrap());
        let err = cursor
            .try_collect::<()>(RegistryError::StoreRead, |_| {
                Err(RegistryError::Decoding("bad".into()))
            })
            .unwrap_err();
        assert_eq!(err, RegistryError::Decoding("bad".into()));
        assert_eq!(ledger.open_cursors(), 0);
    }
}
