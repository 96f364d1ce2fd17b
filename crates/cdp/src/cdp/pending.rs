//! Pending request table
//!
//! Maps request ids to the oneshot that wakes the waiting caller. An entry is
//! removed in the same step that resolves it, so a reply can only land once.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;

use super::protocol::{CDPRequest, CDPResponse, RequestId};
use crate::error::{CDPError, Result};

/// Outcome delivered to a waiting caller
pub(crate) type Reply = Result<Value>;

struct PendingEntry {
    /// Kept for error context on failure replies
    request: CDPRequest,
    tx: oneshot::Sender<Reply>,
}

pub(crate) struct PendingRequests {
    entries: DashMap<RequestId, PendingEntry>,
    closed: AtomicBool,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a request before it is sent.
    ///
    /// Fails once the table is closed, so nothing registered late can hang.
    pub fn register(&self, request: CDPRequest) -> Result<oneshot::Receiver<Reply>> {
        if self.is_closed() {
            return Err(CDPError::ConnectionClosed);
        }

        let id = request.id.clone();
        let (tx, rx) = oneshot::channel();
        match self.entries.entry(id.clone()) {
            Entry::Occupied(_) => return Err(CDPError::DuplicateRequestId(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry { request, tx });
            }
        }

        // close_all may have drained between the first check and the insert.
        if self.is_closed() && self.entries.remove(&id).is_some() {
            return Err(CDPError::ConnectionClosed);
        }

        Ok(rx)
    }

    /// Resolve the entry matching `response`. Returns false if no entry
    /// exists (already resolved, abandoned, or never sent).
    pub fn complete(&self, response: CDPResponse) -> bool {
        let Some((_, entry)) = self.entries.remove(response.id()) else {
            return false;
        };

        let reply = match response {
            CDPResponse::Success { result, .. } => Ok(result),
            CDPResponse::Failure { error, .. } => Err(CDPError::RequestFailed {
                request: Box::new(entry.request),
                error,
            }),
        };
        let _ = entry.tx.send(reply); // Receiver gone means the caller gave up
        true
    }

    /// Drop an entry without resolving it.
    pub fn remove(&self, id: &RequestId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Close the table and fail every pending entry with `ConnectionClosed`.
    /// Returns how many callers were woken.
    pub fn close_all(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);

        let ids: Vec<RequestId> = self.entries.iter().map(|e| e.key().clone()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some((_, entry)) = self.entries.remove(&id) {
                let _ = entry.tx.send(Err(CDPError::ConnectionClosed));
                failed += 1;
            }
        }
        failed
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Removes the entry for an abandoned call when the caller's future is
/// dropped before the reply arrives.
pub(crate) struct PendingGuard<'a> {
    pending: &'a PendingRequests,
    id: RequestId,
}

impl<'a> PendingGuard<'a> {
    pub fn new(pending: &'a PendingRequests, id: RequestId) -> Self {
        Self { pending, id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::protocol::ProtocolError;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn request(id: &str) -> CDPRequest {
        CDPRequest {
            id: id.into(),
            session_id: None,
            method: "Page.navigate".to_string(),
            params: json!({"url": "https://example.com"}),
        }
    }

    #[test]
    fn test_register_and_complete() {
        let pending = PendingRequests::new();
        let rx = assert_ok!(pending.register(request("a")));
        assert_eq!(pending.len(), 1);

        assert!(pending.complete(CDPResponse::Success {
            id: "a".into(),
            result: json!({"frameId": "f1"}),
        }));
        assert_eq!(pending.len(), 0);

        let reply = rx.blocking_recv().unwrap();
        assert_eq!(reply.unwrap(), json!({"frameId": "f1"}));
    }

    #[test]
    fn test_duplicate_reply_is_unmatched() {
        let pending = PendingRequests::new();
        let _rx = assert_ok!(pending.register(request("a")));
        let reply = CDPResponse::Success {
            id: "a".into(),
            result: json!({}),
        };

        assert!(pending.complete(reply.clone()));
        assert!(!pending.complete(reply));
    }

    #[test]
    fn test_failure_carries_request() {
        let pending = PendingRequests::new();
        let rx = assert_ok!(pending.register(request("a")));
        let error = ProtocolError {
            code: Some(-32000),
            message: "Cannot navigate to invalid URL".to_string(),
            data: None,
        };

        assert!(pending.complete(CDPResponse::Failure {
            id: "a".into(),
            error: error.clone(),
        }));

        match rx.blocking_recv().unwrap() {
            Err(CDPError::RequestFailed {
                request: failed,
                error: got,
            }) => {
                assert_eq!(*failed, request("a"));
                assert_eq!(got, error);
            }
            other => panic!("expected RequestFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_complete_leaves_other_entries() {
        let pending = PendingRequests::new();
        let _a = assert_ok!(pending.register(request("a")));
        let mut b = assert_ok!(pending.register(request("b")));

        assert!(pending.complete(CDPResponse::Success {
            id: "a".into(),
            result: json!({}),
        }));
        assert_eq!(pending.len(), 1);
        assert!(b.try_recv().is_err());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let pending = PendingRequests::new();
        let _rx = assert_ok!(pending.register(request("a")));
        let err = assert_err!(pending.register(request("a")));
        assert!(matches!(err, CDPError::DuplicateRequestId(id) if id == "a"));
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_close_all_fails_everything() {
        let pending = PendingRequests::new();
        let a = assert_ok!(pending.register(request("a")));
        let b = assert_ok!(pending.register(request("b")));

        assert_eq!(pending.close_all(), 2);
        assert_eq!(pending.len(), 0);
        assert!(a.blocking_recv().unwrap().unwrap_err().is_connection_closed());
        assert!(b.blocking_recv().unwrap().unwrap_err().is_connection_closed());

        let err = assert_err!(pending.register(request("c")));
        assert!(err.is_connection_closed());
    }

    #[test]
    fn test_register_racing_close_never_leaks() {
        for _ in 0..50 {
            let pending = PendingRequests::new();
            let receivers = std::thread::scope(|scope| {
                let registrar = scope.spawn(|| {
                    let mut receivers = Vec::new();
                    for n in 0.. {
                        match pending.register(request(&format!("r{}", n))) {
                            Ok(rx) => receivers.push(rx),
                            Err(e) => {
                                assert!(e.is_connection_closed());
                                break;
                            }
                        }
                    }
                    receivers
                });
                scope.spawn(|| {
                    std::thread::yield_now();
                    pending.close_all();
                });
                registrar.join().unwrap()
            });

            // Every accepted registration was woken by close_all
            assert_eq!(pending.len(), 0);
            for mut rx in receivers {
                match rx.try_recv() {
                    Ok(Err(e)) => assert!(e.is_connection_closed()),
                    other => panic!("registration left unresolved: {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_guard_removes_abandoned_entry() {
        let pending = PendingRequests::new();
        let _rx = assert_ok!(pending.register(request("a")));
        {
            let _guard = PendingGuard::new(&pending, "a".into());
        }
        assert_eq!(pending.len(), 0);
    }
}
