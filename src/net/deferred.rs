//! Send-on-shutdown delivery: beacons are queued in memory and flushed
//! when the transport is dropped (or on an explicit `flush`).

use std::sync::Mutex;

use super::Transport;
use crate::error::{Error, Result};
use crate::request::Request;

pub struct DeferredTransport<T: Transport> {
    inner: T,
    queue: Mutex<Vec<Request>>,
}

impl<T: Transport> DeferredTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Requests waiting to be sent.
    pub fn pending(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    /// Send everything queued so far, in order. Failed requests are logged
    /// and dropped; returns how many were delivered.
    pub fn flush(&self) -> Result<usize> {
        let queued = {
            let mut queue = self
                .queue
                .lock()
                .map_err(|_| Error::Delivery("Deferred queue lock poisoned".into()))?;
            std::mem::take(&mut *queue)
        };

        let total = queued.len();
        let mut sent = 0;
        for request in &queued {
            match self.inner.deliver(request) {
                Ok(_) => sent += 1,
                Err(e) => log::warn!("deferred {} beacon dropped: {}", request.kind, e),
            }
        }
        if total > 0 {
            log::debug!("flushed {}/{} deferred beacons", sent, total);
        }
        Ok(sent)
    }
}

impl<T: Transport> Transport for DeferredTransport<T> {
    fn deliver(&self, request: &Request) -> Result<Option<String>> {
        self.queue
            .lock()
            .map_err(|_| Error::Delivery("Deferred queue lock poisoned".into()))?
            .push(request.clone());
        Ok(None)
    }
}

impl<T: Transport> Drop for DeferredTransport<T> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("could not flush deferred beacons: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::request::BeaconKind;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Transport for Recorder {
        fn deliver(&self, request: &Request) -> Result<Option<String>> {
            if request.query.contains("fail") {
                return Err(Error::Delivery("refused".into()));
            }
            self.seen.lock().unwrap().push(request.query.clone());
            Ok(Some("ok".into()))
        }
    }

    fn request(query: &str) -> Request {
        Request::render(BeaconKind::Event, &Config::default(), query.into(), None, None)
    }

    #[test]
    fn test_queue_until_flush() {
        let recorder = Arc::new(Recorder::default());
        let deferred = DeferredTransport::new(recorder.clone());

        assert_eq!(deferred.deliver(&request("a=1")).unwrap(), None);
        assert_eq!(deferred.deliver(&request("a=2")).unwrap(), None);
        assert_eq!(deferred.pending(), 2);
        assert!(recorder.seen.lock().unwrap().is_empty());

        assert_eq!(deferred.flush().unwrap(), 2);
        assert_eq!(deferred.pending(), 0);
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["a=1", "a=2"]);
    }

    #[test]
    fn test_flush_on_drop() {
        let recorder = Arc::new(Recorder::default());
        {
            let deferred = DeferredTransport::new(recorder.clone());
            deferred.deliver(&request("a=1")).unwrap();
        }
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["a=1"]);
    }

    #[test]
    fn test_failed_requests_do_not_stop_flush() {
        let recorder = Arc::new(Recorder::default());
        let deferred = DeferredTransport::new(recorder.clone());
        deferred.deliver(&request("fail=1")).unwrap();
        deferred.deliver(&request("a=2")).unwrap();

        assert_eq!(deferred.flush().unwrap(), 1);
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["a=2"]);
    }
}
