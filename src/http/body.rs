//! Response body that owns the tenant's running slot.
//!
//! The handler returns as soon as response headers are ready; the body keeps
//! streaming afterwards. Holding the permit inside the body keeps the slot
//! occupied until the last frame is relayed or the body is dropped (client
//! went away, write failed).

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};

use crate::admission::RunningPermit;
use crate::observability::metrics;

pub struct AdmittedBody {
    inner: Body,
    permit: Option<RunningPermit>,
    started: Instant,
}

impl AdmittedBody {
    /// `started` is when the request entered dispatch.
    pub fn new(inner: Body, permit: RunningPermit, started: Instant) -> Self {
        Self {
            inner,
            permit: Some(permit),
            started,
        }
    }

    /// Release the slot and record the request duration. Runs once.
    fn finish(&mut self) {
        if let Some(permit) = self.permit.take() {
            metrics::record_completed(permit.gate().tenant(), self.started);
        }
    }
}

impl HttpBody for AdmittedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            // Exchange finished (or failed): free the slot now.
            self.finish();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for AdmittedBody {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::AdmissionGate;
    use ::metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
    use std::sync::{Arc, Mutex};

    /// Keeps the name and tenant label of every histogram registered.
    #[derive(Default)]
    struct HistogramLog(Mutex<Vec<String>>);

    impl Recorder for HistogramLog {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
            Counter::noop()
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            let tenant = key
                .labels()
                .find(|l| l.key() == "tenant")
                .map(|l| l.value().to_string())
                .unwrap_or_default();
            self.0.lock().unwrap().push(format!("{}:{tenant}", key.name()));
            Histogram::noop()
        }
    }

    #[tokio::test]
    async fn test_slot_held_until_body_consumed() {
        let gate = Arc::new(AdmissionGate::new("body", 1, 1));
        let permit = gate.admit().await.unwrap();

        let body = AdmittedBody::new(Body::from("payload"), permit, Instant::now());
        assert_eq!(gate.occupancy().running, 1);

        let bytes = axum::body::to_bytes(Body::new(body), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"payload");
        assert_eq!(gate.occupancy().running, 0);
    }

    #[tokio::test]
    async fn test_slot_released_when_body_dropped() {
        let gate = Arc::new(AdmissionGate::new("body", 1, 1));
        let permit = gate.admit().await.unwrap();

        let body = AdmittedBody::new(Body::from("never read"), permit, Instant::now());
        drop(body);
        assert_eq!(gate.occupancy().running, 0);
    }

    #[tokio::test]
    async fn test_duration_recorded_once_after_streaming() {
        let log = HistogramLog::default();
        let _guard = ::metrics::set_default_local_recorder(&log);

        let gate = Arc::new(AdmissionGate::new("shop", 1, 1));
        let permit = gate.admit().await.unwrap();
        let body = AdmittedBody::new(Body::from("payload"), permit, Instant::now());
        assert!(log.0.lock().unwrap().is_empty());

        // Ends the stream, then drops the body.
        axum::body::to_bytes(Body::new(body), usize::MAX).await.unwrap();
        assert_eq!(*log.0.lock().unwrap(), ["proxy_request_duration_seconds:shop"]);
    }

    #[tokio::test]
    async fn test_duration_recorded_when_dropped_mid_stream() {
        let log = HistogramLog::default();
        let _guard = ::metrics::set_default_local_recorder(&log);

        let gate = Arc::new(AdmissionGate::new("shop", 1, 1));
        let permit = gate.admit().await.unwrap();
        drop(AdmittedBody::new(Body::from("unread"), permit, Instant::now()));
        assert_eq!(*log.0.lock().unwrap(), ["proxy_request_duration_seconds:shop"]);
    }
}
