//! Bounded-attempt HTTP probe that classifies a connection as online,
//! behind a captive portal, or still connected-but-unknown.

mod prober;

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub use prober::{Prober, ProbeOutcome, ReqwestProber};

use crate::dispatcher::EventDispatcher;

/// Default portal-check target. A `204 No Content` response confirms
/// general internet access without downloading a real page.
pub const DEFAULT_URL: &str = "http://clients3.google.com/generate_204";

const RESPONSE_EXPECTED_PREFIX: &str = "HTTP/1.1 204";
const MAX_REQUEST_ATTEMPTS: u32 = 3;
const MIN_TIME_BETWEEN_ATTEMPTS: Duration = Duration::from_secs(3);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Which stage of the probe produced a [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// An HTTP response was received and its content was evaluated.
    Content,
    /// DNS resolution.
    Dns,
    /// TCP/TLS connection establishment.
    Connection,
    /// The HTTP request/response exchange.
    Http,
    /// Unclassified.
    Unknown,
}

/// The outcome of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The stage succeeded and (for `Phase::Content`) the response
    /// matched the expected `204` prefix.
    Success,
    /// The stage failed outright.
    Failure,
    /// The stage did not complete before the per-attempt timeout.
    Timeout,
}

/// The result of one completed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptResult {
    /// Which stage produced this result.
    pub phase: Phase,
    /// The stage's outcome.
    pub status: Status,
    /// Whether this is the last result for the current `Start`/`Stop`
    /// cycle (either `Status::Success` or `MAX_REQUEST_ATTEMPTS` spent).
    pub is_final: bool,
}

fn classify(outcome: &ProbeOutcome) -> (Phase, Status) {
    match outcome {
        ProbeOutcome::Response { status_line } => {
            if status_line.starts_with(RESPONSE_EXPECTED_PREFIX) {
                (Phase::Content, Status::Success)
            } else {
                (Phase::Content, Status::Failure)
            }
        }
        ProbeOutcome::DnsFailure => (Phase::Dns, Status::Failure),
        ProbeOutcome::DnsTimeout => (Phase::Dns, Status::Timeout),
        ProbeOutcome::ConnectionFailure => (Phase::Connection, Status::Failure),
        ProbeOutcome::ConnectionTimeout => (Phase::Connection, Status::Timeout),
        ProbeOutcome::HttpFailure => (Phase::Http, Status::Failure),
        ProbeOutcome::HttpTimeout => (Phase::Http, Status::Timeout),
        ProbeOutcome::Unknown => (Phase::Unknown, Status::Failure),
    }
}

/// Per-connection bounded-attempt portal probe.
///
/// At most one HTTP request is outstanding at any time. `start` begins
/// (or restarts) a probe cycle; `stop` cancels any outstanding request
/// and pending inter-attempt wait.
pub struct PortalDetector {
    prober: Arc<dyn Prober>,
    dispatcher: EventDispatcher,
    attempt_count: Arc<AtomicU32>,
    last_attempt_start: Arc<Mutex<Option<Instant>>>,
    run_token: Option<CancellationToken>,
}

impl PortalDetector {
    /// Creates a detector that issues probes through `prober` and posts
    /// its attempt loop onto `dispatcher`.
    #[must_use]
    pub fn new(prober: Arc<dyn Prober>, dispatcher: EventDispatcher) -> Self {
        Self {
            prober,
            dispatcher,
            attempt_count: Arc::new(AtomicU32::new(0)),
            last_attempt_start: Arc::new(Mutex::new(None)),
            run_token: None,
        }
    }

    /// Current attempt count within the active cycle (`0` when idle),
    /// updated live by the running attempt loop.
    #[must_use]
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count.load(Ordering::SeqCst)
    }

    /// Returns `true` while a probe cycle is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run_token.is_some()
    }

    /// Starts a probe cycle against `url` (or [`DEFAULT_URL`] if `None`),
    /// invoking `on_result` after every completed attempt.
    ///
    /// Restarts cleanly if already running: the prior cycle is stopped
    /// first.
    pub fn start<F>(&mut self, url: Option<String>, on_result: F)
    where
        F: Fn(AttemptResult) + Send + Sync + 'static,
    {
        self.stop();

        let url = url.unwrap_or_else(|| DEFAULT_URL.to_string());
        let token = self.dispatcher.child_token();
        self.run_token = Some(token.clone());
        self.attempt_count.store(0, Ordering::SeqCst);
        *self.last_attempt_start.lock().unwrap() = None;

        let prober = self.prober.clone();
        let attempt_count = self.attempt_count.clone();
        let last_attempt_start = self.last_attempt_start.clone();

        self.dispatcher.post(async move {
            loop {
                let previous_start = *last_attempt_start.lock().unwrap();
                if let Some(prev) = previous_start {
                    let elapsed = prev.elapsed();
                    if elapsed < MIN_TIME_BETWEEN_ATTEMPTS {
                        tokio::select! {
                            () = token.cancelled() => return,
                            () = tokio::time::sleep(MIN_TIME_BETWEEN_ATTEMPTS - elapsed) => {}
                        }
                    }
                }

                *last_attempt_start.lock().unwrap() = Some(Instant::now());
                let count = attempt_count.fetch_add(1, Ordering::SeqCst) + 1;

                let outcome = tokio::select! {
                    () = token.cancelled() => return,
                    outcome = tokio::time::timeout(REQUEST_TIMEOUT, prober.probe(&url)) => outcome,
                };

                let (phase, status) = match outcome {
                    Ok(outcome) => classify(&outcome),
                    Err(_elapsed) => (Phase::Http, Status::Timeout),
                };

                let is_final = status == Status::Success || count >= MAX_REQUEST_ATTEMPTS;
                on_result(AttemptResult { phase, status, is_final });

                if is_final {
                    return;
                }
            }
        });
    }

    /// Cancels any outstanding request and pending inter-attempt wait. A
    /// no-op if not currently running.
    pub fn stop(&mut self) {
        if let Some(token) = self.run_token.take() {
            token.cancel();
        }
        self.attempt_count.store(0, Ordering::SeqCst);
        *self.last_attempt_start.lock().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct ScriptedProber {
        outcomes: Mutex<Vec<ProbeOutcome>>,
    }

    #[async_trait::async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, _url: &str) -> ProbeOutcome {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                ProbeOutcome::Unknown
            } else {
                outcomes.remove(0)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn portal_204_completes_after_one_attempt() {
        let prober = Arc::new(ScriptedProber {
            outcomes: Mutex::new(vec![ProbeOutcome::Response {
                status_line: "HTTP/1.1 204 No Content".to_string(),
            }]),
        });
        let dispatcher = EventDispatcher::new();
        let mut detector = PortalDetector::new(prober, dispatcher);

        let results = Arc::new(Mutex::new(Vec::new()));
        let results_clone = results.clone();
        detector.start(None, move |r| results_clone.lock().unwrap().push(r));

        tokio::time::sleep(Duration::from_millis(50)).await;

        let results = results.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0], AttemptResult { phase: Phase::Content, status: Status::Success, is_final: true });
    }

    #[tokio::test(start_paused = true)]
    async fn dns_timeout_three_times_emits_three_results_with_final_last() {
        let prober = Arc::new(ScriptedProber {
            outcomes: Mutex::new(vec![
                ProbeOutcome::DnsTimeout,
                ProbeOutcome::DnsTimeout,
                ProbeOutcome::DnsTimeout,
            ]),
        });
        let dispatcher = EventDispatcher::new();
        let mut detector = PortalDetector::new(prober, dispatcher);

        let results = Arc::new(Mutex::new(Vec::new()));
        let results_clone = results.clone();
        detector.start(None, move |r| results_clone.lock().unwrap().push(r));

        tokio::time::sleep(Duration::from_secs(30)).await;

        let results = results.lock().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], AttemptResult { phase: Phase::Dns, status: Status::Timeout, is_final: false });
        assert_eq!(results[1], AttemptResult { phase: Phase::Dns, status: Status::Timeout, is_final: false });
        assert_eq!(results[2], AttemptResult { phase: Phase::Dns, status: Status::Timeout, is_final: true });
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_results() {
        let prober = Arc::new(ScriptedProber {
            outcomes: Mutex::new(vec![ProbeOutcome::DnsFailure, ProbeOutcome::DnsFailure]),
        });
        let dispatcher = EventDispatcher::new();
        let mut detector = PortalDetector::new(prober, dispatcher);

        let results = Arc::new(Mutex::new(Vec::new()));
        let results_clone = results.clone();
        detector.start(None, move |r| results_clone.lock().unwrap().push(r));

        tokio::time::sleep(Duration::from_millis(50)).await;
        detector.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(results.lock().unwrap().len(), 1);
    }

    #[test]
    fn stop_when_idle_is_a_noop() {
        let prober: Arc<dyn Prober> = Arc::new(ScriptedProber { outcomes: Mutex::new(Vec::new()) });
        let dispatcher = EventDispatcher::new();
        let mut detector = PortalDetector::new(prober, dispatcher);
        detector.stop();
        assert!(!detector.is_running());
    }
}
