//! Cellular out-of-credits detection: distinguishing a carrier's silent
//! disconnect-for-non-payment from an ordinary connection failure.

use chrono::{DateTime, Utc};

use super::state::State;

/// Seconds a `Connected → Idle` drop may occur after `Connect` and still
/// be attributed to an expired prepaid balance rather than an
/// intermittent network.
const OUT_OF_CREDITS_CONNECTION_DROP_SECONDS: i64 = 15;

/// Seconds after `OnAfterResume` during which a subsequent `Connect` is
/// assumed to be a post-suspend reconnect, not a new user-initiated
/// attempt subject to detection.
const OUT_OF_CREDITS_RESUME_IGNORE_SECONDS: i64 = 60;

/// The maximum number of `Connect` calls (the initial one plus
/// carrier-silence-triggered retries) within one detection window.
const MAX_CONNECT_ATTEMPTS: u32 = 3;

/// What a Service should do in response to a state transition observed
/// while out-of-credits detection is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// No action; the transition was not relevant to detection.
    None,
    /// Detection determined the carrier silently dropped the connection
    /// for lack of credit; ask the caller to retry the connection.
    Reconnect,
    /// `out_of_credits` was just set.
    Detected,
    /// The drop happened, but too long after `Connect` to attribute to
    /// credits; detection ended without setting `out_of_credits`.
    Intermittent,
}

/// Per-Service out-of-credits detection state.
#[derive(Debug, Clone, Default)]
pub struct OutOfCreditsDetector {
    /// Whether detection is enabled for this Service at all.
    pub enforce: bool,
    detection_in_progress: bool,
    out_of_credits: bool,
    connect_attempts: u32,
    connect_start_time: Option<DateTime<Utc>>,
    resume_start_time: Option<DateTime<Utc>>,
}

impl OutOfCreditsDetector {
    /// Returns `true` while a detection window is open.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.detection_in_progress
    }

    /// Returns `true` once detection has declared the carrier out of
    /// credits.
    #[must_use]
    pub fn is_out_of_credits(&self) -> bool {
        self.out_of_credits
    }

    /// Records that the system resumed from suspend at `now`; a
    /// `Connect` within [`OUT_OF_CREDITS_RESUME_IGNORE_SECONDS`] of this
    /// will skip engaging detection.
    pub fn on_after_resume(&mut self, now: DateTime<Utc>) {
        self.resume_start_time = Some(now);
    }

    /// Call when the Service is about to `Connect`, before detection's
    /// transition tracking begins. Returns `true` if detection engaged
    /// for this connection attempt.
    ///
    /// Skips engaging when: `out_of_credits` is already set; the most
    /// recent `OnAfterResume` was within the resume-ignore window; or
    /// `user_initiated` is `true`.
    pub fn on_connect(&mut self, now: DateTime<Utc>, user_initiated: bool) -> bool {
        if !self.enforce || self.out_of_credits || user_initiated {
            return false;
        }

        if let Some(resume_start) = self.resume_start_time {
            let within_ignore_window =
                (now - resume_start).num_seconds() < OUT_OF_CREDITS_RESUME_IGNORE_SECONDS;
            self.resume_start_time = None;
            if within_ignore_window {
                return false;
            }
        }

        self.connect_start_time = Some(now);
        self.connect_attempts = 1;
        self.detection_in_progress = true;
        true
    }

    /// Call on every Service state transition while `enforce` is set;
    /// a no-op (returns `Action::None`) when detection is not in
    /// progress or the transition is not one detection tracks.
    pub fn observe_transition(&mut self, old: State, new: State, now: DateTime<Utc>) -> Action {
        if !self.detection_in_progress {
            return Action::None;
        }

        match (old, new) {
            (State::Associating, State::Failure) | (State::Configuring, State::Idle) => {
                if self.connect_attempts < MAX_CONNECT_ATTEMPTS {
                    self.connect_attempts += 1;
                    Action::Reconnect
                } else {
                    self.detection_in_progress = false;
                    Action::None
                }
            }
            (State::Connected, State::Idle) => {
                self.detection_in_progress = false;
                let elapsed = self
                    .connect_start_time
                    .map(|start| (now - start).num_seconds())
                    .unwrap_or(i64::MAX);
                if elapsed <= OUT_OF_CREDITS_CONNECTION_DROP_SECONDS {
                    self.out_of_credits = true;
                    Action::Detected
                } else {
                    Action::Intermittent
                }
            }
            _ => Action::None,
        }
    }

    /// A user- or Service-initiated disconnect cancels any in-progress
    /// detection without declaring `out_of_credits`.
    pub fn cancel(&mut self) {
        self.detection_in_progress = false;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn detector() -> OutOfCreditsDetector {
        OutOfCreditsDetector { enforce: true, ..Default::default() }
    }

    #[test]
    fn detected_after_two_reconnects_then_a_quick_drop() {
        let mut d = detector();
        let t0 = Utc::now();
        assert!(d.on_connect(t0, false));

        assert_eq!(
            d.observe_transition(State::Associating, State::Failure, t0),
            Action::Reconnect
        );
        assert_eq!(
            d.observe_transition(State::Configuring, State::Idle, t0 + Duration::seconds(1)),
            Action::Reconnect
        );
        assert_eq!(
            d.observe_transition(State::Connected, State::Idle, t0 + Duration::seconds(2)),
            Action::Detected
        );

        assert!(d.is_out_of_credits());
        assert!(!d.is_in_progress());
    }

    #[test]
    fn intermittent_drop_past_the_threshold_does_not_set_out_of_credits() {
        let mut d = detector();
        let t0 = Utc::now();
        d.on_connect(t0, false);

        let action = d.observe_transition(State::Connected, State::Idle, t0 + Duration::seconds(30));
        assert_eq!(action, Action::Intermittent);
        assert!(!d.is_out_of_credits());
    }

    #[test]
    fn skipped_when_resume_was_recent() {
        let mut d = detector();
        let t0 = Utc::now();
        d.on_after_resume(t0);

        let engaged = d.on_connect(t0 + Duration::seconds(5), false);
        assert!(!engaged);
        assert!(!d.is_in_progress());

        assert_eq!(
            d.observe_transition(State::Connected, State::Idle, t0 + Duration::seconds(6)),
            Action::None
        );
        assert!(!d.is_out_of_credits());
    }

    #[test]
    fn skipped_when_user_initiated() {
        let mut d = detector();
        assert!(!d.on_connect(Utc::now(), true));
    }

    #[test]
    fn skipped_once_already_out_of_credits() {
        let mut d = detector();
        d.out_of_credits = true;
        assert!(!d.on_connect(Utc::now(), false));
    }
}
