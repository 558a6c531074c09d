use std::time::Duration;

/// Pause inserted between two group cycles of one run.
///
/// The pause keeps a run under the store's write quota; it is never applied
/// after the last group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    pub success_delay: Duration,
    pub failure_delay: Duration,
}

impl SchedulePolicy {
    /// No pauses at all, for tests and dry runs.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            success_delay: Duration::ZERO,
            failure_delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn delay_after(&self, succeeded: bool) -> Duration {
        if succeeded {
            self.success_delay
        } else {
            self.failure_delay
        }
    }
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            success_delay: Duration::from_secs(60),
            failure_delay: Duration::from_secs(30),
        }
    }
}
