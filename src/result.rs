// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`RunStats`]: outcome counters aggregated across one suite run.

/// Execution statistics of one suite run.
///
/// Counters are keyed by outcome kind. A test counts in exactly one of
/// `passed`/`failed`/`errored`/`skipped`/`incomplete`; `useless` (a test
/// that dispatched no assertion) and `warnings` (best-effort hook errors)
/// overlay those buckets.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunStats {
    /// Number of passed tests.
    pub passed: usize,

    /// Number of tests failed on an assertion.
    pub failed: usize,

    /// Number of tests stopped by an unexpected error.
    ///
    /// Kept separate from `failed`: the distinction changes exit-code and
    /// reporting semantics for consumers.
    pub errored: usize,

    /// Number of warnings (best-effort hook errors).
    pub warnings: usize,

    /// Number of skipped tests.
    pub skipped: usize,

    /// Number of tests marked incomplete by their authors.
    pub incomplete: usize,

    /// Number of tests that completed without dispatching a single
    /// assertion.
    pub useless: usize,

    /// Number of assertion steps dispatched successfully.
    pub assertions: usize,

    /// Whether a stop was requested (e.g. by a stop-on-first-failure
    /// policy). Checked between tests, not between steps.
    should_stop: bool,
}

impl RunStats {
    /// Creates empty [`RunStats`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of tests that reached an outcome.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed
            + self.failed
            + self.errored
            + self.skipped
            + self.incomplete
    }

    /// Indicates whether the run is successful: no errors, no failures and
    /// no warnings.
    #[must_use]
    pub const fn was_successful(&self) -> bool {
        self.failed == 0 && self.errored == 0 && self.warnings == 0
    }

    /// Requests the run to stop before the next test.
    pub fn request_stop(&mut self) {
        self.should_stop = true;
    }

    /// Indicates whether a stop was requested.
    #[must_use]
    pub const fn should_stop(&self) -> bool {
        self.should_stop
    }
}

#[cfg(test)]
mod tests {
    use super::RunStats;

    #[test]
    fn fresh_stats_are_successful() {
        let stats = RunStats::new();

        assert!(stats.was_successful());
        assert_eq!(stats.total(), 0);
        assert!(!stats.should_stop());
    }

    #[test]
    fn warnings_spoil_success() {
        let stats = RunStats { passed: 3, warnings: 1, ..RunStats::new() };

        assert!(!stats.was_successful());
        assert_eq!(stats.total(), 3);
    }
}
