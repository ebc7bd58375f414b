// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Default console reporter.

use std::time::{Duration, Instant};

use console::Term;
use itertools::Itertools as _;

use crate::{
    cli,
    event::{self, Event, EventHandler},
    result::RunStats,
};

use super::out::Styles;

/// Default console reporter: per-test outcome lines, failure traces and a
/// styled summary.
///
/// Subscribes to the runner's [`EventBus`] like any other consumer; it keeps
/// its own counters and never talks to the runner's aggregator.
///
/// [`EventBus`]: crate::event::EventBus
#[derive(Debug)]
pub struct Basic {
    /// Terminal to write into.
    term: Term,

    /// Output styles.
    styles: Styles,

    /// Whether to print every dispatched step.
    print_steps: bool,

    /// When the suite run started.
    started_at: Option<Instant>,

    /// Reporter-local outcome counters for the summary.
    stats: RunStats,

    /// Rendered steps of the currently running test, for failure traces.
    trace: Vec<String>,
}

impl Default for Basic {
    fn default() -> Self {
        Self {
            term: Term::stdout(),
            styles: Styles::new(),
            print_steps: false,
            started_at: None,
            stats: RunStats::new(),
            trace: Vec::new(),
        }
    }
}

impl Basic {
    /// Creates a new [`Basic`] reporter writing to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a [`Basic`] reporter configured from parsed
    /// [`cli::ReporterOpts`].
    #[must_use]
    pub fn with_cli(opts: &cli::ReporterOpts) -> Self {
        let mut this = Self::new();
        this.print_steps = opts.steps;
        this.styles.apply_coloring(opts.color);
        this
    }

    /// Enables printing of every dispatched step.
    #[must_use]
    pub fn print_steps(mut self, enabled: bool) -> Self {
        self.print_steps = enabled;
        self
    }

    fn line(&self, s: &str) {
        let _ = self.term.write_line(s);
    }

    fn test_line(&self, marker: &str, name: &str, detail: Option<&str>) {
        match detail {
            Some(detail) => self.line(&format!("{marker} {name}: {detail}")),
            None => self.line(&format!("{marker} {name}")),
        }
    }

    fn print_trace(&self) {
        for step in &self.trace {
            self.line(&format!("    {step}"));
        }
    }

    fn handle_test(&mut self, meta: &crate::TestMeta, ev: &event::Test) {
        use event::Test;

        let name = meta.to_string();
        match ev {
            Test::Started => self.trace.clear(),
            Test::Running | Test::Ended | Test::Finished => {}
            Test::Step(step, ev) => self.handle_step(step, ev),
            Test::Passed => {
                self.stats.passed += 1;
                let marker = self.styles.ok("✔").into_owned();
                self.test_line(&marker, &name, None);
            }
            Test::Failed(failure) => {
                self.stats.failed += 1;
                let marker = self.styles.err("✘").into_owned();
                let detail = self.styles.err(failure.message.clone());
                self.test_line(&marker, &name, Some(detail.as_ref()));
                self.print_trace();
            }
            Test::Errored(message) => {
                self.stats.errored += 1;
                let marker = self.styles.err("✘ [error]").into_owned();
                let detail = self.styles.err(message.clone());
                self.test_line(&marker, &name, Some(detail.as_ref()));
                self.print_trace();
            }
            Test::Skipped(reason) => {
                self.stats.skipped += 1;
                let marker = self.styles.skipped("-").into_owned();
                let detail = self.styles.skipped(reason.to_string());
                self.test_line(&marker, &name, Some(detail.as_ref()));
            }
            Test::Incomplete(reason) => {
                self.stats.incomplete += 1;
                let marker = self.styles.skipped("?").into_owned();
                let detail =
                    self.styles.skipped(format!("incomplete: {reason}"));
                self.test_line(&marker, &name, Some(detail.as_ref()));
            }
        }
    }

    fn handle_step(
        &mut self,
        step: &event::Source<crate::Step>,
        ev: &event::Step,
    ) {
        match ev {
            event::Step::Started => {
                let rendered = format!("{} {step}", step.kind());
                if self.print_steps {
                    self.line(&format!("  {rendered}"));
                }
                self.trace.push(rendered);
            }
            event::Step::Finished(event::StepOutcome::Passed) => {}
            event::Step::Finished(outcome) => {
                if let Some(last) = self.trace.last_mut() {
                    *last = format!("{last}  <-- {outcome}");
                }
            }
        }
    }

    fn print_summary(&self) {
        let s = &self.stats;
        let counts = [
            (s.passed > 0)
                .then(|| {
                    self.styles.ok(format!("{} passed", s.passed)).into_owned()
                })
                .unwrap_or_default(),
            (s.failed > 0)
                .then(|| {
                    self.styles
                        .err(format!("{} failed", s.failed))
                        .into_owned()
                })
                .unwrap_or_default(),
            (s.errored > 0)
                .then(|| {
                    self.styles
                        .err(format!("{} errored", s.errored))
                        .into_owned()
                })
                .unwrap_or_default(),
            (s.skipped > 0)
                .then(|| {
                    self.styles
                        .skipped(format!("{} skipped", s.skipped))
                        .into_owned()
                })
                .unwrap_or_default(),
            (s.incomplete > 0)
                .then(|| {
                    self.styles
                        .skipped(format!("{} incomplete", s.incomplete))
                        .into_owned()
                })
                .unwrap_or_default(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .join(", ");

        let tests = self.styles.maybe_plural("test", s.total());
        let elapsed = self.started_at.map_or_else(String::new, |at| {
            // Sub-millisecond noise helps nobody in a summary.
            let rounded = Duration::from_millis(
                u64::try_from(at.elapsed().as_millis()).unwrap_or(u64::MAX),
            );
            format!(" in {}", humantime::format_duration(rounded))
        });

        self.line("");
        let header = self.styles.bold(self.styles.header("[Summary]"));
        self.line(header.as_ref());
        if counts.is_empty() {
            self.line(&format!("{tests}{elapsed}"));
        } else {
            self.line(&format!("{tests} ({counts}){elapsed}"));
        }
    }
}

impl EventHandler for Basic {
    fn handle_event(&mut self, ev: &Event<event::Suite>) {
        use event::Suite;

        match &ev.value {
            Suite::Init => {}
            Suite::Started => self.started_at = Some(Instant::now()),
            Suite::Test(meta, ev) => {
                let meta = (**meta).clone();
                self.handle_test(&meta, ev);
            }
            Suite::Finished => self.print_summary(),
        }
    }
}
