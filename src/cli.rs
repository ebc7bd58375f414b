// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for composing CLI options.
//!
//! The main thing in this module is [`Opts`], which composes the strongly
//! typed CLI options of the [`SuiteRunner`] and the reporters. The idea
//! behind this is that the runner and reporters may want to introduce their
//! own CLI options to allow tweaking themselves, but we still do want them
//! combined in a single CLI without any boilerplate burden.
//!
//! If an embedding doesn't need custom options, it may just use the prepared
//! [`cli::Empty`] stub.
//!
//! [`cli::Empty`]: self::Empty
//! [`SuiteRunner`]: crate::SuiteRunner

use crate::reporter::Coloring;

pub use clap::{Args, Parser};

/// Root CLI (command line interface) of a suite run.
///
/// Combines the nested CLIs of the runner and the reporters, and may be
/// extended with custom options additionally.
#[derive(clap::Parser, Clone, Debug, Default)]
#[command(name = "rehearse", about = "Run the suite, pet a dog!")]
pub struct Opts<Custom = Empty>
where
    Custom: Args,
{
    /// [`SuiteRunner`] CLI options.
    ///
    /// [`SuiteRunner`]: crate::SuiteRunner
    #[command(flatten)]
    pub runner: RunnerOpts,

    /// Reporter CLI options.
    #[command(flatten)]
    pub reporter: ReporterOpts,

    /// Additional custom CLI options.
    #[command(flatten)]
    pub custom: Custom,
}

impl<Custom: Args> Opts<Custom> {
    /// Shortcut for [`clap::Parser::parse()`], which doesn't require the
    /// trait being imported.
    #[must_use]
    pub fn parsed() -> Self {
        <Self as clap::Parser>::parse()
    }
}

/// CLI options consumed by the [`SuiteRunner`].
///
/// [`SuiteRunner`]: crate::SuiteRunner
#[derive(Args, Clone, Debug, Default)]
#[group(skip)]
pub struct RunnerOpts {
    /// Stop the run on the first failed or errored test.
    #[arg(long = "fail-fast", visible_alias = "ff")]
    pub fail_fast: bool,

    /// Substring to filter test names by; non-matching tests are not run.
    #[arg(
        id = "filter",
        long = "filter",
        short = 'f',
        value_name = "substring"
    )]
    pub filter: Option<String>,
}

/// CLI options consumed by the console reporter.
#[derive(Args, Clone, Debug, Default)]
#[group(skip)]
pub struct ReporterOpts {
    /// Print every dispatched step, not just test outcomes.
    #[arg(long)]
    pub steps: bool,

    /// Coloring policy of the terminal output.
    #[arg(long, value_name = "auto|always|never", default_value = "auto")]
    pub color: Coloring,
}

/// Indication whether CLI options support colored output.
pub trait Colored {
    /// Returns the [`Coloring`] the options ask for.
    #[must_use]
    fn coloring(&self) -> Coloring {
        Coloring::Never
    }
}

impl Colored for ReporterOpts {
    fn coloring(&self) -> Coloring {
        self.color
    }
}

/// Empty CLI options.
#[derive(Args, Clone, Copy, Debug, Default)]
#[group(skip)]
pub struct Empty;

impl Colored for Empty {}
