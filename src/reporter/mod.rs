// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reporters: [`EventHandler`]s rendering a suite run for humans.
//!
//! [`EventHandler`]: crate::event::EventHandler

pub mod basic;
pub mod out;

pub use self::{
    basic::Basic,
    out::{Coloring, Styles},
};
