// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Beanstalk`]: a driver speaking the beanstalkd text protocol over TCP.
//!
//! Queues map onto beanstalkd tubes. Only the handful of commands the
//! [`QueueDriver`] contract needs are implemented: `use`, `put`,
//! `list-tubes`, `stats-tube`, `watch`/`ignore` and
//! `reserve-with-timeout`/`delete` for the drain loop.

use std::{
    io::{BufRead as _, BufReader, Read as _, Write as _},
    net::TcpStream,
};

use super::{QueueDriver, QueueError};

/// beanstalkd default job priority.
const PRIORITY: u32 = 1024;

/// Job time-to-run, in seconds.
const TTR: u32 = 60;

/// [`QueueDriver`] for a beanstalkd server.
pub struct Beanstalk {
    /// `host:port` the driver is connected to.
    endpoint: String,

    /// Buffered protocol stream.
    stream: BufReader<TcpStream>,
}

impl Beanstalk {
    /// Connects to the beanstalkd server at `host:port`.
    ///
    /// # Errors
    ///
    /// [`QueueError::Connection`] if the server is unreachable.
    pub fn connect(host: &str, port: u16) -> Result<Self, QueueError> {
        let endpoint = format!("{host}:{port}");
        tracing::debug!(endpoint = endpoint.as_str(), "connecting");
        let stream = TcpStream::connect(&endpoint).map_err(|e| {
            QueueError::Connection {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { endpoint, stream: BufReader::new(stream) })
    }

    /// Endpoint this driver is connected to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one command line and reads the one-line reply.
    fn command(&mut self, line: &str) -> Result<String, QueueError> {
        self.stream.get_mut().write_all(line.as_bytes())?;
        self.stream.get_mut().write_all(b"\r\n")?;
        self.read_line()
    }

    /// Sends a command followed by a data body and reads the one-line reply.
    fn command_with_body(
        &mut self,
        line: &str,
        body: &[u8],
    ) -> Result<String, QueueError> {
        let out = self.stream.get_mut();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\r\n")?;
        out.write_all(body)?;
        out.write_all(b"\r\n")?;
        self.read_line()
    }

    /// Reads one CRLF-terminated reply line.
    fn read_line(&mut self) -> Result<String, QueueError> {
        let mut line = String::new();
        let read = self.stream.read_line(&mut line)?;
        if read == 0 {
            return Err(QueueError::Protocol {
                reason: "server closed the connection".into(),
            });
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }

    /// Reads a `len`-byte data body plus its trailing CRLF.
    fn read_body(&mut self, len: usize) -> Result<String, QueueError> {
        let mut buf = vec![0_u8; len + 2];
        self.stream.read_exact(&mut buf)?;
        buf.truncate(len);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Runs `stats-tube`, translating `NOT_FOUND` into the uniform
    /// [`QueueError::NotFound`].
    fn stats_tube(&mut self, queue: &str) -> Result<String, QueueError> {
        let reply = self.command(&format!("stats-tube {queue}"))?;
        if reply == "NOT_FOUND" {
            return Err(QueueError::NotFound { queue: queue.to_owned() });
        }
        let len = ok_body_len(&reply)?;
        self.read_body(len)
    }

    /// Reads one named statistic of the given tube.
    fn tube_stat(&mut self, queue: &str, key: &str) -> Result<u64, QueueError> {
        let body = self.stats_tube(queue)?;
        yaml_stat(&body, key).ok_or_else(|| QueueError::Protocol {
            reason: format!("stats-tube reply misses \"{key}\""),
        })
    }
}

impl QueueDriver for Beanstalk {
    fn add_message(
        &mut self,
        message: &str,
        queue: &str,
    ) -> Result<(), QueueError> {
        let using = self.command(&format!("use {queue}"))?;
        if !using.starts_with("USING ") {
            return Err(QueueError::Protocol {
                reason: format!("unexpected reply to use: {using}"),
            });
        }
        let body = message.as_bytes();
        let reply = self.command_with_body(
            &format!("put {PRIORITY} 0 {TTR} {}", body.len()),
            body,
        )?;
        if reply.starts_with("INSERTED ") {
            Ok(())
        } else {
            Err(QueueError::Protocol {
                reason: format!("unexpected reply to put: {reply}"),
            })
        }
    }

    fn queues(&mut self) -> Result<Vec<String>, QueueError> {
        let reply = self.command("list-tubes")?;
        let body = self.read_body(ok_body_len(&reply)?)?;
        Ok(yaml_list(&body))
    }

    fn current_count(&mut self, queue: &str) -> Result<u64, QueueError> {
        self.tube_stat(queue, "current-jobs-ready")
    }

    fn total_count(&mut self, queue: &str) -> Result<u64, QueueError> {
        self.tube_stat(queue, "total-jobs")
    }

    fn clear(&mut self, queue: &str) -> Result<(), QueueError> {
        // `watch` would create a missing tube implicitly; probing first
        // keeps the uniform not-found contract.
        let _ = self.stats_tube(queue)?;

        let _ = self.command(&format!("watch {queue}"))?;
        let _ = self.command("ignore default")?;

        let drained = loop {
            let reply = self.command("reserve-with-timeout 0")?;
            if reply == "TIMED_OUT" || reply == "DEADLINE_SOON" {
                break Ok(());
            }
            let Some(rest) = reply.strip_prefix("RESERVED ") else {
                break Err(QueueError::Protocol {
                    reason: format!("unexpected reply to reserve: {reply}"),
                });
            };
            let mut parts = rest.split(' ');
            let id = parts.next().unwrap_or_default().to_owned();
            let len: usize = parts
                .next()
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| QueueError::Protocol {
                    reason: format!("malformed RESERVED reply: {reply}"),
                })?;
            let _ = self.read_body(len)?;
            let deleted = self.command(&format!("delete {id}"))?;
            if deleted != "DELETED" {
                break Err(QueueError::Protocol {
                    reason: format!("unexpected reply to delete: {deleted}"),
                });
            }
        };

        // Restore the watch list regardless of how the drain went.
        let _ = self.command("watch default")?;
        let _ = self.command(&format!("ignore {queue}"))?;
        drained
    }
}

impl std::fmt::Debug for Beanstalk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Beanstalk")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Parses the body length out of an `OK <bytes>` reply.
fn ok_body_len(reply: &str) -> Result<usize, QueueError> {
    reply
        .strip_prefix("OK ")
        .and_then(|len| len.parse().ok())
        .ok_or_else(|| QueueError::Protocol {
            reason: format!("unexpected reply: {reply}"),
        })
}

/// Parses a beanstalkd YAML list body (`- item` lines).
fn yaml_list(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.trim().strip_prefix("- "))
        .map(|item| item.trim().to_owned())
        .collect()
}

/// Reads one integer statistic out of a beanstalkd YAML mapping body.
fn yaml_stat(body: &str, key: &str) -> Option<u64> {
    body.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        (name.trim() == key)
            .then(|| value.trim().parse().ok())
            .flatten()
    })
}

#[cfg(test)]
mod tests {
    use super::{ok_body_len, yaml_list, yaml_stat};

    #[test]
    fn parses_tube_listing() {
        let body = "---\n- default\n- emails\n";

        assert_eq!(yaml_list(body), ["default", "emails"]);
    }

    #[test]
    fn parses_tube_stats() {
        let body = "---\nname: emails\ncurrent-jobs-ready: 3\ntotal-jobs: 17\n";

        assert_eq!(yaml_stat(body, "current-jobs-ready"), Some(3));
        assert_eq!(yaml_stat(body, "total-jobs"), Some(17));
        assert_eq!(yaml_stat(body, "current-jobs-buried"), None);
    }

    #[test]
    fn rejects_malformed_ok_reply() {
        assert!(ok_body_len("OK 12").is_ok());
        assert!(ok_body_len("ERR").is_err());
        assert!(ok_body_len("OK x").is_err());
    }
}
