//! Per-pane output log: a bounded ring of completed lines plus raw chunk
//! fan-out to bounded subscribers.
//!
//! Appends come from the window's forwarding task; readers are engine API
//! calls. The inner lock is never held across a channel send that can
//! block (`try_send` only).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use weft_protocol::{OutputChunk, OutputLine};

pub const DEFAULT_RAW_BUFFER: usize = 64;

/// A trailing partial longer than this is flushed as a line so a
/// newline-free stream cannot grow without bound.
const MAX_PARTIAL_BYTES: usize = 1024 * 1024;

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<OutputChunk>,
    /// Chunks dropped since the last successful delivery.
    dropped: u64,
}

struct Inner {
    lines: VecDeque<OutputLine>,
    cap: usize,
    /// Seq of the most recently assembled line; 0 before the first line.
    last_seq: u64,
    partial: Vec<u8>,
    disabled: bool,
    subscribers: Vec<Subscriber>,
    next_sub_id: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    notify: Notify,
}

/// Cheaply cloneable handle to one pane's output log.
#[derive(Clone)]
pub struct OutputLog {
    shared: Arc<Shared>,
}

impl OutputLog {
    pub fn new(cap: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    lines: VecDeque::new(),
                    cap: cap.max(1),
                    last_seq: 0,
                    partial: Vec::new(),
                    disabled: false,
                    subscribers: Vec::new(),
                    next_sub_id: 0,
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Ingest a raw output chunk: fan out to subscribers, then assemble
    /// completed lines into the ring.
    pub fn append(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let mut inner = self.shared.inner.lock();
        if inner.disabled {
            return;
        }
        let at = Utc::now();

        inner.subscribers.retain_mut(|sub| {
            let chunk = OutputChunk {
                data: Bytes::copy_from_slice(data),
                at,
                truncated: sub.dropped > 0,
            };
            match sub.tx.try_send(chunk) {
                Ok(()) => {
                    sub.dropped = 0;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    sub.dropped += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });

        inner.partial.extend_from_slice(data);
        loop {
            let Some(pos) = inner.partial.iter().position(|&b| b == b'\n') else {
                break;
            };
            let mut line: Vec<u8> = inner.partial.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            push_line(&mut inner, line, at);
        }
        if inner.partial.len() > MAX_PARTIAL_BYTES {
            let line = std::mem::take(&mut inner.partial);
            push_line(&mut inner, line, at);
        }
        drop(inner);
        self.shared.notify.notify_waiters();
    }

    /// Last `limit` completed lines (0 means the full retained window).
    pub fn snapshot(&self, limit: usize) -> Vec<OutputLine> {
        let inner = self.shared.inner.lock();
        let limit = if limit == 0 { inner.cap } else { limit };
        let start = inner.lines.len().saturating_sub(limit);
        inner.lines.iter().skip(start).cloned().collect()
    }

    /// Lines with `seq > since`. `next` is the seq of the last returned
    /// line (or `since` unchanged when nothing new exists), so a tail
    /// reader polls with the returned cursor and never sees a line twice.
    /// `truncated` reports that lines in the requested range were evicted;
    /// the cursor is then clamped to the start of the retained window.
    pub fn lines_since(&self, since: u64) -> (Vec<OutputLine>, bool, u64) {
        let inner = self.shared.inner.lock();
        let Some(oldest) = inner.lines.front().map(|l| l.seq) else {
            return (Vec::new(), false, since);
        };
        let mut since = since;
        let truncated = since + 1 < oldest;
        if truncated {
            since = oldest - 1;
        }
        let lines: Vec<OutputLine> = inner
            .lines
            .iter()
            .filter(|l| l.seq > since)
            .cloned()
            .collect();
        let next = lines.last().map(|l| l.seq).unwrap_or(since);
        (lines, truncated, next)
    }

    /// Wait until a line with `seq >= since` exists (or the range was
    /// truncated away), up to `timeout`. Appends between checks coalesce
    /// into a single wake.
    pub async fn wait_for_lines(
        &self,
        since: u64,
        timeout: Duration,
    ) -> (Vec<OutputLine>, bool, u64) {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let (lines, truncated, next) = self.lines_since(since);
            if !lines.is_empty() || truncated || self.is_disabled() {
                return (lines, truncated, next);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return (Vec::new(), false, next);
            }
        }
    }

    /// Subscribe to raw chunks. The guard unsubscribes on drop.
    pub fn subscribe(&self, buffer: usize) -> (mpsc::Receiver<OutputChunk>, RawSubscription) {
        let buffer = if buffer == 0 { DEFAULT_RAW_BUFFER } else { buffer };
        let (tx, rx) = mpsc::channel(buffer);
        let mut inner = self.shared.inner.lock();
        let id = inner.next_sub_id;
        inner.next_sub_id += 1;
        inner.subscribers.push(Subscriber { id, tx, dropped: 0 });
        (
            rx,
            RawSubscription {
                shared: self.shared.clone(),
                id,
            },
        )
    }

    /// Stop accepting appends and close every subscriber channel.
    pub fn disable(&self) {
        let mut inner = self.shared.inner.lock();
        inner.disabled = true;
        inner.subscribers.clear();
        drop(inner);
        self.shared.notify.notify_waiters();
    }

    pub fn is_disabled(&self) -> bool {
        self.shared.inner.lock().disabled
    }

    pub fn len(&self) -> usize {
        self.shared.inner.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.shared.inner.lock().subscribers.len()
    }
}

fn push_line(inner: &mut Inner, raw: Vec<u8>, at: chrono::DateTime<Utc>) {
    let plain = strip_ansi_escapes::strip(&raw);
    inner.last_seq += 1;
    let line = OutputLine {
        seq: inner.last_seq,
        at,
        text: String::from_utf8_lossy(&plain).into_owned(),
    };
    inner.lines.push_back(line);
    while inner.lines.len() > inner.cap {
        inner.lines.pop_front();
    }
}

/// Unsubscribes its raw channel when dropped.
pub struct RawSubscription {
    shared: Arc<Shared>,
    id: u64,
}

impl RawSubscription {
    pub fn cancel(self) {}
}

impl Drop for RawSubscription {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        inner.subscribers.retain(|sub| sub.id != self.id);
    }
}
