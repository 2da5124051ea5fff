//! PTY-backed terminal window.
//!
//! A blocking reader thread drains the PTY into an mpsc channel; a
//! forwarding task feeds the vt100 screen, the scrollback buffer, and the
//! pane's output hook. Both stop through one `CancellationToken`.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use weft_protocol::{MouseEvent, MouseEventKind};
use weft_utils::{Result, WeftError};

use super::buffer::ScrollbackBuffer;
use super::{FirstReadHook, OutputHook, TerminalWindow, WindowOptions};

const READ_BUF_SIZE: usize = 8192;
const FORWARD_CHANNEL_SIZE: usize = 64;
const DEFAULT_SCROLLBACK_BYTES: usize = 512 * 1024;
const VT_SCROLLBACK_ROWS: usize = 200;

pub struct PtyWindow {
    id: String,
    title: Mutex<String>,
    writer: Mutex<Box<dyn Write + Send>>,
    master: Mutex<Box<dyn MasterPty + Send>>,
    child: Mutex<Box<dyn Child + Send + Sync>>,
    pid: Option<u32>,
    parser: Mutex<vt100::Parser>,
    scrollback: Mutex<ScrollbackBuffer>,
    update_seq: AtomicU64,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    first_read_at: Mutex<Option<DateTime<Utc>>>,
    exited: AtomicBool,
    exit_status: Mutex<Option<i32>>,
    closed: AtomicBool,
    token: CancellationToken,
    on_output: Option<OutputHook>,
    on_first_read: Option<FirstReadHook>,
}

impl PtyWindow {
    /// Open a PTY, spawn the command in it, and start the reader.
    ///
    /// An empty command falls back to `$SHELL` (or `/bin/sh`).
    pub fn spawn(options: WindowOptions) -> Result<Arc<Self>> {
        let command = if options.command.trim().is_empty() {
            default_shell()
        } else {
            options.command.clone()
        };

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: options.rows,
                cols: options.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| WeftError::pty(format!("openpty: {}", e)))?;

        let mut builder = CommandBuilder::new(&command);
        builder.args(&options.args);
        if !options.dir.trim().is_empty() {
            builder.cwd(&options.dir);
        }
        for pair in &options.env {
            if let Some((key, value)) = pair.split_once('=') {
                builder.env(key, value);
            }
        }

        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| WeftError::spawn(format!("{}: {}", command, e)))?;
        drop(pair.slave);

        let pid = child.process_id();
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| WeftError::pty(format!("clone reader: {}", e)))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| WeftError::pty(format!("take writer: {}", e)))?;

        let window = Arc::new(Self {
            id: options.id.clone(),
            title: Mutex::new(options.title),
            writer: Mutex::new(writer),
            master: Mutex::new(pair.master),
            child: Mutex::new(child),
            pid,
            parser: Mutex::new(vt100::Parser::new(options.rows, options.cols, VT_SCROLLBACK_ROWS)),
            scrollback: Mutex::new(ScrollbackBuffer::new(DEFAULT_SCROLLBACK_BYTES)),
            update_seq: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            first_read_at: Mutex::new(None),
            exited: AtomicBool::new(false),
            exit_status: Mutex::new(None),
            closed: AtomicBool::new(false),
            token: CancellationToken::new(),
            on_output: options.on_output,
            on_first_read: options.on_first_read,
        });

        window.start_reader(reader);
        debug!(pane_id = %options.id, command = %command, pid = ?pid, "spawned pty window");
        Ok(window)
    }

    fn start_reader(self: &Arc<Self>, mut reader: Box<dyn Read + Send>) {
        let (tx, mut rx) = mpsc::channel::<Bytes>(FORWARD_CHANNEL_SIZE);
        let token = self.token.clone();
        let id = self.id.clone();
        tokio::task::spawn_blocking(move || {
            let mut buf = [0u8; READ_BUF_SIZE];
            loop {
                if token.is_cancelled() {
                    break;
                }
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.blocking_send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                            break;
                        }
                    }
                }
            }
            trace!(pane_id = %id, "pty reader finished");
        });

        let token = self.token.clone();
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    chunk = rx.recv() => {
                        let Some(window) = weak.upgrade() else { break };
                        match chunk {
                            Some(data) => window.ingest(data),
                            None => {
                                window.poll_exit();
                                window.exited.store(true, Ordering::SeqCst);
                                break;
                            }
                        }
                    }
                }
            }
        });
    }

    fn ingest(&self, data: Bytes) {
        {
            let mut first = self.first_read_at.lock();
            if first.is_none() {
                *first = Some(Utc::now());
                if let Some(hook) = &self.on_first_read {
                    hook();
                }
            }
        }
        self.parser.lock().process(&data);
        self.scrollback.lock().push(data.clone());
        self.bytes_out.fetch_add(data.len() as u64, Ordering::Relaxed);
        self.update_seq.fetch_add(1, Ordering::Relaxed);
        if let Some(hook) = &self.on_output {
            hook(data);
        }
    }

    fn poll_exit(&self) {
        if self.exit_status.lock().is_some() {
            return;
        }
        if let Ok(Some(status)) = self.child.lock().try_wait() {
            *self.exit_status.lock() = Some(status.exit_code() as i32);
            self.exited.store(true, Ordering::SeqCst);
        }
    }
}

impl TerminalWindow for PtyWindow {
    fn id(&self) -> &str {
        &self.id
    }

    fn send_input(&self, data: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WeftError::unavailable("window is closed"));
        }
        let mut writer = self.writer.lock();
        writer
            .write_all(data)
            .and_then(|_| writer.flush())
            .map_err(|e| WeftError::pty(format!("write: {}", e)))?;
        self.bytes_in.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn send_mouse(&self, event: &MouseEvent) -> Result<()> {
        let (code, release) = match event.kind {
            MouseEventKind::Press => (0, false),
            MouseEventKind::Release => (0, true),
            MouseEventKind::Drag => (32, false),
            MouseEventKind::ScrollUp => (64, false),
            MouseEventKind::ScrollDown => (65, false),
        };
        let seq = format!(
            "\x1b[<{};{};{}{}",
            code,
            event.column + 1,
            event.row + 1,
            if release { 'm' } else { 'M' }
        );
        self.send_input(seq.as_bytes())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.token.cancel();
        let _ = self.child.lock().kill();
        debug!(pane_id = %self.id, "closed pty window");
    }

    fn title(&self) -> String {
        // The emulator's title (set via OSC sequences) wins when present.
        let screen_title = self.parser.lock().screen().title().to_string();
        if !screen_title.is_empty() {
            return screen_title;
        }
        self.title.lock().clone()
    }

    fn set_title(&self, title: &str) {
        *self.title.lock() = title.to_string();
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn exited(&self) -> bool {
        self.poll_exit();
        self.exited.load(Ordering::SeqCst)
    }

    fn exit_status(&self) -> Option<i32> {
        self.poll_exit();
        *self.exit_status.lock()
    }

    fn resize(&self, rows: u16, cols: u16) -> Result<()> {
        self.master
            .lock()
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| WeftError::pty(format!("resize: {}", e)))?;
        self.parser.lock().set_size(rows, cols);
        Ok(())
    }

    fn update_seq(&self) -> u64 {
        self.update_seq.load(Ordering::Relaxed)
    }

    fn preview_plain_lines(&self, limit: usize) -> Vec<String> {
        let parser = self.parser.lock();
        let screen = parser.screen();
        let (_, cols) = screen.size();
        let mut lines: Vec<String> = screen
            .rows(0, cols)
            .map(|row| row.trim_end().to_string())
            .collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        let start = lines.len().saturating_sub(limit);
        lines[start..].to_vec()
    }

    fn first_read_at(&self) -> Option<DateTime<Utc>> {
        *self.first_read_at.lock()
    }

    fn set_scrollback_max_bytes(&self, max_bytes: usize) {
        self.scrollback.lock().set_max_bytes(max_bytes);
    }

    fn bytes_in(&self) -> u64 {
        self.bytes_in.load(Ordering::Relaxed)
    }

    fn bytes_out(&self) -> u64 {
        self.bytes_out.load(Ordering::Relaxed)
    }
}

impl Drop for PtyWindow {
    fn drop(&mut self) {
        self.close();
    }
}

fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}
