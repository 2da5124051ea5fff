//! Terminal window contract and the PTY-backed implementation.

pub mod buffer;
pub mod window;

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use weft_protocol::MouseEvent;
use weft_utils::Result;

pub use buffer::ScrollbackBuffer;
pub use window::PtyWindow;

pub type OutputHook = Arc<dyn Fn(Bytes) + Send + Sync>;
pub type FirstReadHook = Arc<dyn Fn() + Send + Sync>;
pub type ToastHook = Arc<dyn Fn(String) + Send + Sync>;

/// Factory the manager uses to create windows, injected so tests never
/// touch a real PTY.
pub type WindowSpawner = Arc<dyn Fn(WindowOptions) -> Result<Arc<dyn TerminalWindow>> + Send + Sync>;

/// Everything needed to create a window for a pane.
pub struct WindowOptions {
    pub id: String,
    pub title: String,
    /// Working directory; empty means inherit.
    pub dir: String,
    /// Extra environment as `KEY=VALUE` pairs.
    pub env: Vec<String>,
    pub command: String,
    pub args: Vec<String>,
    pub rows: u16,
    pub cols: u16,
    /// Called with every raw output chunk read from the child.
    pub on_output: Option<OutputHook>,
    /// Called exactly once, on the first read.
    pub on_first_read: Option<FirstReadHook>,
    /// Called for user-facing failures inside background tasks.
    pub on_toast: Option<ToastHook>,
}

impl WindowOptions {
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            dir: String::new(),
            env: Vec::new(),
            command: command.into(),
            args: Vec::new(),
            rows: 24,
            cols: 80,
            on_output: None,
            on_first_read: None,
            on_toast: None,
        }
    }
}

impl Clone for WindowOptions {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            title: self.title.clone(),
            dir: self.dir.clone(),
            env: self.env.clone(),
            command: self.command.clone(),
            args: self.args.clone(),
            rows: self.rows,
            cols: self.cols,
            on_output: self.on_output.clone(),
            on_first_read: self.on_first_read.clone(),
            on_toast: self.on_toast.clone(),
        }
    }
}

impl std::fmt::Debug for WindowOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowOptions")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("dir", &self.dir)
            .field("command", &self.command)
            .field("args", &self.args)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

/// The engine's only view of a pane's terminal. Production uses
/// [`PtyWindow`]; tests substitute a fake so no PTY is spawned.
pub trait TerminalWindow: Send + Sync {
    fn id(&self) -> &str;

    /// Write bytes to the child's stdin.
    fn send_input(&self, data: &[u8]) -> Result<()>;

    /// Encode and write a mouse event (SGR encoding).
    fn send_mouse(&self, event: &MouseEvent) -> Result<()>;

    /// Stop the reader and kill the child. Idempotent.
    fn close(&self);

    fn title(&self) -> String;
    fn set_title(&self, title: &str);

    fn pid(&self) -> Option<u32>;
    fn exited(&self) -> bool;
    fn exit_status(&self) -> Option<i32>;

    fn resize(&self, rows: u16, cols: u16) -> Result<()>;

    /// Monotonic counter bumped on every output chunk.
    fn update_seq(&self) -> u64;

    /// Up to `limit` trailing non-empty screen rows as plain text.
    fn preview_plain_lines(&self, limit: usize) -> Vec<String>;

    fn first_read_at(&self) -> Option<DateTime<Utc>>;

    fn set_scrollback_max_bytes(&self, max_bytes: usize);

    fn bytes_in(&self) -> u64;
    fn bytes_out(&self) -> u64;
}

#[cfg(test)]
pub use fake::FakeWindow;

#[cfg(test)]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

    /// In-memory window for manager and restore tests.
    pub struct FakeWindow {
        id: String,
        title: Mutex<String>,
        input: Mutex<Vec<u8>>,
        mouse: Mutex<Vec<MouseEvent>>,
        closed: AtomicBool,
        exited: AtomicBool,
        exit_status: Mutex<Option<i32>>,
        update_seq: AtomicU64,
        scrollback_max: AtomicUsize,
        bytes_in: AtomicU64,
        bytes_out: AtomicU64,
        first_read_at: Mutex<Option<DateTime<Utc>>>,
        preview: Mutex<Vec<String>>,
        resized: Mutex<Option<(u16, u16)>>,
        fail_input: AtomicBool,
        on_output: Option<OutputHook>,
        on_first_read: Option<FirstReadHook>,
    }

    impl FakeWindow {
        pub fn from_options(options: WindowOptions) -> Arc<Self> {
            Arc::new(Self {
                id: options.id,
                title: Mutex::new(options.title),
                input: Mutex::new(Vec::new()),
                mouse: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
                exited: AtomicBool::new(false),
                exit_status: Mutex::new(None),
                update_seq: AtomicU64::new(0),
                scrollback_max: AtomicUsize::new(0),
                bytes_in: AtomicU64::new(0),
                bytes_out: AtomicU64::new(0),
                first_read_at: Mutex::new(None),
                preview: Mutex::new(Vec::new()),
                resized: Mutex::new(None),
                fail_input: AtomicBool::new(false),
                on_output: options.on_output,
                on_first_read: options.on_first_read,
            })
        }

        /// A spawner that records every window it creates.
        pub fn spawner(created: Arc<Mutex<Vec<Arc<FakeWindow>>>>) -> WindowSpawner {
            Arc::new(move |options| {
                let window = FakeWindow::from_options(options);
                created.lock().push(window.clone());
                Ok(window as Arc<dyn TerminalWindow>)
            })
        }

        /// Push output through the hooks as if the child had written it.
        pub fn emit_output(&self, data: &[u8]) {
            {
                let mut first = self.first_read_at.lock();
                if first.is_none() {
                    *first = Some(Utc::now());
                    if let Some(hook) = &self.on_first_read {
                        hook();
                    }
                }
            }
            self.bytes_out.fetch_add(data.len() as u64, Ordering::Relaxed);
            self.update_seq.fetch_add(1, Ordering::Relaxed);
            if let Some(hook) = &self.on_output {
                hook(Bytes::copy_from_slice(data));
            }
        }

        pub fn set_exited(&self, status: i32) {
            *self.exit_status.lock() = Some(status);
            self.exited.store(true, Ordering::Relaxed);
        }

        pub fn set_preview(&self, lines: Vec<String>) {
            *self.preview.lock() = lines;
        }

        pub fn set_fail_input(&self, fail: bool) {
            self.fail_input.store(fail, Ordering::Relaxed);
        }

        pub fn input_text(&self) -> String {
            String::from_utf8_lossy(&self.input.lock()).into_owned()
        }

        pub fn mouse_events(&self) -> Vec<MouseEvent> {
            self.mouse.lock().clone()
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::Relaxed)
        }

        pub fn scrollback_max(&self) -> usize {
            self.scrollback_max.load(Ordering::Relaxed)
        }

        pub fn resized_to(&self) -> Option<(u16, u16)> {
            *self.resized.lock()
        }
    }

    impl TerminalWindow for FakeWindow {
        fn id(&self) -> &str {
            &self.id
        }

        fn send_input(&self, data: &[u8]) -> Result<()> {
            if self.fail_input.load(Ordering::Relaxed) {
                return Err(weft_utils::WeftError::unavailable("window write failed"));
            }
            self.input.lock().extend_from_slice(data);
            self.bytes_in.fetch_add(data.len() as u64, Ordering::Relaxed);
            Ok(())
        }

        fn send_mouse(&self, event: &MouseEvent) -> Result<()> {
            self.mouse.lock().push(event.clone());
            Ok(())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::Relaxed);
        }

        fn title(&self) -> String {
            self.title.lock().clone()
        }

        fn set_title(&self, title: &str) {
            *self.title.lock() = title.to_string();
        }

        fn pid(&self) -> Option<u32> {
            Some(4242)
        }

        fn exited(&self) -> bool {
            self.exited.load(Ordering::Relaxed)
        }

        fn exit_status(&self) -> Option<i32> {
            *self.exit_status.lock()
        }

        fn resize(&self, rows: u16, cols: u16) -> Result<()> {
            *self.resized.lock() = Some((rows, cols));
            Ok(())
        }

        fn update_seq(&self) -> u64 {
            self.update_seq.load(Ordering::Relaxed)
        }

        fn preview_plain_lines(&self, limit: usize) -> Vec<String> {
            let preview = self.preview.lock();
            let start = preview.len().saturating_sub(limit);
            preview[start..].to_vec()
        }

        fn first_read_at(&self) -> Option<DateTime<Utc>> {
            *self.first_read_at.lock()
        }

        fn set_scrollback_max_bytes(&self, max_bytes: usize) {
            self.scrollback_max.store(max_bytes, Ordering::Relaxed);
        }

        fn bytes_in(&self) -> u64 {
            self.bytes_in.load(Ordering::Relaxed)
        }

        fn bytes_out(&self) -> u64 {
            self.bytes_out.load(Ordering::Relaxed)
        }
    }
}
