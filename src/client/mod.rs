//! Async FTP client implementation

mod connection;
mod data;
mod fs;
mod io;
mod listing;
mod transfer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::ConnectOptions;
use crate::features::Features;
use crate::response::Response;

use io::ControlConn;

/// Async FTP/FTPS client
///
/// One `FtpClient` owns one command channel. Operations serialize on an
/// internal mutex, so a single client is safe to share behind an `Arc`,
/// but commands never overlap on the wire; open parallel sessions for
/// concurrent transfers.
///
/// # Example
///
/// ```no_run
/// use ftp_rs::{ConnectOptions, FtpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = FtpClient::dial(
///     "ftp.example.com:21",
///     ConnectOptions::new().credentials("user", "pass"),
/// )
/// .await?;
///
/// for entry in client.list("").await? {
///     println!("{} ({} bytes)", entry.name, entry.size);
/// }
/// client.quit().await?;
/// # Ok(())
/// # }
/// ```
#[must_use]
pub struct FtpClient {
    /// Serializes whole operations. Data-bearing commands hold this
    /// across open, payload copy and completion read so no other
    /// command can interleave; `quit` deliberately bypasses it to
    /// interrupt a stuck transfer.
    op: Mutex<()>,
    /// Command channel; the mutex serializes command/reply exchanges
    conn: Arc<Mutex<ControlConn>>,
    /// State shared with the keep-alive task and in-flight transfers
    shared: Arc<Shared>,
    /// Configuration snapshot from dial time
    options: Arc<ConnectOptions>,
    /// The server's welcome banner
    greeting: Response,
    /// Keep-alive task handle, present while the task runs
    keepalive: StdMutex<Option<KeepAlive>>,
}

impl std::fmt::Debug for FtpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpClient").finish_non_exhaustive()
    }
}

struct KeepAlive {
    shutdown: watch::Sender<()>,
    task: JoinHandle<()>,
}

/// Session state reachable without the command-channel mutex
pub(crate) struct Shared {
    /// When the last command was sent (keep-alive idle tracking)
    last_command: StdMutex<Instant>,
    /// A payload copy is running; keep-alive must not fire
    transfer_in_progress: AtomicBool,
    /// Quit was called; in-flight copies must bail out
    aborted: AtomicBool,
    /// Wakes copies blocked on data-connection I/O
    abort: Notify,
    /// Feature map from FEAT, populated at most once
    features: OnceLock<Features>,
}

impl Shared {
    fn new() -> Self {
        Self {
            last_command: StdMutex::new(Instant::now()),
            transfer_in_progress: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            abort: Notify::new(),
            features: OnceLock::new(),
        }
    }

    /// Stamp the keep-alive clock
    pub(crate) fn touch(&self) {
        if let Ok(mut last) = self.last_command.lock() {
            *last = Instant::now();
        }
    }

    pub(crate) fn idle_for(&self) -> Duration {
        self.last_command
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    pub(crate) fn begin_transfer(&self) {
        self.transfer_in_progress.store(true, Ordering::SeqCst);
    }

    pub(crate) fn end_transfer(&self) {
        self.transfer_in_progress.store(false, Ordering::SeqCst);
    }

    pub(crate) fn transfer_in_progress(&self) -> bool {
        self.transfer_in_progress.load(Ordering::SeqCst)
    }

    /// Force any in-flight payload copy to fail with `Aborted`
    pub(crate) fn abort_transfers(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.abort.notify_waiters();
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub(crate) async fn aborted_wait(&self) {
        if self.is_aborted() {
            return;
        }
        self.abort.notified().await;
    }
}

impl FtpClient {
    fn from_parts(
        conn: ControlConn,
        shared: Arc<Shared>,
        options: Arc<ConnectOptions>,
        greeting: Response,
    ) -> Self {
        Self {
            op: Mutex::new(()),
            conn: Arc::new(Mutex::new(conn)),
            shared,
            options,
            greeting,
            keepalive: StdMutex::new(None),
        }
    }

    /// The server's welcome banner from session establishment
    pub fn greeting(&self) -> &Response {
        &self.greeting
    }

    /// The feature map from the post-login FEAT exchange
    ///
    /// Empty until login completes, and stays empty when the server
    /// rejects FEAT; lookups never touch the network.
    pub fn features(&self) -> Features {
        self.shared
            .features
            .get()
            .cloned()
            .unwrap_or_default()
    }

    /// True once `quit` has closed the command channel
    pub async fn is_closed(&self) -> bool {
        self.conn.lock().await.is_closed()
    }
}

impl Drop for FtpClient {
    fn drop(&mut self) {
        // quit() awaits the keep-alive task; a dropped client without
        // quit still must not leak it
        if let Ok(mut guard) = self.keepalive.lock() {
            if let Some(keepalive) = guard.take() {
                keepalive.task.abort();
            }
        }
        debug!("FtpClient dropped");
    }
}
