//! Drives async session operations from synchronous callers.
//!
//! The bridge owns a single tokio runtime, created on first use. Calls are
//! strictly one at a time: a call that arrives while another is running is
//! rejected with [`ChatError::Busy`] rather than queued. A panic inside an
//! operation is reported as [`ChatError::Internal`] and the runtime is
//! discarded; the next call builds a fresh one.
//!
//! [`Bridge::run`] blocks the calling thread and must not be called from
//! inside an async context.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::FutureExt;
use tokio::runtime::{Builder, Runtime};

use crate::error::{ChatError, Result};

pub struct Bridge {
    runtime: Mutex<Option<Runtime>>,
    busy: AtomicBool,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("has_runtime", &self.has_runtime())
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Clears the busy flag when the call ends, panic or not.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Bridge {
    /// A bridge with no runtime yet.
    pub fn new() -> Self {
        Self {
            runtime: Mutex::new(None),
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Whether an idle runtime is parked in the bridge. False while a call
    /// is running, since the call holds the runtime.
    pub fn has_runtime(&self) -> bool {
        self.runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Run `future` to completion on the bridge runtime.
    pub fn run<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("bridge call rejected while another is in flight");
            return Err(ChatError::Busy);
        }
        let _busy = BusyGuard(&self.busy);

        // Taken out for the duration of the call so the lock is never held
        // across `block_on`.
        let taken = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let runtime = match taken {
            Some(runtime) => runtime,
            None => build_runtime()?,
        };

        match runtime.block_on(AssertUnwindSafe(future).catch_unwind()) {
            Ok(output) => {
                *self.runtime.lock().unwrap_or_else(PoisonError::into_inner) = Some(runtime);
                Ok(output)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(panic = %message, "bridge operation panicked, discarding runtime");
                runtime.shutdown_background();
                Err(ChatError::Internal(message))
            }
        }
    }

    /// Shut the runtime down. The next [`Bridge::run`] creates a new one.
    pub fn release(&self) {
        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            tracing::debug!("releasing bridge runtime");
            runtime.shutdown_background();
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.release();
    }
}

fn build_runtime() -> Result<Runtime> {
    let runtime = Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("mcp-chat-runtime")
        .enable_all()
        .build()
        .map_err(|e| ChatError::Runtime(format!("failed to create tokio runtime: {e}")))?;
    tracing::debug!("bridge runtime created");
    Ok(runtime)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("operation panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("operation panicked: {message}")
    } else {
        "operation panicked".to_string()
    }
}
