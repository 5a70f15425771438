//! Set-once readiness flag
//!
//! The latch side is owned by the controller task; any number of
//! [`ReadinessGate`] clones can observe it. Once open it never closes.

use tokio::sync::watch;

/// Read side of the readiness flag
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    rx: watch::Receiver<bool>,
}

impl ReadinessGate {
    /// Non-blocking check
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until the controller has installed its first credential
    ///
    /// If the controller stops before ever becoming ready, this never
    /// returns.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|ready| *ready).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Write side of the readiness flag
#[derive(Debug)]
pub(crate) struct ReadinessLatch {
    tx: watch::Sender<bool>,
}

impl ReadinessLatch {
    /// Opens the latch; returns true only for the call that opened it
    pub(crate) fn open(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }
}

pub(crate) fn readiness() -> (ReadinessLatch, ReadinessGate) {
    let (tx, rx) = watch::channel(false);
    (ReadinessLatch { tx }, ReadinessGate { rx })
}
