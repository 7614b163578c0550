//! CAPTCHA checkpoints.
//!
//! A lookup cannot continue until a human has solved the CAPTCHA in the browser
//! window. The fetcher parks on [`CaptchaGate::wait_for_operator`]; an operator
//! releases it through the HTTP control endpoints or by pressing Enter in the
//! terminal. There is no timeout unless `captcha.max_wait_seconds` is set.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, warn};

use crate::domain::events::{CheckpointOutcome, NotificationEvent};
use crate::domain::{CaseQuery, CheckpointId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("CAPTCHA checkpoint cancelled by operator")]
    Cancelled,

    #[error("CAPTCHA was not confirmed within {}s", .0.as_secs())]
    Expired(Duration),
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingCheckpoint {
    pub id: CheckpointId,
    pub case_type: String,
    pub case_number: String,
    pub filing_year: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Confirmed,
    Cancelled,
}

struct Waiter {
    seq: u64,
    checkpoint: PendingCheckpoint,
    resolve: oneshot::Sender<Resolution>,
}

pub struct CaptchaGate {
    pending: Mutex<HashMap<CheckpointId, Waiter>>,
    next_seq: AtomicU64,
    event_bus: broadcast::Sender<NotificationEvent>,
    max_wait: Option<Duration>,
}

/// Removes the checkpoint when the waiting future finishes or is dropped.
struct PendingGuard<'a> {
    gate: &'a CaptchaGate,
    id: CheckpointId,
    outcome: CheckpointOutcome,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.gate.lock().remove(&self.id);
        self.gate.publish(NotificationEvent::CaptchaResolved {
            id: self.id,
            outcome: self.outcome,
        });
    }
}

impl CaptchaGate {
    #[must_use]
    pub fn new(event_bus: broadcast::Sender<NotificationEvent>, max_wait: Option<Duration>) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            event_bus,
            max_wait,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CheckpointId, Waiter>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: NotificationEvent) {
        // No subscribers is fine.
        let _ = self.event_bus.send(event);
    }

    /// Registers a checkpoint for `query` and suspends until it is resolved.
    pub async fn wait_for_operator(&self, query: &CaseQuery) -> Result<(), CheckpointError> {
        let id = CheckpointId::new();
        let (tx, rx) = oneshot::channel();

        let checkpoint = PendingCheckpoint {
            id,
            case_type: query.case_type.name().to_string(),
            case_number: query.case_number.clone(),
            filing_year: query.filing_year.clone(),
            requested_at: Utc::now(),
        };

        self.lock().insert(
            id,
            Waiter {
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                checkpoint,
                resolve: tx,
            },
        );

        let mut guard = PendingGuard {
            gate: self,
            id,
            outcome: CheckpointOutcome::Abandoned,
        };

        warn!(
            checkpoint_id = %id,
            case = %query,
            "CAPTCHA required: solve it in the browser window, then confirm the checkpoint"
        );
        self.publish(NotificationEvent::CaptchaRequired {
            id,
            case_type: query.case_type.name().to_string(),
            case_number: query.case_number.clone(),
            filing_year: query.filing_year.clone(),
        });

        let resolution = match self.max_wait {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    guard.outcome = CheckpointOutcome::Expired;
                    return Err(CheckpointError::Expired(limit));
                }
            },
            None => rx.await,
        };

        match resolution {
            Ok(Resolution::Confirmed) => {
                guard.outcome = CheckpointOutcome::Confirmed;
                info!(checkpoint_id = %id, "CAPTCHA checkpoint confirmed");
                Ok(())
            }
            // A dropped sender only happens when the gate itself goes away.
            Ok(Resolution::Cancelled) | Err(_) => {
                guard.outcome = CheckpointOutcome::Cancelled;
                info!(checkpoint_id = %id, "CAPTCHA checkpoint cancelled");
                Err(CheckpointError::Cancelled)
            }
        }
    }

    fn resolve(&self, id: CheckpointId, resolution: Resolution) -> bool {
        let Some(waiter) = self.lock().remove(&id) else {
            return false;
        };
        waiter.resolve.send(resolution).is_ok()
    }

    /// Releases the fetch waiting on `id`. Returns false for unknown ids.
    pub fn confirm(&self, id: CheckpointId) -> bool {
        self.resolve(id, Resolution::Confirmed)
    }

    /// Fails the fetch waiting on `id`. Returns false for unknown ids.
    pub fn cancel(&self, id: CheckpointId) -> bool {
        self.resolve(id, Resolution::Cancelled)
    }

    /// Confirms the longest-waiting checkpoint.
    pub fn confirm_oldest(&self) -> Option<CheckpointId> {
        let oldest = self.pending().first().map(|c| c.id)?;
        self.confirm(oldest).then_some(oldest)
    }

    #[must_use]
    pub fn pending(&self) -> Vec<PendingCheckpoint> {
        let pending = self.lock();
        let mut waiters: Vec<&Waiter> = pending.values().collect();
        waiters.sort_by_key(|w| w.seq);
        waiters.into_iter().map(|w| w.checkpoint.clone()).collect()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Prints an attention banner for each new checkpoint and confirms the
    /// oldest one whenever a line is read from stdin.
    pub fn spawn_terminal_confirmation(self: Arc<Self>) {
        let mut rx = self.event_bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(NotificationEvent::CaptchaRequired {
                        case_type,
                        case_number,
                        filing_year,
                        ..
                    }) => {
                        println!();
                        println!("--- ATTENTION: CAPTCHA REQUIRED ---");
                        println!("Case: {case_type} {case_number}/{filing_year}");
                        println!("A browser window has opened. Please solve the CAPTCHA on the webpage.");
                        println!("After solving the CAPTCHA and clicking 'Go', press Enter in this terminal to continue...");
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!(count, "Terminal notifier lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let lines = forward_lines(std::io::BufReader::new(std::io::stdin()));
        self.spawn_line_confirmation(lines);
    }

    /// Confirms the oldest pending checkpoint for every line received.
    fn spawn_line_confirmation(self: Arc<Self>, mut lines: mpsc::Receiver<()>) {
        tokio::spawn(async move {
            while lines.recv().await.is_some() {
                match self.confirm_oldest() {
                    Some(id) => println!("Continuing lookup for checkpoint {id}"),
                    None => println!("No CAPTCHA checkpoint is waiting."),
                }
            }
        });
    }
}

/// Reads `reader` on a plain thread so a pending read never holds up runtime
/// shutdown. The thread exits at end of input or once the receiver is dropped.
fn forward_lines<R: BufRead + Send + 'static>(reader: R) -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(8);

    let spawned = std::thread::Builder::new()
        .name("captcha-confirm".to_string())
        .spawn(move || {
            for line in reader.lines() {
                if let Err(e) = line {
                    warn!(error = %e, "Stopped reading terminal confirmations");
                    break;
                }
                if tx.blocking_send(()).is_err() {
                    break;
                }
            }
        });

    if let Err(e) = spawned {
        warn!(error = %e, "Could not start terminal confirmation reader");
    }

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(max_wait: Option<Duration>) -> Arc<CaptchaGate> {
        let (tx, _) = broadcast::channel(16);
        Arc::new(CaptchaGate::new(tx, max_wait))
    }

    fn query() -> CaseQuery {
        CaseQuery::new("Writ Petition", "123", "2023")
    }

    async fn wait_until_pending(gate: &CaptchaGate) -> CheckpointId {
        loop {
            if let Some(c) = gate.pending().first() {
                return c.id;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn confirm_releases_waiter() {
        let gate = gate(None);
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait_for_operator(&query()).await }
        });

        let id = wait_until_pending(&gate).await;
        let pending = gate.pending();
        assert_eq!(pending[0].case_type, "Writ Petition");
        assert_eq!(pending[0].case_number, "123");

        assert!(gate.confirm(id));
        assert_eq!(waiter.await.unwrap(), Ok(()));
        assert_eq!(gate.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancel_fails_waiter() {
        let gate = gate(None);
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait_for_operator(&query()).await }
        });

        let id = wait_until_pending(&gate).await;
        assert!(gate.cancel(id));
        assert_eq!(waiter.await.unwrap(), Err(CheckpointError::Cancelled));
    }

    #[tokio::test]
    async fn unknown_checkpoint_is_rejected() {
        let gate = gate(None);
        assert!(!gate.confirm(CheckpointId::new()));
        assert!(!gate.cancel(CheckpointId::new()));
        assert!(gate.confirm_oldest().is_none());
    }

    #[tokio::test]
    async fn max_wait_expires_checkpoint() {
        let gate = gate(Some(Duration::from_millis(20)));
        let result = gate.wait_for_operator(&query()).await;

        assert_eq!(
            result,
            Err(CheckpointError::Expired(Duration::from_millis(20)))
        );
        assert_eq!(gate.pending_count(), 0);
    }

    #[tokio::test]
    async fn dropped_waiter_clears_checkpoint() {
        let gate = gate(None);
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait_for_operator(&query()).await }
        });

        wait_until_pending(&gate).await;
        waiter.abort();
        let _ = waiter.await;

        assert_eq!(gate.pending_count(), 0);
    }

    #[tokio::test]
    async fn confirm_oldest_picks_first_registered() {
        let gate = gate(None);
        let first = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait_for_operator(&query()).await }
        });
        let first_id = wait_until_pending(&gate).await;

        let second = tokio::spawn({
            let gate = gate.clone();
            async move {
                gate.wait_for_operator(&CaseQuery::new("Civil Suit", "9", "2020"))
                    .await
            }
        });
        while gate.pending_count() < 2 {
            tokio::task::yield_now().await;
        }

        assert_eq!(gate.confirm_oldest(), Some(first_id));
        assert_eq!(first.await.unwrap(), Ok(()));
        assert_eq!(gate.pending_count(), 1);

        second.abort();
    }

    #[tokio::test]
    async fn terminal_line_confirms_oldest_checkpoint() {
        let gate = gate(None);
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait_for_operator(&query()).await }
        });
        wait_until_pending(&gate).await;

        gate.clone()
            .spawn_line_confirmation(forward_lines(std::io::Cursor::new("\n")));

        assert_eq!(waiter.await.unwrap(), Ok(()));
        assert_eq!(gate.pending_count(), 0);
    }

    struct StalledInput;

    impl std::io::Read for StalledInput {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            std::thread::sleep(Duration::from_secs(30));
            Ok(0)
        }
    }

    #[test]
    fn runtime_shuts_down_while_input_is_pending() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let gate = gate(None);
            gate.clone().spawn_terminal_confirmation();
            gate.spawn_line_confirmation(forward_lines(std::io::BufReader::new(StalledInput)));
            tokio::task::yield_now().await;
        });

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            drop(runtime);
            let _ = done_tx.send(());
        });

        assert!(
            done_rx.recv_timeout(Duration::from_secs(3)).is_ok(),
            "runtime drop blocked on a pending terminal read"
        );
    }

    #[tokio::test]
    async fn events_are_published() {
        let (tx, mut rx) = broadcast::channel(16);
        let gate = Arc::new(CaptchaGate::new(tx, Some(Duration::from_millis(5))));

        let _ = gate.wait_for_operator(&query()).await;

        assert!(matches!(
            rx.recv().await.unwrap(),
            NotificationEvent::CaptchaRequired { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            NotificationEvent::CaptchaResolved {
                outcome: CheckpointOutcome::Expired,
                ..
            }
        ));
    }
}
