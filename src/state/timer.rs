use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle};

/// Purpose of a round timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// The configured guess timeout for the round.
    GuessTimeout,
    /// Grace window opened by the first correct guess when multi-guess is enabled.
    GraceWindow,
}

/// Cancellable one-shot timer that posts a message back into an event loop.
///
/// The spawned task is aborted when the handle is cancelled or dropped, so a timer
/// never outlives the round that armed it.
#[derive(Debug)]
pub struct RoundTimer {
    kind: TimerKind,
    handle: JoinHandle<()>,
}

impl RoundTimer {
    /// Post `message` on `tx` once `delay` has elapsed.
    pub fn schedule<T>(kind: TimerKind, delay: Duration, tx: mpsc::UnboundedSender<T>, message: T) -> Self
    where
        T: Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(message);
        });
        Self { kind, handle }
    }

    /// What this timer is waiting for.
    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    /// Abort the timer task.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _timer = RoundTimer::schedule(TimerKind::GuessTimeout, Duration::from_secs(5), tx, 7u8);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(rx.recv().await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = RoundTimer::schedule(TimerKind::GraceWindow, Duration::from_secs(1), tx, ());
        assert_eq!(timer.kind(), TimerKind::GraceWindow);
        timer.cancel();

        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        // The aborted task dropped its sender, so the channel is closed and empty.
        assert_eq!(rx.recv().await, None);
    }
}
