//! Server-Sent Events (SSE) utilities
//!
//! An analysis stream is fed by two independent producers sharing one
//! unbounded channel: the pipeline task (named events) and a heartbeat task
//! (keep-alive comments). The HTTP response drains the channel and ends when
//! every sender has been dropped.

use crate::events::AnalysisEvent;
use axum::response::sse::Event;
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Comment text of the keep-alive line (`: keep-alive`)
pub const KEEP_ALIVE_COMMENT: &str = "keep-alive";

/// Default keep-alive interval
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// One message on an analysis stream channel
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem<R = serde_json::Value> {
    /// Named lifecycle event
    Event(AnalysisEvent<R>),
    /// Comment-only keep-alive line
    KeepAlive,
}

/// Encode an analysis event as a named SSE frame
pub fn to_sse_event<R: Serialize>(event: &AnalysisEvent<R>) -> serde_json::Result<Event> {
    Ok(Event::default()
        .event(event.event_type())
        .data(event.data_json()?))
}

/// Keep-alive frame (comment only, no event name)
pub fn keep_alive_event() -> Event {
    Event::default().comment(KEEP_ALIVE_COMMENT)
}

/// Drain a stream channel into SSE frames
///
/// The stream ends once all senders are dropped (pipeline finished and
/// heartbeat cancelled).
pub fn channel_stream<R>(
    mut rx: mpsc::UnboundedReceiver<StreamItem<R>>,
) -> impl Stream<Item = Result<Event, Infallible>>
where
    R: Serialize + Send + 'static,
{
    async_stream::stream! {
        while let Some(item) = rx.recv().await {
            match item {
                StreamItem::KeepAlive => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(keep_alive_event());
                }
                StreamItem::Event(event) => match to_sse_event(&event) {
                    Ok(frame) => yield Ok(frame),
                    Err(e) => {
                        warn!("SSE: Failed to serialize event {}: {}", event.event_type(), e);
                    }
                },
            }
        }
        debug!("SSE: Channel closed, ending stream");
    }
}

/// Handle to a running heartbeat task
///
/// Dropping the guard cancels the task. Hold it in the scope that owns the
/// stream's lifetime so every exit path (success, failure, disconnect)
/// releases the heartbeat.
#[derive(Debug)]
pub struct HeartbeatGuard {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl HeartbeatGuard {
    /// Cancel and wait for the task to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawn a keep-alive task on `tx`
///
/// Sends `StreamItem::KeepAlive` every `interval` (first one after one full
/// interval) until the guard is dropped or the receiver goes away.
pub fn spawn_heartbeat<R>(
    tx: mpsc::UnboundedSender<StreamItem<R>>,
    interval: Duration,
) -> HeartbeatGuard
where
    R: Send + 'static,
{
    let token = CancellationToken::new();
    let task_token = token.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    debug!("SSE: Heartbeat cancelled");
                    break;
                }
                _ = tx.closed() => {
                    debug!("SSE: Client gone, stopping heartbeat");
                    break;
                }
                _ = ticker.tick() => {
                    if tx.send(StreamItem::KeepAlive).is_err() {
                        break;
                    }
                }
            }
        }
    });

    HeartbeatGuard {
        token,
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AnalysisStep;

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_ticks_until_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel::<StreamItem>();
        let guard = spawn_heartbeat(tx, Duration::from_secs(15));

        tokio::time::sleep(Duration::from_secs(46)).await;
        drop(guard);
        tokio::time::sleep(Duration::from_secs(60)).await;

        let mut beats = 0;
        while let Some(item) = rx.recv().await {
            assert_eq!(item, StreamItem::KeepAlive);
            beats += 1;
        }
        // Channel closed: the task exited and dropped its sender
        assert_eq!(beats, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel::<StreamItem>();
        let guard = spawn_heartbeat(tx, Duration::from_secs(15));
        drop(rx);

        // shutdown() joins the task, which must already have exited
        tokio::time::timeout(Duration::from_secs(1), guard.shutdown())
            .await
            .expect("heartbeat task should exit after receiver drop");
    }

    #[tokio::test]
    async fn test_channel_stream_ends_when_senders_dropped() {
        use futures::StreamExt;

        let (tx, rx) = mpsc::unbounded_channel::<StreamItem>();
        tx.send(StreamItem::Event(AnalysisEvent::progress(AnalysisStep::Loading).unwrap()))
            .unwrap();
        tx.send(StreamItem::KeepAlive).unwrap();
        drop(tx);

        let frames: Vec<_> = channel_stream(rx).collect().await;
        assert_eq!(frames.len(), 2);
    }
}
