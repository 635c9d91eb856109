//! Per-turn event fan-out with resumable replay.
//!
//! Registration and the replay watermark are taken under the turn's channel
//! lock, and blocks are only published after they are durable. A subscriber
//! therefore replays everything up to the watermark from the [`BlockLog`]
//! and receives everything after it live, with no gap and no duplicate.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::Stream;
use meridian_core::{TurnEvent, TurnId};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::block_log::BlockLog;
use crate::error::{Result, RuntimeError};

struct AbandonWatch {
    cancel: CancellationToken,
    handle_released: bool,
}

struct TurnChannel {
    /// Highest block sequence published so far.
    watermark: u64,
    started: Option<TurnEvent>,
    status: Option<TurnEvent>,
    subscribers: Vec<(u64, mpsc::Sender<TurnEvent>)>,
    abandon: Option<AbandonWatch>,
    /// Set by `close`; a subscriber that reaches the channel afterwards gets
    /// it from the backlog instead of registering.
    terminal: Option<TurnEvent>,
}

impl TurnChannel {
    fn cancel_if_abandoned(&mut self, turn_id: &TurnId) {
        let abandoned = self
            .abandon
            .as_ref()
            .is_some_and(|watch| watch.handle_released && self.subscribers.is_empty());
        if abandoned {
            if let Some(watch) = self.abandon.take() {
                info!(turn.id = %turn_id, "turn abandoned by all observers, cancelling");
                watch.cancel.cancel();
            }
        }
    }
}

struct HubInner {
    log: Arc<BlockLog>,
    capacity: usize,
    turns: Mutex<HashMap<TurnId, Arc<Mutex<TurnChannel>>>>,
    next_subscriber: AtomicU64,
}

/// Live event distribution for running turns.
#[derive(Clone)]
pub struct StreamHub {
    inner: Arc<HubInner>,
}

impl StreamHub {
    pub fn new(log: Arc<BlockLog>, subscriber_capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                log,
                capacity: subscriber_capacity.max(1),
                turns: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    fn channel(&self, turn_id: &TurnId) -> Option<Arc<Mutex<TurnChannel>>> {
        self.inner.turns.lock().get(turn_id).cloned()
    }

    /// Register a running turn. Must happen before its id is handed out.
    pub fn open(&self, turn_id: &TurnId) {
        self.inner.turns.lock().entry(turn_id.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(TurnChannel {
                watermark: 0,
                started: None,
                status: None,
                subscribers: Vec::new(),
                abandon: None,
                terminal: None,
            }))
        });
    }

    pub fn is_open(&self, turn_id: &TurnId) -> bool {
        self.inner.turns.lock().contains_key(turn_id)
    }

    /// Cancel `cancel` once the turn handle is released and no subscriber remains.
    pub fn watch_abandonment(&self, turn_id: &TurnId, cancel: CancellationToken) {
        if let Some(channel) = self.channel(turn_id) {
            channel.lock().abandon = Some(AbandonWatch {
                cancel,
                handle_released: false,
            });
        }
    }

    pub(crate) fn release_handle(&self, turn_id: &TurnId) {
        if let Some(channel) = self.channel(turn_id) {
            let mut channel = channel.lock();
            if let Some(watch) = channel.abandon.as_mut() {
                watch.handle_released = true;
            }
            channel.cancel_if_abandoned(turn_id);
        }
    }

    /// Deliver `event` to every subscriber of the turn.
    ///
    /// Block events must already be durable. A subscriber whose queue is full
    /// is dropped; it resumes by resubscribing with its last sequence.
    pub fn publish(&self, turn_id: &TurnId, event: TurnEvent) {
        let Some(channel) = self.channel(turn_id) else {
            debug!(turn.id = %turn_id, event = event.event_name(), "publish to closed turn ignored");
            return;
        };
        let mut channel = channel.lock();
        match &event {
            TurnEvent::Block { block } => channel.watermark = block.sequence,
            TurnEvent::TurnStart { .. } => channel.started = Some(event.clone()),
            TurnEvent::Status { .. } => channel.status = Some(event.clone()),
            _ => {}
        }

        channel.subscribers.retain(|(id, tx)| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(turn.id = %turn_id, subscriber = id, "subscriber fell behind, disconnecting");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
        channel.cancel_if_abandoned(turn_id);
    }

    /// Deliver the terminal event and close every channel of the turn.
    pub fn close(&self, turn_id: &TurnId, terminal: TurnEvent) {
        let Some(channel) = self.inner.turns.lock().remove(turn_id) else {
            return;
        };
        let mut channel = channel.lock();
        channel.abandon = None;
        channel.terminal = Some(terminal.clone());
        for (id, tx) in channel.subscribers.drain(..) {
            if tx.try_send(terminal.clone()).is_err() {
                debug!(turn.id = %turn_id, subscriber = id, "subscriber missed terminal event");
            }
        }
    }

    /// Replay blocks after `last_seen`, then follow the turn live.
    ///
    /// For a turn that is no longer running the subscription holds the full
    /// replay followed by the terminal event. Unknown turns are `NotFound`.
    pub async fn subscribe(&self, turn_id: &TurnId, last_seen: u64) -> Result<Subscription> {
        match self.channel(turn_id) {
            Some(channel) => self.subscribe_running(channel, turn_id, last_seen).await,
            None => self.subscribe_finished(turn_id, last_seen).await,
        }
    }

    async fn subscribe_running(
        &self,
        channel: Arc<Mutex<TurnChannel>>,
        turn_id: &TurnId,
        last_seen: u64,
    ) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let subscriber_id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let registered = {
            let mut channel = channel.lock();
            match channel.terminal.clone() {
                Some(terminal) => Err(terminal),
                None => {
                    channel.subscribers.push((subscriber_id, tx));
                    let preamble: Vec<TurnEvent> = [channel.started.clone(), channel.status.clone()]
                        .into_iter()
                        .flatten()
                        .collect();
                    Ok((channel.watermark, preamble))
                }
            }
        };
        let (watermark, preamble) = match registered {
            Ok(registered) => registered,
            Err(terminal) => return self.subscribe_closed(turn_id, last_seen, terminal).await,
        };
        let guard = SubscriberGuard {
            hub: self.clone(),
            turn_id: turn_id.clone(),
            subscriber_id,
        };

        let mut backlog: VecDeque<TurnEvent> = preamble.into();
        if last_seen < watermark {
            let blocks = self.inner.log.replay(turn_id, last_seen).await?;
            backlog.extend(
                blocks
                    .into_iter()
                    .filter(|block| block.sequence <= watermark)
                    .map(TurnEvent::block),
            );
        }
        debug!(turn.id = %turn_id, subscriber = subscriber_id, last_seen, watermark, "subscribed to running turn");

        Ok(Subscription {
            turn_id: turn_id.clone(),
            last_sequence: last_seen,
            backlog,
            live: Some(rx),
            _guard: Some(guard),
        })
    }

    /// The channel was closed between lookup and registration.
    async fn subscribe_closed(&self, turn_id: &TurnId, last_seen: u64, terminal: TurnEvent) -> Result<Subscription> {
        let blocks = self.inner.log.replay(turn_id, last_seen).await?;
        let mut backlog: VecDeque<TurnEvent> = blocks.into_iter().map(TurnEvent::block).collect();
        backlog.push_back(terminal);
        debug!(turn.id = %turn_id, last_seen, "subscribed as the turn closed");

        Ok(Subscription {
            turn_id: turn_id.clone(),
            last_sequence: last_seen,
            backlog,
            live: None,
            _guard: None,
        })
    }

    async fn subscribe_finished(&self, turn_id: &TurnId, last_seen: u64) -> Result<Subscription> {
        let store = Arc::clone(self.inner.log.store());
        let id = turn_id.clone();
        let turn = tokio::task::spawn_blocking(move || store.get_turn(&id))
            .await
            .map_err(|e| RuntimeError::Storage(e.to_string()))??
            .ok_or_else(|| RuntimeError::NotFound(format!("turn {turn_id}")))?;

        let blocks = self.inner.log.replay(turn_id, last_seen).await?;
        let last_sequence = match blocks.last() {
            Some(block) => block.sequence,
            None => self.inner.log.last_sequence(turn_id).await?,
        };

        let mut backlog: VecDeque<TurnEvent> = blocks.into_iter().map(TurnEvent::block).collect();
        match TurnEvent::terminal_for(&turn, last_sequence) {
            Some(terminal) => backlog.push_back(terminal),
            None => warn!(turn.id = %turn_id, status = %turn.status, "turn is not running in this process"),
        }

        Ok(Subscription {
            turn_id: turn_id.clone(),
            last_sequence: last_seen,
            backlog,
            live: None,
            _guard: None,
        })
    }

    pub fn subscriber_count(&self, turn_id: &TurnId) -> usize {
        self.channel(turn_id)
            .map(|channel| channel.lock().subscribers.len())
            .unwrap_or(0)
    }

    fn unsubscribe(&self, turn_id: &TurnId, subscriber_id: u64) {
        if let Some(channel) = self.channel(turn_id) {
            let mut channel = channel.lock();
            channel.subscribers.retain(|(id, _)| *id != subscriber_id);
            channel.cancel_if_abandoned(turn_id);
        }
    }
}

struct SubscriberGuard {
    hub: StreamHub,
    turn_id: TurnId,
    subscriber_id: u64,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.turn_id, self.subscriber_id);
    }
}

/// One subscriber's view of a turn: replayed events first, then live ones.
pub struct Subscription {
    turn_id: TurnId,
    /// Highest block sequence delivered; later duplicates and stale deltas are skipped.
    last_sequence: u64,
    backlog: VecDeque<TurnEvent>,
    live: Option<mpsc::Receiver<TurnEvent>>,
    _guard: Option<SubscriberGuard>,
}

impl Subscription {
    pub fn turn_id(&self) -> &TurnId {
        &self.turn_id
    }

    /// Next event, or `None` once the turn's channel is closed.
    pub async fn next(&mut self) -> Option<TurnEvent> {
        loop {
            let event = match self.backlog.pop_front() {
                Some(event) => event,
                None => self.live.as_mut()?.recv().await?,
            };
            match &event {
                TurnEvent::Block { block } => {
                    if block.sequence <= self.last_sequence {
                        continue;
                    }
                    self.last_sequence = block.sequence;
                }
                TurnEvent::BlockDelta { sequence, .. } => {
                    if *sequence <= self.last_sequence {
                        continue;
                    }
                }
                _ => {}
            }
            return Some(event);
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = TurnEvent> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            let event = subscription.next().await?;
            Some((event, subscription))
        })
    }
}
