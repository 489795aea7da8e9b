#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use askroom_domain::{Message, RoomId};
use askroom_protocol::decode_event;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::api::SnapshotSource;
use crate::cache::RoomCache;
use crate::projector::project;
use crate::reducer::{Outcome, reduce};
use crate::stream::{EventStream, StreamConnector, ws_connector};
use crate::{ApiClient, ClientConfig, SyncError};

const COMMAND_QUEUE_CAPACITY: usize = 16;

/// Control messages for the engine task.
#[derive(Debug)]
pub enum SyncCommand {
	/// Switch to a room: tear down the current subscription, discard the
	/// cache, then snapshot + subscribe for the new room.
	SetRoom(RoomId),

	/// Leave the current room and go idle.
	ClearRoom,

	/// Stop the engine task.
	Shutdown,
}

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
	/// No room selected.
	Idle,

	/// Connection is being set up and/or the snapshot is in flight.
	LoadingSnapshot,

	/// Snapshot landed; incremental events are being applied.
	Live,

	/// The snapshot request failed. Distinguishable from an empty room: no
	/// cache exists in this phase.
	SnapshotFailed { detail: String },

	/// Connection lost; a reconnect is scheduled. Cache contents survive.
	Reconnecting { attempt: u32 },

	/// Connection lost and reconnection is disabled.
	Disconnected,
}

/// The view published to the display layer after every change.
#[derive(Debug, Clone)]
pub struct RoomView {
	pub room: Option<RoomId>,
	pub phase: SyncPhase,

	/// Projector output: reaction count descending, insertion-order ties.
	pub messages: Vec<Message>,
}

impl RoomView {
	fn idle() -> Self {
		Self {
			room: None,
			phase: SyncPhase::Idle,
			messages: Vec::new(),
		}
	}
}

/// Handle to a running synchronization engine.
///
/// Owns the command channel and the engine task; dropping the handle without
/// [`RoomSync::shutdown`] leaves the task running until the runtime stops.
pub struct RoomSync {
	cmd_tx: mpsc::Sender<SyncCommand>,
	view_rx: watch::Receiver<RoomView>,
	engine: tokio::task::JoinHandle<()>,
}

impl RoomSync {
	/// Spawn an engine using the real HTTP + WebSocket collaborators.
	pub fn spawn(cfg: ClientConfig) -> Result<Self, SyncError> {
		cfg.validate()?;
		let api = ApiClient::from_base(&cfg.api_base_url).map_err(|e| SyncError::Endpoint(format!("{e:#}")))?;
		Ok(Self::spawn_with(cfg, Arc::new(api), ws_connector()))
	}

	/// Spawn an engine with injected collaborators (tests, embedding).
	pub fn spawn_with(cfg: ClientConfig, snapshots: Arc<dyn SnapshotSource>, connector: StreamConnector) -> Self {
		let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
		let (view_tx, view_rx) = watch::channel(RoomView::idle());

		let engine = Engine {
			cfg,
			snapshots,
			connector,
			cmd_rx,
			view_tx,
		};

		Self {
			cmd_tx,
			view_rx,
			engine: tokio::spawn(engine.run()),
		}
	}

	/// Receiver for the published view; `changed()` is the change signal.
	pub fn watch(&self) -> watch::Receiver<RoomView> {
		self.view_rx.clone()
	}

	pub async fn set_room(&self, room: RoomId) -> Result<(), SyncError> {
		self.cmd_tx
			.send(SyncCommand::SetRoom(room))
			.await
			.map_err(|_| SyncError::EngineStopped)
	}

	pub async fn clear_room(&self) -> Result<(), SyncError> {
		self.cmd_tx.send(SyncCommand::ClearRoom).await.map_err(|_| SyncError::EngineStopped)
	}

	/// Deterministic teardown: the live connection is released and the engine
	/// task has ended before this returns. No cache mutation afterwards.
	pub async fn shutdown(self) {
		let _ = self.cmd_tx.send(SyncCommand::Shutdown).await;
		let _ = self.engine.await;
	}
}

enum CmdAction {
	Switch(Option<RoomId>),
	Shutdown,
}

enum RoomExit {
	Switch(Option<RoomId>),
	Shutdown,
}

enum SnapshotStep {
	Loaded { cache: RoomCache, early: VecDeque<String> },
	Failed { detail: String },
	Exit(RoomExit),
}

enum LiveStep {
	Cmd(Option<SyncCommand>),
	Frame(anyhow::Result<Option<String>>),
}

enum LiveExit {
	StreamEnded,
	Exit(RoomExit),
}

struct Engine {
	cfg: ClientConfig,
	snapshots: Arc<dyn SnapshotSource>,
	connector: StreamConnector,
	cmd_rx: mpsc::Receiver<SyncCommand>,
	view_tx: watch::Sender<RoomView>,
}

impl Engine {
	fn action(cmd: Option<SyncCommand>) -> CmdAction {
		match cmd {
			Some(SyncCommand::SetRoom(room)) => CmdAction::Switch(Some(room)),
			Some(SyncCommand::ClearRoom) => CmdAction::Switch(None),
			// A closed command channel means the handle is gone; stop.
			Some(SyncCommand::Shutdown) | None => CmdAction::Shutdown,
		}
	}

	fn publish(&self, room: Option<&RoomId>, phase: SyncPhase, cache: Option<&RoomCache>) {
		self.view_tx.send_replace(RoomView {
			room: room.cloned(),
			phase,
			messages: cache.map(project).unwrap_or_default(),
		});
	}

	async fn run(mut self) {
		let mut room: Option<RoomId> = None;

		loop {
			match room.take() {
				None => {
					self.publish(None, SyncPhase::Idle, None);
					match Self::action(self.cmd_rx.recv().await) {
						CmdAction::Switch(next) => room = next,
						CmdAction::Shutdown => return,
					}
				}
				Some(current) => match self.run_room(&current).await {
					RoomExit::Switch(next) => room = next,
					RoomExit::Shutdown => return,
				},
			}
		}
	}

	/// Drive one room until a switch or shutdown.
	///
	/// The cache lives here: created from the first successful snapshot,
	/// preserved across reconnects, dropped wholesale when the room changes.
	async fn run_room(&mut self, room: &RoomId) -> RoomExit {
		let session_id = uuid::Uuid::new_v4();
		info!(room = %room, %session_id, "room session starting");

		let mut cache: Option<RoomCache> = None;
		let mut attempt: u32 = 0;
		let mut retry_phase: Option<SyncPhase> = None;

		loop {
			if attempt > 0 {
				if self.cfg.reconnect {
					let phase = retry_phase.take().unwrap_or(SyncPhase::Reconnecting { attempt });
					self.publish(Some(room), phase, cache.as_ref());

					metrics::counter!("askroom_client_reconnects_total").increment(1);
					if let Some(exit) = self.backoff_pause(room, attempt).await {
						return exit;
					}
				} else {
					let phase = retry_phase.take().unwrap_or(SyncPhase::Disconnected);
					self.publish(Some(room), phase, cache.as_ref());
					return self.park(room).await;
				}
			}

			if cache.is_none() {
				self.publish(Some(room), SyncPhase::LoadingSnapshot, None);
			}

			let url = match self.cfg.subscribe_url(room) {
				Ok(url) => url,
				Err(e) => {
					warn!(room = %room, error = %e, "cannot build subscribe url");
					self.publish(Some(room), SyncPhase::Disconnected, cache.as_ref());
					return self.park(room).await;
				}
			};

			let mut stream = match tokio::time::timeout(self.cfg.connect_timeout, (self.connector)(url)).await {
				Ok(Ok(stream)) => stream,
				Ok(Err(e)) => {
					warn!(room = %room, error = format!("{e:#}"), "event stream connect failed");
					attempt = attempt.saturating_add(1);
					continue;
				}
				Err(_) => {
					warn!(room = %room, timeout = ?self.cfg.connect_timeout, "event stream connect timed out");
					attempt = attempt.saturating_add(1);
					continue;
				}
			};

			if cache.is_none() {
				// First landing for this room: the stream is already open, so
				// frames racing the snapshot are buffered and replayed below.
				match self.load_snapshot_buffering(room, &mut stream).await {
					SnapshotStep::Loaded { cache: fresh, early } => {
						metrics::counter!("askroom_client_snapshots_total").increment(1);
						info!(room = %room, records = fresh.len(), buffered = early.len(), "snapshot landed");

						cache = Some(fresh);
						attempt = 0;
						self.publish(Some(room), SyncPhase::Live, cache.as_ref());

						if let Some(c) = cache.as_mut() {
							for text in early {
								Self::process_frame(&self.view_tx, room, c, &text);
							}
						}
					}
					SnapshotStep::Failed { detail } => {
						metrics::counter!("askroom_client_snapshot_errors_total").increment(1);
						warn!(room = %room, detail = %detail, "snapshot load failed");

						stream.close().await;
						attempt = attempt.saturating_add(1);
						retry_phase = Some(SyncPhase::SnapshotFailed { detail });
						continue;
					}
					SnapshotStep::Exit(exit) => {
						stream.close().await;
						return exit;
					}
				}
			} else {
				// Reconnect: the cache survives untouched and the snapshot is
				// not refetched; the stream is best-effort and gaps stay gaps.
				attempt = 0;
				self.publish(Some(room), SyncPhase::Live, cache.as_ref());
			}

			let c = cache.as_mut().expect("cache populated before the live loop");
			match self.live_loop(room, c, &mut stream).await {
				LiveExit::Exit(exit) => {
					stream.close().await;
					return exit;
				}
				LiveExit::StreamEnded => {
					stream.close().await;
					attempt = attempt.saturating_add(1);
				}
			}
		}
	}

	/// Fetch the snapshot while the open stream buffers early frames.
	///
	/// Buffered frames are returned for replay after the cache is built, so
	/// no event is lost and none is applied twice. A stream that dies during
	/// the load is left for the live loop to observe.
	async fn load_snapshot_buffering(&mut self, room: &RoomId, stream: &mut Box<dyn EventStream>) -> SnapshotStep {
		let snapshots = Arc::clone(&self.snapshots);
		let mut load = snapshots.load(room);

		let mut early: VecDeque<String> = VecDeque::new();
		let mut stream_done = false;

		loop {
			tokio::select! {
				res = &mut load => {
					return match res {
						Ok(records) => SnapshotStep::Loaded {
							cache: RoomCache::from_snapshot(records),
							early,
						},
						Err(e) => SnapshotStep::Failed { detail: e.to_string() },
					};
				}
				frame = stream.next_text(), if !stream_done => match frame {
					Ok(Some(text)) => early.push_back(text),
					Ok(None) => {
						debug!(room = %room, "event stream ended during snapshot load");
						stream_done = true;
					}
					Err(e) => {
						debug!(room = %room, error = format!("{e:#}"), "event stream failed during snapshot load");
						stream_done = true;
					}
				},
				cmd = self.cmd_rx.recv() => match Self::action(cmd) {
					CmdAction::Switch(next) if next.as_ref() == Some(room) => {}
					CmdAction::Switch(next) => return SnapshotStep::Exit(RoomExit::Switch(next)),
					CmdAction::Shutdown => return SnapshotStep::Exit(RoomExit::Shutdown),
				},
			}
		}
	}

	/// Apply incoming frames one at a time until the stream or room ends.
	async fn live_loop(&mut self, room: &RoomId, cache: &mut RoomCache, stream: &mut Box<dyn EventStream>) -> LiveExit {
		loop {
			let step = tokio::select! {
				cmd = self.cmd_rx.recv() => LiveStep::Cmd(cmd),
				frame = stream.next_text() => LiveStep::Frame(frame),
			};

			match step {
				LiveStep::Cmd(cmd) => match Self::action(cmd) {
					CmdAction::Switch(next) if next.as_ref() == Some(room) => {
						debug!(room = %room, "room already active; ignoring re-select");
					}
					CmdAction::Switch(next) => return LiveExit::Exit(RoomExit::Switch(next)),
					CmdAction::Shutdown => return LiveExit::Exit(RoomExit::Shutdown),
				},
				LiveStep::Frame(Ok(Some(text))) => Self::process_frame(&self.view_tx, room, cache, &text),
				LiveStep::Frame(Ok(None)) => {
					info!(room = %room, "event stream ended");
					return LiveExit::StreamEnded;
				}
				LiveStep::Frame(Err(e)) => {
					warn!(room = %room, error = format!("{e:#}"), "event stream read error");
					return LiveExit::StreamEnded;
				}
			}
		}
	}

	/// Decode one raw payload and run it through the reducer.
	///
	/// Decode failures and unknown-id mutations are absorbed here; neither
	/// touches the connection state.
	fn process_frame(view_tx: &watch::Sender<RoomView>, room: &RoomId, cache: &mut RoomCache, raw: &str) {
		match decode_event(raw) {
			Ok(event) => {
				let kind = event.kind();
				match reduce(cache, event) {
					Outcome::Applied => {
						metrics::counter!("askroom_client_events_applied_total").increment(1);
						view_tx.send_replace(RoomView {
							room: Some(room.clone()),
							phase: SyncPhase::Live,
							messages: project(cache),
						});
					}
					Outcome::NoOp => {
						metrics::counter!("askroom_client_events_ignored_total").increment(1);
						debug!(room = %room, kind, "mutation for unknown message ignored");
					}
				}
			}
			Err(e) => {
				metrics::counter!("askroom_client_decode_errors_total").increment(1);
				warn!(room = %room, error = %e, "dropping undecodable event payload");
			}
		}
	}

	/// Sleep out the backoff while staying responsive to room switches.
	async fn backoff_pause(&mut self, room: &RoomId, attempt: u32) -> Option<RoomExit> {
		let delay = backoff_delay(attempt, self.cfg.reconnect_min_delay, self.cfg.reconnect_max_delay);
		debug!(room = %room, attempt, ?delay, "scheduling reconnect");

		let sleep = tokio::time::sleep(delay);
		tokio::pin!(sleep);

		loop {
			let cmd = tokio::select! {
				_ = &mut sleep => return None,
				cmd = self.cmd_rx.recv() => cmd,
			};

			match Self::action(cmd) {
				CmdAction::Switch(next) if next.as_ref() == Some(room) => {}
				CmdAction::Switch(next) => return Some(RoomExit::Switch(next)),
				CmdAction::Shutdown => return Some(RoomExit::Shutdown),
			}
		}
	}

	/// Reconnection is off: hold the published state until the room changes.
	async fn park(&mut self, room: &RoomId) -> RoomExit {
		loop {
			match Self::action(self.cmd_rx.recv().await) {
				CmdAction::Switch(next) if next.as_ref() == Some(room) => {
					debug!(room = %room, "room already selected; staying parked");
				}
				CmdAction::Switch(next) => return RoomExit::Switch(next),
				CmdAction::Shutdown => return RoomExit::Shutdown,
			}
		}
	}
}

/// Exponential backoff with jitter, clamped to `[min, max]`.
fn backoff_delay(attempt: u32, min: Duration, max: Duration) -> Duration {
	use rand::Rng;

	let base_ms = (min.as_millis() as u64).max(1);
	let max_ms = (max.as_millis() as u64).max(base_ms);

	let pow = 2u64.saturating_pow(attempt.saturating_sub(1).min(6));
	let delay_ms = base_ms.saturating_mul(pow).min(max_ms);

	let jitter_window = (delay_ms / 10).max(1);
	let mut rng = rand::rng();
	let jitter_offset = rng.random_range(0..=(jitter_window * 2));

	Duration::from_millis(delay_ms.saturating_sub(jitter_window).saturating_add(jitter_offset))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backoff_grows_and_stays_clamped() {
		let min = Duration::from_millis(500);
		let max = Duration::from_secs(30);

		for attempt in 1..12 {
			let d = backoff_delay(attempt, min, max);
			assert!(d >= min.mul_f64(0.8), "attempt {attempt}: {d:?} below jittered floor");
			assert!(d <= max.mul_f64(1.2), "attempt {attempt}: {d:?} above jittered ceiling");
		}

		let early = backoff_delay(1, min, max);
		assert!(early <= Duration::from_millis(700), "first attempt should stay near min: {early:?}");
	}
}
