#![forbid(unsafe_code)]

use askroom_client_core::{ClientConfig, RoomSync, RoomView, SyncPhase};
use askroom_domain::RoomId;
use tracing::info;

fn usage_and_exit() -> ! {
	eprintln!(
		"Usage: askroom_client --room <room-id> [--api http://host:port] [--ws ws://host:port] [--no-reconnect]\n\
\n\
Options:\n\
	--room           Room id to subscribe to (required)\n\
	--api            REST base endpoint (default: http://localhost:8080)\n\
	--ws             Event stream base endpoint (default: ws://localhost:8080)\n\
	--no-reconnect   Stay disconnected after connection loss\n\
	--help           Show this help\n\
\n\
Examples:\n\
	askroom_client --room 4b6f0c5e\n\
	askroom_client --room 4b6f0c5e --api https://askroom.example.com:443 --ws wss://askroom.example.com:443\n"
	);
	std::process::exit(2)
}

fn init_tracing() {
	let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,askroom_client_core=debug".to_string());
	tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn parse_args() -> (ClientConfig, RoomId) {
	let mut cfg = ClientConfig {
		client_instance_id: format!("cli-{}", std::process::id()),
		..ClientConfig::default()
	};
	let mut room: Option<RoomId> = None;

	let mut it = std::env::args().skip(1);
	while let Some(arg) = it.next() {
		match arg.as_str() {
			"--help" | "-h" => usage_and_exit(),
			"--room" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				let parsed: RoomId = v.parse().unwrap_or_else(|e| {
					eprintln!("Invalid --room value: {v}\n{e}");
					usage_and_exit()
				});
				room = Some(parsed);
			}
			"--api" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				if v.trim().is_empty() {
					eprintln!("--api must be non-empty (expected http://host:port)");
					usage_and_exit();
				}
				cfg.api_base_url = v;
			}
			"--ws" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				if v.trim().is_empty() {
					eprintln!("--ws must be non-empty (expected ws://host:port)");
					usage_and_exit();
				}
				cfg.ws_base_url = v;
			}
			"--no-reconnect" => {
				cfg.reconnect = false;
			}
			other => {
				eprintln!("Unknown argument: {other}");
				usage_and_exit();
			}
		}
	}

	let Some(room) = room else {
		eprintln!("--room is required");
		usage_and_exit();
	};

	if let Err(e) = cfg.validate() {
		eprintln!("{e}");
		usage_and_exit();
	}

	(cfg, room)
}

fn render(view: &RoomView) {
	let room = view.room.as_ref().map(|r| r.as_str()).unwrap_or("-");

	match &view.phase {
		SyncPhase::Idle => println!("[{room}] idle"),
		SyncPhase::LoadingSnapshot => println!("[{room}] loading snapshot..."),
		SyncPhase::Live => {
			println!("[{room}] {} message(s):", view.messages.len());
			for m in &view.messages {
				let mark = if m.answered { "answered" } else { "open" };
				println!("	{:>4}  {:<8}  {}", m.reaction_count, mark, m.text);
			}
		}
		SyncPhase::SnapshotFailed { detail } => println!("[{room}] snapshot failed: {detail}"),
		SyncPhase::Reconnecting { attempt } => println!("[{room}] reconnecting (attempt {attempt})..."),
		SyncPhase::Disconnected => println!("[{room}] disconnected"),
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_tracing();
	let (cfg, room) = parse_args();

	let sync = RoomSync::spawn(cfg)?;
	let mut view_rx = sync.watch();
	sync.set_room(room).await?;

	loop {
		tokio::select! {
			changed = view_rx.changed() => {
				if changed.is_err() {
					break;
				}
				let view = view_rx.borrow_and_update().clone();
				render(&view);
			}
			_ = tokio::signal::ctrl_c() => {
				info!("interrupt received; shutting down");
				break;
			}
		}
	}

	sync.shutdown().await;
	Ok(())
}
