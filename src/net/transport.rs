//! TCP transport: accept loop, connection handlers and room tick tasks
//!
//! A thin stand-in for the production transport collaborator: length-
//! prefixed bincode frames over TCP. Each room runs on its own tokio task
//! at the fixed tick rate; connection handlers only touch their room's
//! mutex and push inputs through the lock-free channel, so no client can
//! stall a tick.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::game::constants::ticking::TICK_DURATION_MS;
use crate::game::state::{RoomMode, RoomPhase, SessionId};
use crate::lobby::manager::{RoomManager, SharedRoom};
use crate::net::framing::{read_message, write_message, FramingError};
use crate::net::protocol::{decode, encode, ClientMessage, ServerMessage};
use crate::net::session::{SessionRegistry, SessionToken};

/// Shared server context handed to every connection task.
pub struct TransportContext {
    pub manager: Mutex<RoomManager>,
    pub registry: Mutex<SessionRegistry>,
}

/// TCP front door for the room core.
pub struct TcpTransportServer {
    config: ServerConfig,
    context: Arc<TransportContext>,
    listener: TcpListener,
}

impl TcpTransportServer {
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind((config.bind_address, config.port)).await?;
        let context = Arc::new(TransportContext {
            manager: Mutex::new(RoomManager::new(config.max_rooms)),
            registry: Mutex::new(SessionRegistry::new()),
        });
        Ok(Self { config, context, listener })
    }

    pub fn local_port(&self) -> anyhow::Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    pub fn context(&self) -> Arc<TransportContext> {
        self.context.clone()
    }

    /// Accept connections until the task is cancelled.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            "listening on {}:{}",
            self.config.bind_address, self.config.port
        );
        loop {
            let (stream, addr) = self.listener.accept().await?;
            debug!(%addr, "connection accepted");
            let context = self.context.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, context).await {
                    debug!(%addr, error = %e, "connection ended");
                }
            });
        }
    }
}

/// Drive one room's fixed-rate tick loop. Ends when the room empties out
/// after its run started.
pub fn spawn_room_task(room: SharedRoom) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_millis(TICK_DURATION_MS));
        // A late tick is a late tick; never burst to catch up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let mut guard = room.lock();
            guard.tick_and_broadcast();
            let done = guard.is_empty() && guard.game().state().phase != RoomPhase::Lobby;
            drop(guard);
            if done {
                break;
            }
        }
        debug!("room task stopped");
    });
}

/// Look up a resume token and rejoin its room, or seat the session in a
/// quickplay room.
async fn handle_connection(
    stream: TcpStream,
    context: Arc<TransportContext>,
) -> anyhow::Result<()> {
    let (mut reader, writer) = tokio::io::split(stream);

    // First frame must be a join request
    let first = read_message(&mut reader).await?;
    let join: ClientMessage = decode(&first)?;
    let ClientMessage::JoinRequest { display_name, preferred_seat, resume_token } = join else {
        anyhow::bail!("first message was not a join request");
    };

    let (outbox, outbox_rx) = unbounded_channel::<ServerMessage>();
    spawn_writer(writer, outbox_rx);

    // Resume path: a valid token within its room's grace window reclaims
    // the reserved seat.
    let resumed = resume_token
        .as_deref()
        .and_then(SessionToken::try_from_slice)
        .and_then(|token| try_resume(&context, &token, outbox.clone()));

    let (session_id, room, seat, token) = match resumed {
        Some(resumed) => resumed,
        None => {
            let session_id = Uuid::new_v4();
            let room = {
                let mut manager = context.manager.lock();
                let fresh_before = manager.room_count();
                let room = match manager.find_or_create(RoomMode::Crew) {
                    Ok(room) => room,
                    Err(e) => {
                        let _ = outbox.send(ServerMessage::JoinRejected { reason: e.to_string() });
                        return Ok(());
                    }
                };
                if manager.room_count() > fresh_before {
                    spawn_room_task(room.clone());
                }
                room
            };

            let seat = {
                let mut guard = room.lock();
                match guard.join(session_id, display_name.clone(), preferred_seat, Some(outbox.clone())) {
                    Ok(seat) => seat,
                    Err(e) => {
                        let _ = outbox.send(ServerMessage::JoinRejected { reason: e.to_string() });
                        return Ok(());
                    }
                }
            };

            let token = {
                let mut registry = context.registry.lock();
                let token = registry.register(session_id, display_name);
                if let Some(session) = registry.resolve(&token) {
                    session.room_id = Some(room.lock().id);
                }
                token
            };
            (session_id, room, seat, token)
        }
    };

    let _ = outbox.send(ServerMessage::JoinAccepted {
        session_id,
        seat,
        resume_token: token.to_vec(),
    });

    let input_sender = room.lock().input_sender();

    // Read loop: frames in, room reactions out
    loop {
        let frame = match read_message(&mut reader).await {
            Ok(frame) => frame,
            Err(FramingError::ConnectionClosed) => {
                // Transport dropped: reserve the seat for reconnection
                let _ = room.lock().disconnect(session_id);
                return Ok(());
            }
            Err(e) => {
                warn!(session = %session_id, error = %e, "read failed");
                let _ = room.lock().disconnect(session_id);
                return Ok(());
            }
        };

        let message: ClientMessage = match decode(&frame) {
            Ok(message) => message,
            // Malformed frames are dropped, not fatal
            Err(e) => {
                debug!(session = %session_id, error = %e, "undecodable frame dropped");
                continue;
            }
        };

        match message {
            ClientMessage::Input(input) => {
                // Full buffer: drop; a fresher input is right behind it
                let _ = input_sender.try_send(session_id, input);
            }
            ClientMessage::ApplyUpgrade { id } => {
                room.lock().apply_upgrade(session_id, &id);
            }
            ClientMessage::RerollUpgrades => {
                room.lock().reroll_upgrades();
            }
            ClientMessage::Ping { timestamp } => {
                let server_timestamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);
                let _ = outbox.send(ServerMessage::Pong {
                    client_timestamp: timestamp,
                    server_timestamp,
                });
            }
            ClientMessage::Leave => {
                room.lock().leave(session_id);
                return Ok(());
            }
            ClientMessage::JoinRequest { .. } => {
                debug!(session = %session_id, "duplicate join request ignored");
            }
        }
    }
}

type ResumeResult = (SessionId, SharedRoom, crate::game::state::Seat, SessionToken);

fn try_resume(
    context: &TransportContext,
    token: &SessionToken,
    outbox: UnboundedSender<ServerMessage>,
) -> Option<ResumeResult> {
    let mut registry = context.registry.lock();
    let session = registry.resolve(token)?;
    let session_id = session.session_id;
    let room_id = session.room_id?;
    session.touch();
    drop(registry);

    let room = context.manager.lock().get_room(room_id)?;
    let seat = room.lock().reconnect(session_id, Some(outbox)).ok()?;
    Some((session_id, room, seat, token.clone()))
}

fn spawn_writer<W>(mut writer: W, mut rx: tokio::sync::mpsc::UnboundedReceiver<ServerMessage>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let Ok(bytes) = encode(&message) else {
                continue;
            };
            if write_message(&mut writer, &bytes).await.is_err() {
                break;
            }
        }
    });
}

/// Read one server message from a stream (client-side helper, used by
/// integration tests).
pub async fn read_server_message<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> anyhow::Result<ServerMessage> {
    let frame = read_message(reader).await?;
    Ok(decode(&frame)?)
}
