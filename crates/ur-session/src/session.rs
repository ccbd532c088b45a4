//! The game session actor.
//!
//! One task owns the controller. Client messages and timer wake-ups arrive on
//! a single channel and are handled one at a time, so a click made while an
//! animation is playing waits its turn instead of interleaving with it.

use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use ur_core::{Controller, Deferred, Game, GameError, OptionStore, Outcome, ViewCommand};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::protocol::{ClientMessage, ServerMessage};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidConfig { name: String, value: String },

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("Session has shut down")]
    Closed,
}

/// Everything the session reacts to
#[derive(Debug, Clone)]
pub enum SessionInput {
    Client(ClientMessage),
    /// A scheduled automatic action whose delay has elapsed
    Deferred(Deferred),
    Shutdown,
}

/// Where the session sends its output
pub trait View: Send + 'static {
    fn render(&mut self, message: ServerMessage);
}

/// Writes each message as one JSON line on stdout
#[derive(Debug, Default)]
pub struct StdoutView;

impl View for StdoutView {
    fn render(&mut self, message: ServerMessage) {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode {:?}: {}", message, e);
                return;
            }
        };
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", text).and_then(|_| out.flush()) {
            error!("Failed to write to stdout: {}", e);
        }
    }
}

/// Sender side of a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    tx: mpsc::UnboundedSender<SessionInput>,
}

impl SessionHandle {
    pub fn send(&self, message: ClientMessage) -> Result<(), SessionError> {
        self.tx
            .send(SessionInput::Client(message))
            .map_err(|_| SessionError::Closed)
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(SessionInput::Shutdown);
    }
}

pub struct GameSession<S: OptionStore, V: View> {
    id: Uuid,
    controller: Controller<S>,
    view: V,
    /// Pause after each `AnimateMove`
    animation: Duration,
    tx: mpsc::UnboundedSender<SessionInput>,
    rx: mpsc::UnboundedReceiver<SessionInput>,
}

impl<S: OptionStore, V: View> GameSession<S, V> {
    /// Build a session for a fresh game described by `config`.
    pub fn new(
        config: &SessionConfig,
        store: S,
        view: V,
    ) -> Result<(Self, SessionHandle), SessionError> {
        let names = config.player_names.clone();
        let game = match config.seed {
            Some(seed) => Game::with_seed(names, seed)?,
            None => Game::new(names)?,
        };
        info!(seed = game.seed(), "Created game");

        let controller = Controller::new(game, config.engine_config(), store);
        Ok(Self::with_controller(controller, view, config.animation))
    }

    pub fn with_controller(
        controller: Controller<S>,
        view: V,
        animation: Duration,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let handle = SessionHandle { id, tx: tx.clone() };
        let session = Self {
            id,
            controller,
            view,
            animation,
            tx,
            rx,
        };
        (session, handle)
    }

    /// Process inputs until `Shutdown`. Returns the view.
    pub async fn run(mut self) -> V {
        info!(session = %self.id, "Session started");
        self.view.render(ServerMessage::Welcome {
            session_id: self.id,
        });
        self.view.render(ServerMessage::Options {
            options: self.controller.options(),
        });

        let initialized = self.controller.initialize();
        self.present(initialized).await;

        while let Some(input) = self.rx.recv().await {
            match input {
                SessionInput::Client(message) => self.handle_message(message).await,
                SessionInput::Deferred(deferred) => {
                    match self.controller.fire_deferred(deferred) {
                        Ok(Some(outcome)) => self.present_outcome(outcome).await,
                        Ok(None) => info!(action = %deferred.action, "Dropped stale automatic action"),
                        Err(e) => self.report(e),
                    }
                }
                SessionInput::Shutdown => break,
            }
        }

        info!(session = %self.id, "Session ended");
        self.view
    }

    async fn handle_message(&mut self, message: ClientMessage) {
        debug!(?message, "Client message");
        let result = match message {
            ClientMessage::Roll => self.controller.roll(),
            ClientMessage::PassTurn => self.controller.pass_turn(),
            ClientMessage::StartGame => self.controller.start_game(),
            ClientMessage::NewGame => self.controller.new_game(),
            ClientMessage::PieceMoved { piece, space } => {
                self.controller.piece_moved(&piece, &space)
            }
            ClientMessage::CheckboxChanged { name, checked } => {
                match self.controller.checkbox_changed(&name, checked) {
                    Ok(options) => self.view.render(ServerMessage::Options { options }),
                    Err(e) => self.report(e),
                }
                return;
            }
            ClientMessage::Snapshot => {
                self.view.render(ServerMessage::Snapshot {
                    snapshot: Box::new(self.controller.snapshot()),
                });
                return;
            }
            ClientMessage::Ping => {
                self.view.render(ServerMessage::Pong);
                return;
            }
        };
        self.present(result).await;
    }

    async fn present(&mut self, result: Result<Outcome, GameError>) {
        match result {
            Ok(outcome) => self.present_outcome(outcome).await,
            Err(e) => self.report(e),
        }
    }

    /// Render an outcome, waiting out each animation, then arm its timer.
    async fn present_outcome(&mut self, outcome: Outcome) {
        for command in outcome.commands {
            let animated = matches!(command, ViewCommand::AnimateMove { .. });
            self.view.render(ServerMessage::View { command });
            if animated && !self.animation.is_zero() {
                tokio::time::sleep(self.animation).await;
            }
        }
        self.view.render(ServerMessage::State {
            state: outcome.state,
        });

        if let Some(deferred) = outcome.deferred {
            self.schedule(deferred);
        }
    }

    fn schedule(&self, deferred: Deferred) {
        debug!(action = %deferred.action, delay_ms = deferred.delay_ms, "Scheduling automatic action");
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deferred.delay()).await;
            let _ = tx.send(SessionInput::Deferred(deferred));
        });
    }

    fn report(&mut self, e: GameError) {
        warn!(state = %self.controller.state(), "Request refused: {}", e);
        self.view.render(ServerMessage::Error {
            message: e.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;
    use ur_core::{EngineConfig, GameOptions, GameState, MemoryStore, Player};

    struct ChannelView(mpsc::UnboundedSender<ServerMessage>);

    impl View for ChannelView {
        fn render(&mut self, message: ServerMessage) {
            let _ = self.0.send(message);
        }
    }

    struct Harness {
        handle: SessionHandle,
        output: mpsc::UnboundedReceiver<ServerMessage>,
        task: JoinHandle<ChannelView>,
    }

    fn start(options: GameOptions, rolls: &[u8], auto_pass_ms: u64) -> Harness {
        let mut game = Game::with_default_names(17).unwrap();
        game.dice.script(rolls.iter().copied());
        let config = EngineConfig {
            auto_pass_delay: Duration::from_millis(auto_pass_ms),
        };
        let store = MemoryStore::with_options(options).unwrap();
        let controller = Controller::new(game, config, store);

        let (view_tx, output) = mpsc::unbounded_channel();
        let (session, handle) =
            GameSession::with_controller(controller, ChannelView(view_tx), Duration::ZERO);
        let task = tokio::spawn(session.run());
        Harness {
            handle,
            output,
            task,
        }
    }

    impl Harness {
        /// Collect output up to and including the first message matching `done`
        async fn until(&mut self, done: impl Fn(&ServerMessage) -> bool) -> Vec<ServerMessage> {
            let mut seen = Vec::new();
            let output = &mut self.output;
            timeout(Duration::from_secs(5), async {
                while let Some(message) = output.recv().await {
                    let hit = done(&message);
                    seen.push(message);
                    if hit {
                        return;
                    }
                }
            })
            .await
            .expect("session went quiet");
            seen
        }

        async fn until_state(&mut self, state: GameState) -> Vec<ServerMessage> {
            self.until(|m| *m == ServerMessage::State { state }).await
        }

        async fn snapshot(&mut self) -> ur_core::GameSnapshot {
            self.handle.send(ClientMessage::Snapshot).unwrap();
            let seen = self
                .until(|m| matches!(m, ServerMessage::Snapshot { .. }))
                .await;
            match seen.into_iter().last() {
                Some(ServerMessage::Snapshot { snapshot }) => *snapshot,
                other => panic!("expected a snapshot, got {:?}", other),
            }
        }

        async fn stop(self) {
            self.handle.shutdown();
            self.task.await.unwrap();
        }
    }

    fn errors(messages: &[ServerMessage]) -> usize {
        messages
            .iter()
            .filter(|m| matches!(m, ServerMessage::Error { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_session_greets_and_initializes() {
        let mut harness = start(GameOptions::default(), &[], 1000);
        let seen = harness.until_state(GameState::PreGame).await;

        assert!(matches!(seen[0], ServerMessage::Welcome { session_id } if session_id == harness.handle.id));
        assert_eq!(
            seen[1],
            ServerMessage::Options {
                options: GameOptions::default()
            }
        );
        harness.stop().await;
    }

    #[tokio::test]
    async fn test_turn_flow() {
        let mut harness = start(GameOptions::default(), &[2], 1000);
        harness.until_state(GameState::PreGame).await;

        harness.handle.send(ClientMessage::StartGame).unwrap();
        harness.until_state(GameState::PreRoll).await;

        harness.handle.send(ClientMessage::Roll).unwrap();
        let seen = harness.until_state(GameState::ReadyToMove).await;
        assert!(seen.iter().any(|m| matches!(
            m,
            ServerMessage::View {
                command: ViewCommand::ShowDice { total: 2, .. }
            }
        )));

        harness
            .handle
            .send(ClientMessage::PieceMoved {
                piece: "piece-p1-0".to_string(),
                space: "space-p1-2".to_string(),
            })
            .unwrap();
        harness.until_state(GameState::EndTurn).await;

        harness.handle.send(ClientMessage::PassTurn).unwrap();
        harness.until_state(GameState::PreRoll).await;
        let snapshot = harness.snapshot().await;
        assert_eq!(snapshot.turn.unwrap().player, Player::Two);
        harness.stop().await;
    }

    #[tokio::test]
    async fn test_refused_request_reports_error() {
        let mut harness = start(GameOptions::default(), &[], 1000);
        harness.until_state(GameState::PreGame).await;

        harness.handle.send(ClientMessage::Roll).unwrap();
        let seen = harness
            .until(|m| matches!(m, ServerMessage::Error { .. }))
            .await;
        assert_eq!(
            seen.last(),
            Some(&ServerMessage::Error {
                message: "Invalid transition: no edge from PreGame on ThrowDice".to_string()
            })
        );

        harness.handle.send(ClientMessage::Ping).unwrap();
        harness.until(|m| *m == ServerMessage::Pong).await;
        harness.stop().await;
    }

    #[tokio::test]
    async fn test_autopass_fires_after_delay() {
        let options = GameOptions {
            autopass: true,
            autoroll: false,
        };
        let mut harness = start(options, &[0], 10);
        harness.until_state(GameState::PreGame).await;

        harness.handle.send(ClientMessage::StartGame).unwrap();
        harness.until_state(GameState::PreRoll).await;
        harness.handle.send(ClientMessage::Roll).unwrap();
        harness.until_state(GameState::EndTurn).await;

        // Nobody presses pass; the timer does
        let seen = harness.until_state(GameState::PreRoll).await;
        assert_eq!(errors(&seen), 0);
        let snapshot = harness.snapshot().await;
        assert_eq!(snapshot.turn.unwrap().player, Player::Two);
        harness.stop().await;
    }

    #[tokio::test]
    async fn test_manual_pass_makes_timer_stale() {
        let options = GameOptions {
            autopass: true,
            autoroll: false,
        };
        let mut harness = start(options, &[0], 50);
        harness.until_state(GameState::PreGame).await;

        harness.handle.send(ClientMessage::StartGame).unwrap();
        harness.handle.send(ClientMessage::Roll).unwrap();
        harness.handle.send(ClientMessage::PassTurn).unwrap();
        let mut seen = harness.until_state(GameState::EndTurn).await;
        seen.extend(harness.until_state(GameState::PreRoll).await);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let snapshot = harness.snapshot().await;
        let turn = snapshot.turn.unwrap();
        assert_eq!(turn.player, Player::Two);
        assert_eq!(turn.number, 2);
        assert_eq!(snapshot.state, GameState::PreRoll);

        harness.handle.shutdown();
        harness.task.await.unwrap();
        while let Ok(message) = harness.output.try_recv() {
            seen.push(message);
        }
        assert_eq!(errors(&seen), 0);
    }

    #[tokio::test]
    async fn test_checkbox_updates_options() {
        let mut harness = start(GameOptions::default(), &[], 1000);
        harness.until_state(GameState::PreGame).await;

        harness
            .handle
            .send(ClientMessage::CheckboxChanged {
                name: "autoroll".to_string(),
                checked: true,
            })
            .unwrap();
        let seen = harness
            .until(|m| matches!(m, ServerMessage::Options { .. }))
            .await;
        assert_eq!(
            seen.last(),
            Some(&ServerMessage::Options {
                options: GameOptions {
                    autopass: false,
                    autoroll: true
                }
            })
        );

        harness
            .handle
            .send(ClientMessage::CheckboxChanged {
                name: "music".to_string(),
                checked: true,
            })
            .unwrap();
        harness
            .until(|m| matches!(m, ServerMessage::Error { .. }))
            .await;
        harness.stop().await;
    }

    #[tokio::test]
    async fn test_send_after_shutdown_fails() {
        let mut harness = start(GameOptions::default(), &[], 1000);
        harness.until_state(GameState::PreGame).await;
        let handle = harness.handle.clone();
        harness.stop().await;

        assert!(matches!(handle.send(ClientMessage::Ping), Err(SessionError::Closed)));
    }
}
