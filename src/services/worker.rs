//! Per-worker event loop owning the sessions of the guilds routed to it.
//!
//! Events are processed strictly one at a time, so session state is never locked.
//! Anything slow (answer set fetch, round-start delay, timers) runs in a spawned task
//! that posts its result back into the loop as another event.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot},
    time::{Instant, sleep},
};
use tracing::{debug, info, warn};

use crate::{
    dao::{
        catalog::{SelectionError, SongSelector},
        preferences::{GuildPreferences, PreferenceStore},
    },
    dto::{
        gateway::{GuessOutcome, IgnoredReason, VoteOutcome},
        session::SessionSnapshot,
        sse::{
            HintRevealedEvent, RoundEndedEvent, RoundStartedEvent, SessionEndedEvent,
            SessionStartedEvent, VoteProgressEvent,
        },
    },
    error::{ServiceError, SessionError},
    services::{
        consensus::{self, VoteTally},
        guess::GuessMatch,
        outbox::{Notification, Outbox},
    },
    state::{
        game::{AnswerSet, GameMode, GuildId, PlayerId, RoundId, RoundOutcome, SessionEndReason, VoteAction},
        presence::PresenceProvider,
        registry::{SessionRegistry, WorkerStats},
        scoreboard::TeamJoin,
        session::GameSession,
        state_machine::PlanId,
        timer::{RoundTimer, TimerKind},
    },
};

/// Identifier of a worker within the fleet.
pub type WorkerId = u32;

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Collaborators shared by every worker.
#[derive(Clone)]
pub struct WorkerDeps {
    /// Who sits in which voice channel.
    pub presence: Arc<dyn PresenceProvider>,
    /// Per-guild settings, read at every round start.
    pub preferences: Arc<dyn PreferenceStore>,
    /// Answer-set source.
    pub songs: Arc<dyn SongSelector>,
    /// Sink for notifications.
    pub outbox: Arc<dyn Outbox>,
}

/// Result of the round preparation task.
#[derive(Debug)]
pub struct PreparedRound {
    preferences: GuildPreferences,
    answers: AnswerSet,
}

/// Inputs of the worker loop.
#[derive(Debug)]
pub enum WorkerEvent {
    /// Create a session and schedule its first round.
    StartSession {
        guild_id: GuildId,
        owner_id: PlayerId,
        mode: GameMode,
        starting_lives: Option<u32>,
        reply: Reply<SessionSnapshot>,
    },
    /// Tear a session down on request.
    EndSession {
        guild_id: GuildId,
        reply: Reply<SessionEndedEvent>,
    },
    /// Free-text answer from a player.
    Guess {
        guild_id: GuildId,
        player_id: PlayerId,
        content: String,
        reply: Reply<GuessOutcome>,
    },
    /// Skip or hint vote.
    Vote {
        guild_id: GuildId,
        player_id: PlayerId,
        action: VoteAction,
        reply: Reply<VoteOutcome>,
    },
    /// Owner skip, no vote needed.
    ForceSkip {
        guild_id: GuildId,
        player_id: PlayerId,
        reply: Reply<VoteOutcome>,
    },
    /// Team membership change.
    JoinTeam {
        guild_id: GuildId,
        player_id: PlayerId,
        team: String,
        reply: Reply<Option<TeamJoin>>,
    },
    /// A player entered the voice channel of a guild.
    PlayerJoined { guild_id: GuildId, player_id: PlayerId },
    /// A player left the voice channel of a guild.
    PlayerLeft { guild_id: GuildId, player_id: PlayerId },
    /// Read-only view of one session.
    Snapshot {
        guild_id: GuildId,
        reply: oneshot::Sender<Option<SessionSnapshot>>,
    },
    /// Fleet stats request.
    Stats { reply: oneshot::Sender<WorkerStats> },
    /// Continuation of a round start.
    AnswerSetReady {
        guild_id: GuildId,
        request_id: PlanId,
        result: Result<PreparedRound, SelectionError>,
    },
    /// A round timer elapsed. Re-validated against the active round before acting.
    TimerFired {
        guild_id: GuildId,
        round_id: RoundId,
        kind: TimerKind,
    },
}

/// Event loop state: the registry plus the collaborators.
pub struct Worker {
    id: WorkerId,
    registry: SessionRegistry,
    deps: WorkerDeps,
    tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl Worker {
    /// Worker and the receiving end of its event queue.
    pub fn new(id: WorkerId, deps: WorkerDeps) -> (Self, mpsc::UnboundedReceiver<WorkerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self {
            id,
            registry: SessionRegistry::new(),
            deps,
            tx,
        };
        (worker, rx)
    }

    /// Spawn a worker loop and return its handle.
    pub fn spawn(id: WorkerId, deps: WorkerDeps) -> WorkerHandle {
        let (worker, rx) = Worker::new(id, deps);
        let handle = worker.handle();
        tokio::spawn(worker.run(rx));
        handle
    }

    /// Handle posting into this worker's queue.
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            id: self.id,
            tx: self.tx.clone(),
        }
    }

    /// Process events until the queue closes.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<WorkerEvent>) {
        info!(worker_id = self.id, "worker started");
        while let Some(event) = rx.recv().await {
            self.dispatch(event);
        }
        info!(worker_id = self.id, "worker stopped");
    }

    fn dispatch(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::StartSession {
                guild_id,
                owner_id,
                mode,
                starting_lives,
                reply,
            } => {
                let _ = reply.send(self.start_session(&guild_id, &owner_id, mode, starting_lives));
            }
            WorkerEvent::EndSession { guild_id, reply } => {
                let _ = reply.send(self.end_session(&guild_id, SessionEndReason::Requested));
            }
            WorkerEvent::Guess {
                guild_id,
                player_id,
                content,
                reply,
            } => {
                let _ = reply.send(self.guess(&guild_id, &player_id, &content));
            }
            WorkerEvent::Vote {
                guild_id,
                player_id,
                action,
                reply,
            } => {
                let _ = reply.send(self.vote(&guild_id, &player_id, action));
            }
            WorkerEvent::ForceSkip {
                guild_id,
                player_id,
                reply,
            } => {
                let _ = reply.send(self.force_skip(&guild_id, &player_id));
            }
            WorkerEvent::JoinTeam {
                guild_id,
                player_id,
                team,
                reply,
            } => {
                let _ = reply.send(self.join_team(&guild_id, &player_id, &team));
            }
            WorkerEvent::PlayerJoined {
                guild_id,
                player_id,
            } => self.player_joined(&guild_id, &player_id),
            WorkerEvent::PlayerLeft {
                guild_id,
                player_id,
            } => self.player_left(&guild_id, &player_id),
            WorkerEvent::Snapshot { guild_id, reply } => {
                let _ = reply.send(self.snapshot(&guild_id));
            }
            WorkerEvent::Stats { reply } => {
                let _ = reply.send(self.local_stats());
            }
            WorkerEvent::AnswerSetReady {
                guild_id,
                request_id,
                result,
            } => self.on_answer_set(guild_id, request_id, result),
            WorkerEvent::TimerFired {
                guild_id,
                round_id,
                kind,
            } => self.on_timer(&guild_id, round_id, kind),
        }
    }

    fn session_mut(&mut self, guild_id: &str) -> Result<&mut GameSession, SessionError> {
        self.registry
            .get_mut(guild_id)
            .ok_or_else(|| SessionError::NoActiveSession(guild_id.to_string()))
    }

    /// Create a session, enroll the co-located players and start the first round.
    pub fn start_session(
        &mut self,
        guild_id: &str,
        owner_id: &str,
        mode: GameMode,
        starting_lives: Option<u32>,
    ) -> Result<SessionSnapshot, SessionError> {
        let players = self.deps.presence.co_located_players(guild_id);
        let mut session =
            GameSession::new(guild_id.to_string(), mode, owner_id.to_string(), starting_lives);
        for player in &players {
            session.scoreboard_mut().add_player(player, false);
        }

        let session = self.registry.create(session)?;
        let snapshot = SessionSnapshot::from(&*session);
        info!(
            worker_id = self.id,
            guild_id,
            ?mode,
            owner_id,
            players = players.len(),
            "session started"
        );
        self.deps
            .outbox
            .publish(Notification::SessionStarted(SessionStartedEvent {
                guild_id: guild_id.to_string(),
                mode,
                owner_id: owner_id.to_string(),
                players,
            }));

        self.request_round(guild_id)?;
        Ok(snapshot)
    }

    /// Reserve the next round and spawn the task fetching its answer set.
    fn request_round(&mut self, guild_id: &str) -> Result<(), SessionError> {
        let session = self.session_mut(guild_id)?;
        let request_id = session.request_round()?;
        let initialized = session.is_initialized();

        let tx = self.tx.clone();
        let preferences = self.deps.preferences.clone();
        let songs = self.deps.songs.clone();
        let guild_id = guild_id.to_string();
        debug!(guild_id, %request_id, "preparing next round");
        tokio::spawn(async move {
            let result = prepare_round(&guild_id, initialized, preferences, songs).await;
            let _ = tx.send(WorkerEvent::AnswerSetReady {
                guild_id,
                request_id,
                result,
            });
        });
        Ok(())
    }

    fn on_answer_set(
        &mut self,
        guild_id: GuildId,
        request_id: PlanId,
        result: Result<PreparedRound, SelectionError>,
    ) {
        let Some(session) = self.registry.get_mut(&guild_id) else {
            debug!(guild_id, %request_id, "answer set for a finished session dropped");
            return;
        };
        if session.pending_round() != Some(request_id) {
            debug!(guild_id, %request_id, "stale answer set dropped");
            return;
        }

        let prepared = match result {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!(guild_id, error = %err, "failed to prepare round; ending session");
                let _ = session.abandon_round_request(request_id);
                self.end_quietly(&guild_id, SessionEndReason::Failure(err.to_string()));
                return;
            }
        };

        let players = self.deps.presence.co_located_players(&guild_id);
        if players.is_empty() {
            info!(guild_id, "voice channel empty; ending session");
            let _ = session.abandon_round_request(request_id);
            self.end_quietly(&guild_id, SessionEndReason::EmptyChannel);
            return;
        }

        let late = session.is_initialized();
        for player in &players {
            session.scoreboard_mut().add_player(player, late);
        }

        let round_number = session.rounds_played() + 1;
        let timeout = prepared.preferences.round_timeout(session.mode());
        let now = Instant::now();
        let round = match session.begin_round(request_id, &prepared.answers, prepared.preferences, now)
        {
            Ok(round) => round,
            Err(err) => {
                warn!(guild_id, ?err, "could not open round");
                return;
            }
        };
        let round_id = round.id();
        if let Some(timeout) = timeout {
            let timer = RoundTimer::schedule(
                TimerKind::GuessTimeout,
                timeout,
                self.tx.clone(),
                WorkerEvent::TimerFired {
                    guild_id: guild_id.clone(),
                    round_id,
                    kind: TimerKind::GuessTimeout,
                },
            );
            round.arm_timer(timer, Some(now + timeout));
        }

        info!(guild_id, %round_id, round_number, "round started");
        self.deps
            .outbox
            .publish(Notification::RoundStarted(RoundStartedEvent {
                guild_id,
                round_id,
                round_number,
                timeout_ms: timeout.map(|timeout| timeout.as_millis() as u64),
            }));
    }

    /// Resolve a guess against the active round.
    pub fn guess(
        &mut self,
        guild_id: &str,
        player_id: &str,
        content: &str,
    ) -> Result<GuessOutcome, SessionError> {
        let presence = self.deps.presence.clone();
        let tx = self.tx.clone();
        let session = self.session_mut(guild_id)?;
        session.touch();

        if !presence.is_co_located(guild_id, player_id) {
            return Ok(ignored_guess(IgnoredReason::NotCoLocated));
        }
        if !session.scoreboard().can_participate(player_id) {
            return Ok(ignored_guess(IgnoredReason::NotEligible));
        }
        let mode = session.mode();
        let preferences = session.preferences().clone();
        let Some((round, scoreboard)) = session.active_round_and_scoreboard() else {
            return Ok(ignored_guess(IgnoredReason::NoActiveRound));
        };

        let now = Instant::now();
        let matched = round.check(content, preferences.typos_allowed);

        if mode == GameMode::Hidden {
            if !round.record_hidden_guess(player_id) {
                return Ok(ignored_guess(IgnoredReason::AlreadyGuessed));
            }
            if matched.is_correct() {
                round.record_correct(player_id, now);
            }
            self.close_hidden_round(guild_id)?;
            return Ok(GuessOutcome::Recorded);
        }

        if matched == GuessMatch::Miss {
            return Ok(GuessOutcome::Incorrect);
        }
        let Some(rank) = round.record_correct(player_id, now) else {
            return Ok(ignored_guess(IgnoredReason::AlreadyGuessed));
        };
        let round_id = round.id();
        debug!(guild_id, %round_id, player_id, rank, "correct guess");

        let eligible = presence
            .co_located_players(guild_id)
            .iter()
            .filter(|player| scoreboard.can_participate(player.as_str()))
            .count();
        let grace = preferences.multiguess && mode.supports_multiguess() && eligible > 1;
        if rank == 0 && grace {
            let timer = RoundTimer::schedule(
                TimerKind::GraceWindow,
                preferences.multiguess_delay,
                tx,
                WorkerEvent::TimerFired {
                    guild_id: guild_id.to_string(),
                    round_id,
                    kind: TimerKind::GraceWindow,
                },
            );
            round.arm_timer(timer, None);
        } else if rank == 0 || rank + 1 >= eligible {
            let outcome = RoundOutcome::Guessed(round.ranked_guesses());
            self.finish_round(guild_id, outcome)?;
        }

        Ok(GuessOutcome::Correct {
            rank: rank + 1,
            typo: matched == GuessMatch::Typo,
        })
    }

    /// Count a skip or hint vote and apply the action once quorum is reached.
    pub fn vote(
        &mut self,
        guild_id: &str,
        player_id: &str,
        action: VoteAction,
    ) -> Result<VoteOutcome, SessionError> {
        let presence = self.deps.presence.clone();
        let session = self.session_mut(guild_id)?;
        session.touch();

        if !presence.is_co_located(guild_id, player_id) {
            return Ok(ignored_vote(IgnoredReason::NotCoLocated));
        }
        let mode = session.mode();
        if mode == GameMode::Competition && session.owner() != player_id {
            return Ok(ignored_vote(IgnoredReason::NotPermitted));
        }
        if !session.scoreboard().can_participate(player_id) {
            return Ok(ignored_vote(IgnoredReason::NotEligible));
        }
        let Some((round, scoreboard)) = session.active_round_and_scoreboard() else {
            return Ok(ignored_vote(IgnoredReason::NoActiveRound));
        };
        if round.action_achieved(action) {
            return Ok(ignored_vote(IgnoredReason::AlreadyAchieved));
        }
        if !round.record_vote(action, player_id) {
            return Ok(ignored_vote(IgnoredReason::DuplicateVote));
        }

        let tally = if mode == GameMode::Competition {
            VoteTally {
                current: 1,
                quorum: 1,
            }
        } else {
            consensus::tally(
                round,
                action,
                mode,
                scoreboard,
                presence.active_participant_count(guild_id),
            )
        };
        let round_id = round.id();
        debug!(guild_id, %round_id, player_id, ?action, current = tally.current, quorum = tally.quorum, "vote counted");

        if !tally.reached() {
            self.deps
                .outbox
                .publish(Notification::VoteProgress(VoteProgressEvent::new(
                    guild_id, round_id, action, tally,
                )));
            return Ok(VoteOutcome::from_tally(tally));
        }

        match action {
            VoteAction::Skip => {
                self.finish_round(guild_id, RoundOutcome::Skipped { forced: false })?;
            }
            VoteAction::Hint => {
                if let Some(hint) = round.reveal_hint().map(str::to_string) {
                    info!(guild_id, %round_id, "hint revealed");
                    self.deps
                        .outbox
                        .publish(Notification::HintRevealed(HintRevealedEvent {
                            guild_id: guild_id.to_string(),
                            round_id,
                            hint,
                        }));
                }
            }
        }
        Ok(VoteOutcome::from_tally(tally))
    }

    /// End the active round as skipped on behalf of the session owner.
    pub fn force_skip(&mut self, guild_id: &str, player_id: &str) -> Result<VoteOutcome, SessionError> {
        let session = self.session_mut(guild_id)?;
        session.touch();
        if session.owner() != player_id {
            return Ok(ignored_vote(IgnoredReason::NotPermitted));
        }
        if session.active_round().is_none() {
            return Ok(ignored_vote(IgnoredReason::NoActiveRound));
        }
        self.finish_round(guild_id, RoundOutcome::Skipped { forced: true })?;
        Ok(VoteOutcome::Achieved {
            current: 1,
            quorum: 1,
        })
    }

    /// Put a player in a team. `None` outside team play.
    pub fn join_team(
        &mut self,
        guild_id: &str,
        player_id: &str,
        team: &str,
    ) -> Result<Option<TeamJoin>, SessionError> {
        let session = self.session_mut(guild_id)?;
        session.touch();
        let joined = session.scoreboard_mut().join_team(player_id, team);
        debug!(guild_id, player_id, team, ?joined, "team join");
        Ok(joined)
    }

    /// Enroll a player who entered the voice channel of a running session.
    pub fn player_joined(&mut self, guild_id: &str, player_id: &str) {
        if let Some(session) = self.registry.get_mut(guild_id) {
            let late = session.is_initialized();
            session.scoreboard_mut().add_player(player_id, late);
        }
    }

    /// Re-check a hidden round once a player is gone: they may have been the last one
    /// still expected to answer.
    pub fn player_left(&mut self, guild_id: &str, player_id: &str) {
        if let Err(err) = self.close_hidden_round(guild_id) {
            debug!(guild_id, player_id, error = %err, "could not close hidden round");
        }
    }

    /// End a hidden round once every co-located eligible player has answered.
    fn close_hidden_round(&mut self, guild_id: &str) -> Result<(), SessionError> {
        let presence = self.deps.presence.clone();
        let Some(session) = self.registry.get_mut(guild_id) else {
            return Ok(());
        };
        if session.mode() != GameMode::Hidden {
            return Ok(());
        }
        let Some((round, scoreboard)) = session.active_round_and_scoreboard() else {
            return Ok(());
        };
        let everyone_answered = presence
            .co_located_players(guild_id)
            .iter()
            .filter(|player| scoreboard.can_participate(player.as_str()))
            .all(|player| round.hidden_guessers().contains(player));
        if !everyone_answered {
            return Ok(());
        }
        let outcome = if round.correct_guessers().is_empty() {
            RoundOutcome::Unanswered
        } else {
            RoundOutcome::Guessed(round.ranked_guesses())
        };
        self.finish_round(guild_id, outcome)
    }

    /// End a session, publishing its final summary.
    pub fn end_session(
        &mut self,
        guild_id: &str,
        reason: SessionEndReason,
    ) -> Result<SessionEndedEvent, SessionError> {
        let mut session = self
            .registry
            .remove(guild_id)
            .ok_or_else(|| SessionError::NoActiveSession(guild_id.to_string()))?;
        let event = SessionEndedEvent::from(session.end(reason)?);
        info!(
            worker_id = self.id,
            guild_id,
            reason = ?event.reason,
            rounds_played = event.rounds_played,
            "session ended"
        );
        self.deps
            .outbox
            .publish(Notification::SessionEnded(event.clone()));
        Ok(event)
    }

    fn end_quietly(&mut self, guild_id: &str, reason: SessionEndReason) {
        if let Err(err) = self.end_session(guild_id, reason) {
            debug!(guild_id, error = %err, "session already gone");
        }
    }

    /// Score the active round, then end the session or start the next round.
    fn finish_round(&mut self, guild_id: &str, outcome: RoundOutcome) -> Result<(), SessionError> {
        let session = self.session_mut(guild_id)?;
        let summary = session.end_round(outcome)?;
        let event = RoundEndedEvent::new(guild_id, summary, session.scoreboard().embed_fields());
        info!(
            guild_id,
            round_id = %event.round_id,
            outcome = ?event.outcome,
            "round ended"
        );

        let finished = session.game_finished();
        let reason = if session.mode() == GameMode::Elimination {
            SessionEndReason::LastPlayerStanding
        } else {
            SessionEndReason::GoalReached
        };
        self.deps.outbox.publish(Notification::RoundEnded(event));

        if finished {
            self.end_session(guild_id, reason).map(drop)
        } else {
            self.request_round(guild_id)
        }
    }

    fn on_timer(&mut self, guild_id: &str, round_id: RoundId, kind: TimerKind) {
        let Some(round) = self
            .registry
            .get(guild_id)
            .and_then(GameSession::active_round)
            .filter(|round| round.id() == round_id)
        else {
            debug!(guild_id, %round_id, ?kind, "stale timer ignored");
            return;
        };

        let outcome = match kind {
            TimerKind::GuessTimeout if round.correct_guessers().is_empty() => RoundOutcome::TimedOut,
            TimerKind::GuessTimeout | TimerKind::GraceWindow => {
                RoundOutcome::Guessed(round.ranked_guesses())
            }
        };
        if let Err(err) = self.finish_round(guild_id, outcome) {
            debug!(guild_id, %round_id, error = %err, "timer could not end the round");
        }
    }

    /// Read-only view of a guild's session.
    pub fn snapshot(&self, guild_id: &str) -> Option<SessionSnapshot> {
        self.registry.get(guild_id).map(SessionSnapshot::from)
    }

    /// Load of this worker.
    pub fn local_stats(&self) -> WorkerStats {
        self.registry.local_stats(self.deps.presence.as_ref())
    }
}

async fn prepare_round(
    guild_id: &str,
    initialized: bool,
    store: Arc<dyn PreferenceStore>,
    songs: Arc<dyn SongSelector>,
) -> Result<PreparedRound, SelectionError> {
    let preferences = store.preferences(guild_id).await?;
    if initialized && !preferences.round_start_delay.is_zero() {
        sleep(preferences.round_start_delay).await;
    }
    let answers = songs.next_answer_set(guild_id, &preferences).await?;
    Ok(PreparedRound {
        preferences,
        answers,
    })
}

fn ignored_guess(reason: IgnoredReason) -> GuessOutcome {
    GuessOutcome::Ignored { reason }
}

fn ignored_vote(reason: IgnoredReason) -> VoteOutcome {
    VoteOutcome::Ignored { reason }
}

/// Cloneable sender side of a worker.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    id: WorkerId,
    tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl WorkerHandle {
    /// Identifier of the worker behind this handle.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Whether the worker loop is still consuming events.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> WorkerEvent,
    ) -> Result<T, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| ServiceError::WorkerDown(self.id))?;
        rx.await.map_err(|_| ServiceError::WorkerDown(self.id))
    }

    /// Start a session in `guild_id`; fails if one is already running there.
    pub async fn start_session(
        &self,
        guild_id: GuildId,
        owner_id: PlayerId,
        mode: GameMode,
        starting_lives: Option<u32>,
    ) -> Result<SessionSnapshot, ServiceError> {
        Ok(self
            .request(|reply| WorkerEvent::StartSession {
                guild_id,
                owner_id,
                mode,
                starting_lives,
                reply,
            })
            .await??)
    }

    pub async fn end_session(&self, guild_id: GuildId) -> Result<SessionEndedEvent, ServiceError> {
        Ok(self
            .request(|reply| WorkerEvent::EndSession { guild_id, reply })
            .await??)
    }

    pub async fn guess(
        &self,
        guild_id: GuildId,
        player_id: PlayerId,
        content: String,
    ) -> Result<GuessOutcome, ServiceError> {
        Ok(self
            .request(|reply| WorkerEvent::Guess {
                guild_id,
                player_id,
                content,
                reply,
            })
            .await??)
    }

    pub async fn vote(
        &self,
        guild_id: GuildId,
        player_id: PlayerId,
        action: VoteAction,
    ) -> Result<VoteOutcome, ServiceError> {
        Ok(self
            .request(|reply| WorkerEvent::Vote {
                guild_id,
                player_id,
                action,
                reply,
            })
            .await??)
    }

    pub async fn force_skip(
        &self,
        guild_id: GuildId,
        player_id: PlayerId,
    ) -> Result<VoteOutcome, ServiceError> {
        Ok(self
            .request(|reply| WorkerEvent::ForceSkip {
                guild_id,
                player_id,
                reply,
            })
            .await??)
    }

    pub async fn join_team(
        &self,
        guild_id: GuildId,
        player_id: PlayerId,
        team: String,
    ) -> Result<Option<TeamJoin>, ServiceError> {
        Ok(self
            .request(|reply| WorkerEvent::JoinTeam {
                guild_id,
                player_id,
                team,
                reply,
            })
            .await??)
    }

    /// Fire-and-forget presence notification.
    pub fn notify_player_joined(&self, guild_id: GuildId, player_id: PlayerId) {
        if self
            .tx
            .send(WorkerEvent::PlayerJoined {
                guild_id,
                player_id,
            })
            .is_err()
        {
            warn!(worker_id = self.id, "worker down; presence update dropped");
        }
    }

    /// Current view of the session in `guild_id`, if any.
    pub async fn snapshot(&self, guild_id: GuildId) -> Result<Option<SessionSnapshot>, ServiceError> {
        self.request(|reply| WorkerEvent::Snapshot { guild_id, reply })
            .await
    }

    /// Fire-and-forget departure notification.
    pub fn notify_player_left(&self, guild_id: GuildId, player_id: PlayerId) {
        if self
            .tx
            .send(WorkerEvent::PlayerLeft {
                guild_id,
                player_id,
            })
            .is_err()
        {
            warn!(worker_id = self.id, "worker down; presence update dropped");
        }
    }

    /// Session and player counts owned by this worker.
    pub async fn stats(&self) -> Result<WorkerStats, ServiceError> {
        self.request(|reply| WorkerEvent::Stats { reply }).await
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use futures::future::{self, BoxFuture};

    use super::*;
    use crate::{
        dao::{
            catalog::{CatalogSong, InMemoryCatalog},
            preferences::{HIDDEN_GUESS_TIMEOUT, InMemoryPreferenceStore},
        },
        dto::sse::RoundOutcomeKind,
        state::{presence::PresenceTracker, scoreboard::Standing, state_machine::SessionPhase},
    };

    #[derive(Default)]
    struct RecordingOutbox {
        notifications: Mutex<Vec<Notification>>,
    }

    impl RecordingOutbox {
        fn names(&self) -> Vec<&'static str> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .map(Notification::name)
                .collect()
        }

        fn round_ended(&self) -> Vec<RoundEndedEvent> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .filter_map(|notification| match notification {
                    Notification::RoundEnded(event) => Some(event.clone()),
                    _ => None,
                })
                .collect()
        }

        fn session_ended(&self) -> Option<SessionEndedEvent> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .find_map(|notification| match notification {
                    Notification::SessionEnded(event) => Some(event.clone()),
                    _ => None,
                })
        }
    }

    impl Outbox for RecordingOutbox {
        fn publish(&self, notification: Notification) {
            self.notifications.lock().unwrap().push(notification);
        }
    }

    struct FailingSelector;

    impl SongSelector for FailingSelector {
        fn next_answer_set(
            &self,
            _guild_id: &str,
            _preferences: &GuildPreferences,
        ) -> BoxFuture<'static, Result<AnswerSet, SelectionError>> {
            Box::pin(future::ready(Err(SelectionError::EmptyCatalog)))
        }
    }

    struct Harness {
        worker: Worker,
        rx: mpsc::UnboundedReceiver<WorkerEvent>,
        outbox: Arc<RecordingOutbox>,
        presence: Arc<PresenceTracker>,
    }

    impl Harness {
        fn new(players: &[&str], preferences: GuildPreferences) -> Self {
            Self::with_songs(
                players,
                preferences,
                Arc::new(InMemoryCatalog::new(vec![CatalogSong {
                    name: "Apple".into(),
                    aliases: vec!["Pomme".into()],
                }])),
            )
        }

        fn with_songs(
            players: &[&str],
            preferences: GuildPreferences,
            songs: Arc<dyn SongSelector>,
        ) -> Self {
            let presence = Arc::new(PresenceTracker::new());
            for player in players {
                presence.join("g1", player, false);
            }
            let outbox = Arc::new(RecordingOutbox::default());
            let deps = WorkerDeps {
                presence: presence.clone(),
                preferences: Arc::new(InMemoryPreferenceStore::new(preferences)),
                songs,
                outbox: outbox.clone(),
            };
            let (worker, rx) = Worker::new(7, deps);
            Self {
                worker,
                rx,
                outbox,
                presence,
            }
        }

        /// Process the next event posted back into the loop.
        async fn pump(&mut self) {
            let event = self.rx.recv().await.unwrap();
            self.worker.dispatch(event);
        }

        async fn start(&mut self, mode: GameMode, lives: Option<u32>) {
            self.worker.start_session("g1", "p1", mode, lives).unwrap();
            self.pump().await;
        }

        fn round_id(&self) -> RoundId {
            self.worker.snapshot("g1").unwrap().round.unwrap().round_id
        }
    }

    fn quick() -> GuildPreferences {
        GuildPreferences {
            round_start_delay: Duration::ZERO,
            ..GuildPreferences::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn classic_skip_needs_a_majority_of_four() {
        let mut harness = Harness::new(&["p1", "p2", "p3", "p4"], quick());
        harness.start(GameMode::Classic, None).await;
        let first_round = harness.round_id();

        let worker = &mut harness.worker;
        assert_eq!(
            worker.vote("g1", "p1", VoteAction::Skip).unwrap(),
            VoteOutcome::Pending {
                current: 1,
                quorum: 3
            }
        );
        assert_eq!(
            worker.vote("g1", "p2", VoteAction::Skip).unwrap(),
            VoteOutcome::Pending {
                current: 2,
                quorum: 3
            }
        );
        assert_eq!(
            worker.vote("g1", "p2", VoteAction::Skip).unwrap(),
            VoteOutcome::Ignored {
                reason: IgnoredReason::DuplicateVote
            }
        );
        assert_eq!(
            worker.vote("g1", "p3", VoteAction::Skip).unwrap(),
            VoteOutcome::Achieved {
                current: 3,
                quorum: 3
            }
        );

        harness.pump().await;
        let snapshot = harness.worker.snapshot("g1").unwrap();
        assert_eq!(snapshot.phase, SessionPhase::RoundActive);
        assert_ne!(snapshot.round.unwrap().round_id, first_round);
        assert_eq!(
            harness.outbox.names(),
            vec![
                "session.started",
                "round.started",
                "vote.progress",
                "vote.progress",
                "round.ended",
                "round.started"
            ]
        );
        assert_eq!(
            harness.outbox.round_ended()[0].outcome,
            RoundOutcomeKind::Skipped
        );
    }

    #[tokio::test(start_paused = true)]
    async fn a_round_is_scored_once_even_if_its_timer_fires_late() {
        let preferences = GuildPreferences {
            guess_timeout: Some(Duration::from_secs(30)),
            ..quick()
        };
        let mut harness = Harness::new(&["p1", "p2"], preferences);
        harness.start(GameMode::Classic, None).await;
        let round_id = harness.round_id();

        assert_eq!(
            harness.worker.guess("g1", "p2", "apple").unwrap(),
            GuessOutcome::Correct {
                rank: 1,
                typo: false
            }
        );
        harness.worker.dispatch(WorkerEvent::TimerFired {
            guild_id: "g1".into(),
            round_id,
            kind: TimerKind::GuessTimeout,
        });

        let ended = harness.outbox.round_ended();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].outcome, RoundOutcomeKind::Guessed);
        assert_eq!(ended[0].guessers[0].player_id, "p2");
    }

    #[tokio::test(start_paused = true)]
    async fn guess_timeout_ends_the_round_unanswered() {
        let preferences = GuildPreferences {
            guess_timeout: Some(Duration::from_secs(30)),
            ..quick()
        };
        let mut harness = Harness::new(&["p1", "p2"], preferences);
        harness.start(GameMode::Classic, None).await;

        harness.pump().await;
        let ended = harness.outbox.round_ended();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].outcome, RoundOutcomeKind::TimedOut);
        assert_eq!(ended[0].answer, "Apple");
    }

    #[tokio::test(start_paused = true)]
    async fn typos_and_aliases_are_accepted() {
        let mut harness = Harness::new(&["p1", "p2", "p3"], quick());
        harness.start(GameMode::Classic, None).await;

        assert_eq!(
            harness.worker.guess("g1", "p2", "pear").unwrap(),
            GuessOutcome::Incorrect
        );
        assert_eq!(
            harness.worker.guess("g1", "p2", "aple").unwrap(),
            GuessOutcome::Correct {
                rank: 1,
                typo: true
            }
        );
        harness.pump().await;
        assert_eq!(
            harness.worker.guess("g1", "p3", "POMME!").unwrap(),
            GuessOutcome::Correct {
                rank: 1,
                typo: false
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn absent_players_are_ignored() {
        let mut harness = Harness::new(&["p1"], quick());
        harness.start(GameMode::Classic, None).await;

        assert_eq!(
            harness.worker.guess("g1", "ghost", "apple").unwrap(),
            GuessOutcome::Ignored {
                reason: IgnoredReason::NotCoLocated
            }
        );
        assert_eq!(
            harness.worker.guess("g2", "p1", "apple").unwrap_err(),
            SessionError::NoActiveSession("g2".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn multiguess_ranks_guessers_during_the_grace_window() {
        let preferences = GuildPreferences {
            multiguess: true,
            ..quick()
        };
        let mut harness = Harness::new(&["p1", "p2", "p3"], preferences);
        harness.start(GameMode::Classic, None).await;

        harness.worker.guess("g1", "p2", "apple").unwrap();
        assert_eq!(
            harness.worker.guess("g1", "p3", "apple").unwrap(),
            GuessOutcome::Correct {
                rank: 2,
                typo: false
            }
        );
        assert_eq!(
            harness.worker.snapshot("g1").unwrap().phase,
            SessionPhase::RoundActive
        );

        harness.pump().await;
        let ended = harness.outbox.round_ended();
        assert_eq!(ended.len(), 1);
        let points: Vec<f64> = ended[0].guessers.iter().map(|guesser| guesser.points).collect();
        assert_eq!(points, vec![1.0, 0.5]);
    }

    #[tokio::test(start_paused = true)]
    async fn hint_quorum_reveals_the_hint_and_halves_points() {
        let mut harness = Harness::new(&["p1", "p2"], quick());
        harness.start(GameMode::Classic, None).await;

        assert!(matches!(
            harness.worker.vote("g1", "p1", VoteAction::Hint).unwrap(),
            VoteOutcome::Pending { .. }
        ));
        assert!(matches!(
            harness.worker.vote("g1", "p2", VoteAction::Hint).unwrap(),
            VoteOutcome::Achieved { .. }
        ));
        assert_eq!(
            harness.worker.vote("g1", "p2", VoteAction::Hint).unwrap(),
            VoteOutcome::Ignored {
                reason: IgnoredReason::AlreadyAchieved
            }
        );
        let hint = harness
            .worker
            .snapshot("g1")
            .unwrap()
            .round
            .unwrap()
            .hint
            .unwrap();
        assert_eq!(hint.chars().filter(|c| *c == '_').count(), 3);

        harness.worker.guess("g1", "p1", "apple").unwrap();
        assert_eq!(harness.outbox.round_ended()[0].guessers[0].points, 0.5);
        assert!(harness.outbox.names().contains(&"round.hint"));
    }

    #[tokio::test(start_paused = true)]
    async fn competition_votes_belong_to_the_owner() {
        let mut harness = Harness::new(&["p1", "p2", "p3"], quick());
        harness.start(GameMode::Competition, None).await;

        assert_eq!(
            harness.worker.vote("g1", "p2", VoteAction::Skip).unwrap(),
            VoteOutcome::Ignored {
                reason: IgnoredReason::NotPermitted
            }
        );
        assert_eq!(
            harness.worker.vote("g1", "p1", VoteAction::Skip).unwrap(),
            VoteOutcome::Achieved {
                current: 1,
                quorum: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_owner_can_force_skip() {
        let mut harness = Harness::new(&["p1", "p2"], quick());
        harness.start(GameMode::Teams, None).await;

        assert_eq!(
            harness.worker.force_skip("g1", "p2").unwrap(),
            VoteOutcome::Ignored {
                reason: IgnoredReason::NotPermitted
            }
        );
        harness.worker.force_skip("g1", "p1").unwrap();
        assert_eq!(
            harness.outbox.round_ended()[0].outcome,
            RoundOutcomeKind::ForceSkipped
        );
        assert_eq!(
            harness.worker.force_skip("g1", "p1").unwrap(),
            VoteOutcome::Ignored {
                reason: IgnoredReason::NoActiveRound
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn teamless_players_cannot_guess_in_team_play() {
        let mut harness = Harness::new(&["p1", "p2"], quick());
        harness.start(GameMode::Teams, None).await;

        assert_eq!(
            harness.worker.guess("g1", "p2", "apple").unwrap(),
            GuessOutcome::Ignored {
                reason: IgnoredReason::NotEligible
            }
        );
        assert_eq!(
            harness.worker.join_team("g1", "p2", "blue").unwrap(),
            Some(TeamJoin::Created)
        );
        assert!(matches!(
            harness.worker.guess("g1", "p2", "apple").unwrap(),
            GuessOutcome::Correct { .. }
        ));
        let fields = &harness.outbox.round_ended()[0].scoreboard;
        assert_eq!(fields[0].name, "blue");
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_round_ends_once_everyone_answered() {
        let mut harness = Harness::new(&["p1", "p2"], quick());
        harness.start(GameMode::Hidden, None).await;

        assert_eq!(
            harness.worker.guess("g1", "p1", "apple").unwrap(),
            GuessOutcome::Recorded
        );
        assert_eq!(
            harness.worker.guess("g1", "p1", "pear").unwrap(),
            GuessOutcome::Ignored {
                reason: IgnoredReason::AlreadyGuessed
            }
        );
        assert!(harness.outbox.round_ended().is_empty());

        assert_eq!(
            harness.worker.guess("g1", "p2", "pear").unwrap(),
            GuessOutcome::Recorded
        );
        let ended = harness.outbox.round_ended();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].guessers.len(), 1);
        assert_eq!(ended[0].guessers[0].player_id, "p1");
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_round_without_correct_answers_is_unanswered() {
        let mut harness = Harness::new(&["p1", "p2"], quick());
        harness.start(GameMode::Hidden, None).await;

        harness.worker.guess("g1", "p1", "pear").unwrap();
        harness.worker.guess("g1", "p2", "banana").unwrap();

        let ended = harness.outbox.round_ended();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].outcome, RoundOutcomeKind::Unanswered);
        assert!(ended[0].guessers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_timeout_scores_correct_guessers() {
        let mut harness = Harness::new(&["p1", "p2", "p3"], quick());
        harness.start(GameMode::Hidden, None).await;
        let round = harness.worker.snapshot("g1").unwrap().round.unwrap();
        assert_eq!(
            round.remaining_ms,
            Some(HIDDEN_GUESS_TIMEOUT.as_millis() as u64)
        );

        harness.worker.guess("g1", "p2", "apple").unwrap();
        harness.worker.guess("g1", "p3", "pear").unwrap();
        assert!(harness.outbox.round_ended().is_empty());

        let waited = Instant::now();
        harness.pump().await;
        assert!(waited.elapsed() >= HIDDEN_GUESS_TIMEOUT - Duration::from_millis(1));

        let ended = harness.outbox.round_ended();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].outcome, RoundOutcomeKind::Guessed);
        assert_eq!(ended[0].guessers.len(), 1);
        assert_eq!(ended[0].guessers[0].player_id, "p2");
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_round_closes_when_the_last_silent_player_leaves() {
        let mut harness = Harness::new(&["p1", "p2", "p3"], quick());
        harness.start(GameMode::Hidden, None).await;

        harness.worker.guess("g1", "p1", "apple").unwrap();
        harness.worker.guess("g1", "p2", "pear").unwrap();
        assert!(harness.outbox.round_ended().is_empty());

        assert!(harness.presence.leave("g1", "p3"));
        harness.worker.dispatch(WorkerEvent::PlayerLeft {
            guild_id: "g1".into(),
            player_id: "p3".into(),
        });

        let ended = harness.outbox.round_ended();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].outcome, RoundOutcomeKind::Guessed);
        assert_eq!(ended[0].guessers[0].player_id, "p1");
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_mid_round_outside_hidden_mode_keeps_the_round() {
        let mut harness = Harness::new(&["p1", "p2", "p3"], quick());
        harness.start(GameMode::Classic, None).await;

        harness.presence.leave("g1", "p3");
        harness.worker.player_left("g1", "p3");

        assert!(harness.outbox.round_ended().is_empty());
        assert_eq!(
            harness.worker.snapshot("g1").unwrap().phase,
            SessionPhase::RoundActive
        );
    }

    #[tokio::test(start_paused = true)]
    async fn grace_window_closes_once_every_eligible_player_guessed() {
        let preferences = GuildPreferences {
            multiguess: true,
            ..quick()
        };
        let mut harness = Harness::new(&["p1", "p2", "p3"], preferences);
        harness.start(GameMode::Teams, None).await;
        harness.worker.join_team("g1", "p1", "red").unwrap();
        harness.worker.join_team("g1", "p2", "blue").unwrap();

        harness.worker.guess("g1", "p1", "apple").unwrap();
        assert!(harness.outbox.round_ended().is_empty());
        assert_eq!(
            harness.worker.guess("g1", "p2", "apple").unwrap(),
            GuessOutcome::Correct {
                rank: 2,
                typo: false
            }
        );

        let ended = harness.outbox.round_ended();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].guessers.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn elimination_quorum_counts_survivors() {
        let mut harness = Harness::new(&["p1", "p2", "p3", "p4", "p5"], quick());
        harness.start(GameMode::Elimination, None).await;

        harness.worker.vote("g1", "p1", VoteAction::Skip).unwrap();
        harness.worker.vote("g1", "p2", VoteAction::Skip).unwrap();
        assert_eq!(
            harness.worker.vote("g1", "p3", VoteAction::Skip).unwrap(),
            VoteOutcome::Achieved {
                current: 3,
                quorum: 3
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn eliminated_players_are_ignored_and_the_last_survivor_wins() {
        let preferences = GuildPreferences {
            multiguess: true,
            ..quick()
        };
        let mut harness = Harness::new(&["p1", "p2", "p3"], preferences);
        harness.start(GameMode::Elimination, Some(1)).await;

        harness.worker.guess("g1", "p1", "apple").unwrap();
        harness.worker.guess("g1", "p2", "apple").unwrap();
        harness.pump().await;
        assert_eq!(harness.outbox.round_ended()[0].eliminated, vec!["p3".to_string()]);

        harness.pump().await;
        assert_eq!(
            harness.worker.guess("g1", "p3", "apple").unwrap(),
            GuessOutcome::Ignored {
                reason: IgnoredReason::NotEligible
            }
        );

        harness.worker.guess("g1", "p1", "apple").unwrap();
        harness.pump().await;
        let ended = harness.outbox.session_ended().unwrap();
        assert_eq!(ended.reason, SessionEndReason::LastPlayerStanding);
        assert_eq!(ended.winners, vec!["p1".to_string()]);
        assert!(harness.worker.snapshot("g1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reaching_the_goal_ends_the_session() {
        let preferences = GuildPreferences {
            goal: Some(1),
            ..quick()
        };
        let mut harness = Harness::new(&["p1", "p2"], preferences);
        harness.start(GameMode::Classic, None).await;

        harness.worker.guess("g1", "p2", "apple").unwrap();
        let ended = harness.outbox.session_ended().unwrap();
        assert_eq!(ended.reason, SessionEndReason::GoalReached);
        assert_eq!(ended.winners, vec!["p2".to_string()]);
        assert_eq!(ended.scoreboard[0].standing, Standing::Points(1.0));
        assert_eq!(harness.worker.local_stats(), WorkerStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn answer_set_failure_ends_the_session() {
        let mut harness =
            Harness::with_songs(&["p1"], quick(), Arc::new(FailingSelector));
        harness.start(GameMode::Classic, None).await;

        let ended = harness.outbox.session_ended().unwrap();
        assert_eq!(
            ended.reason,
            SessionEndReason::Failure("song catalog is empty".into())
        );
        assert!(harness.worker.snapshot("g1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_voice_channel_ends_the_session() {
        let mut harness = Harness::new(&["p1"], quick());
        harness.presence.leave("g1", "p1");
        harness.start(GameMode::Classic, None).await;

        assert_eq!(
            harness.outbox.session_ended().unwrap().reason,
            SessionEndReason::EmptyChannel
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_answer_sets_are_dropped() {
        let mut harness = Harness::new(&["p1"], quick());
        harness.worker.start_session("g1", "p1", GameMode::Classic, None).unwrap();
        harness.worker.dispatch(WorkerEvent::AnswerSetReady {
            guild_id: "g1".into(),
            request_id: uuid::Uuid::new_v4(),
            result: Ok(PreparedRound {
                preferences: quick(),
                answers: AnswerSet::new("pear", Vec::new()),
            }),
        });
        assert_eq!(
            harness.worker.snapshot("g1").unwrap().phase,
            SessionPhase::Idle
        );

        harness.pump().await;
        assert_eq!(
            harness.worker.snapshot("g1").unwrap().phase,
            SessionPhase::RoundActive
        );
    }

    #[tokio::test(start_paused = true)]
    async fn round_start_delay_applies_after_the_first_round() {
        let preferences = GuildPreferences {
            round_start_delay: Duration::from_secs(3),
            ..GuildPreferences::default()
        };
        let mut harness = Harness::new(&["p1", "p2"], preferences);
        let started = Instant::now();
        harness.start(GameMode::Classic, None).await;
        assert!(started.elapsed() < Duration::from_secs(1));

        harness.worker.guess("g1", "p1", "apple").unwrap();
        let ended_at = Instant::now();
        harness.pump().await;
        assert!(ended_at.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn late_joiners_get_the_weakest_survivor_lives() {
        let mut harness = Harness::new(&["p1", "p2"], quick());
        harness.start(GameMode::Elimination, Some(3)).await;
        harness.worker.guess("g1", "p1", "apple").unwrap();
        harness.pump().await;

        harness.presence.join("g1", "p3", false);
        harness.worker.player_joined("g1", "p3");
        let scoreboard = harness.worker.snapshot("g1").unwrap().scoreboard;
        let p3 = scoreboard.iter().find(|field| field.name == "p3").unwrap();
        assert_eq!(p3.standing, Standing::Lives(2));
    }

    #[tokio::test(start_paused = true)]
    async fn handle_round_trips_through_the_loop() {
        let harness = Harness::new(&["p1", "p2"], quick());
        let handle = harness.worker.handle();
        tokio::spawn(harness.worker.run(harness.rx));

        handle
            .start_session("g1".into(), "p1".into(), GameMode::Classic, None)
            .await
            .unwrap();
        let err = handle
            .start_session("g1".into(), "p2".into(), GameMode::Classic, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Session(SessionError::AlreadyActive(_))
        ));
        assert_eq!(
            handle.stats().await.unwrap(),
            WorkerStats {
                active_sessions: 1,
                active_players: 2
            }
        );

        let ended = handle.end_session("g1".into()).await.unwrap();
        assert_eq!(ended.reason, SessionEndReason::Requested);
        assert!(handle.snapshot("g1".into()).await.unwrap().is_none());
        assert!(handle.is_running());
    }
}
