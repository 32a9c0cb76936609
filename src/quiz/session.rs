//! Game session actor
//!
//! One tokio task owns the [`GameState`] and drains a command queue, so
//! every mutation — player input, countdown ticks, prefetch results — is
//! applied one at a time against the latest state. Snapshots are published
//! through a watch channel after each command; the front-end only ever
//! renders from those.
//!
//! The countdown timer, the prefetch sweep, and the on-demand next-round
//! fetch run as child tasks holding a sender into the same queue. The actor
//! owns their handles and aborts them deterministically on phase exit and on
//! reset.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::gen::{retry, GenError, ImageSource, LocationSource};

use super::prefetch;
use super::state::{self, AdvanceOutcome};
use super::types::{Answer, GamePhase, GameState, Round, DEFAULT_ROUND_COUNT, OPTIONS_PER_ROUND};

/// Tunables for one game session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Rounds per game
    pub round_count: usize,
    /// Countdown tick period
    pub tick_interval: Duration,
    /// Retry budget for one image-generation call
    pub retry_budget: u32,
    /// First backoff delay after a rate-limited image call
    pub retry_initial_delay: Duration,
    /// Throttle between prefetch requests
    pub prefetch_delay: Duration,
    /// Cooldown after a failed prefetch before moving to the next round
    pub prefetch_cooldown: Duration,
    /// Pause between attempts of the on-demand next-round fetch
    pub advance_retry_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            round_count: DEFAULT_ROUND_COUNT,
            tick_interval: Duration::from_secs(1),
            retry_budget: retry::DEFAULT_RETRIES,
            retry_initial_delay: retry::DEFAULT_INITIAL_DELAY,
            prefetch_delay: Duration::from_secs(2),
            prefetch_cooldown: Duration::from_secs(8),
            advance_retry_delay: Duration::from_secs(3),
        }
    }
}

/// Commands processed by the session actor, one at a time
#[derive(Debug)]
pub(crate) enum Command {
    Start,
    SelectOption(usize),
    Advance,
    Reset,
    Shutdown,
    /// Countdown tick. The epoch ties a tick to the timer task that sent
    /// it; ticks from a stopped timer are dropped, never applied to a
    /// later round's countdown.
    Tick {
        epoch: u64,
    },
    /// Loader progress line for the loading screen
    LoadProgress {
        message: String,
    },
    /// Initial load finished: locations plus the eager round-0 image
    LoadReady {
        rounds: Vec<Round>,
    },
    LoadFailed {
        message: String,
    },
    /// A prefetched image landed for `round`
    ImageReady {
        round: usize,
        path: PathBuf,
    },
    /// The on-demand fetch for the round blocking an advance finished
    FetchReady {
        round: usize,
        path: PathBuf,
    },
}

/// Handle to a running game session.
///
/// Cloneable; commands are fire-and-forget sends into the actor's queue and
/// the state is observed through [`SessionHandle::watch`].
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<GameState>,
}

impl SessionHandle {
    /// Spawn a session actor onto the current runtime.
    pub fn spawn(
        locations: Arc<dyn LocationSource>,
        images: Arc<dyn ImageSource>,
        config: SessionConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(GameState::new());

        let actor = Actor {
            state: GameState::new(),
            state_tx,
            tx: tx.clone(),
            locations,
            images,
            config,
            seen_names: Vec::new(),
            timer: None,
            timer_epoch: 0,
            loader: None,
            prefetch: None,
            fetcher: None,
            pending_fetch: None,
        };
        tokio::spawn(actor.run(rx));

        Self { tx, state_rx }
    }

    /// Start a new game from the start screen (or retry a failed load)
    pub fn start(&self) {
        let _ = self.tx.send(Command::Start);
    }

    /// Answer the current round with option `index`
    pub fn select_option(&self, index: usize) {
        let _ = self.tx.send(Command::SelectOption(index));
    }

    /// Move on from the result screen
    pub fn advance(&self) {
        let _ = self.tx.send(Command::Advance);
    }

    /// Full session reset back to the start screen
    pub fn reset(&self) {
        let _ = self.tx.send(Command::Reset);
    }

    /// Stop the actor and all of its child tasks
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    /// Subscribe to state snapshots
    pub fn watch(&self) -> watch::Receiver<GameState> {
        self.state_rx.clone()
    }
}

struct Actor {
    state: GameState,
    state_tx: watch::Sender<GameState>,
    /// Sender handed to child tasks so their results flow through the queue
    tx: mpsc::UnboundedSender<Command>,
    locations: Arc<dyn LocationSource>,
    images: Arc<dyn ImageSource>,
    config: SessionConfig,
    /// Names already played this session, excluded from later games
    seen_names: Vec<String>,
    timer: Option<AbortHandle>,
    timer_epoch: u64,
    loader: Option<AbortHandle>,
    /// Prefetch sweep handle: `None` means idle, an unfinished handle means
    /// running, a finished handle means the sweep completed. Starting while
    /// running is a no-op, so one sweep runs per game at most.
    prefetch: Option<JoinHandle<()>>,
    fetcher: Option<AbortHandle>,
    /// Round index an on-demand fetch is blocking on, if any
    pending_fetch: Option<usize>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            if matches!(cmd, Command::Shutdown) {
                break;
            }
            self.handle(cmd);
            self.state_tx.send_replace(self.state.clone());
        }
        self.abort_children();
        debug!("session actor stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Start => self.on_start(),
            Command::SelectOption(index) => self.on_select(index),
            Command::Advance => self.on_advance(),
            Command::Reset => self.on_reset(),
            Command::Shutdown => unreachable!("handled in run"),
            Command::Tick { epoch } => self.on_tick(epoch),
            Command::LoadProgress { message } => self.on_load_progress(message),
            Command::LoadReady { rounds } => self.on_load_ready(rounds),
            Command::LoadFailed { message } => self.on_load_failed(message),
            Command::ImageReady { round, path } => state::set_round_image(&mut self.state, round, path),
            Command::FetchReady { round, path } => self.on_fetch_ready(round, path),
        }
    }

    fn on_start(&mut self) {
        let restartable = self.state.phase == GamePhase::Start || self.state.load_failed;
        if !restartable {
            return;
        }
        info!(rounds = self.config.round_count, "starting new game");
        state::begin_loading(&mut self.state, "Scouting interesting corners of the planet...");

        let tx = self.tx.clone();
        let locations = Arc::clone(&self.locations);
        let images = Arc::clone(&self.images);
        let count = self.config.round_count;
        let exclude = self.seen_names.clone();
        let budget = self.config.retry_budget;
        let delay = self.config.retry_initial_delay;

        let handle = tokio::spawn(async move {
            let result = load_first_round(locations, images, count, exclude, budget, delay, &tx).await;
            let msg = match result {
                Ok(rounds) => Command::LoadReady { rounds },
                Err(err) => {
                    error!(error = %err, "initial load failed");
                    Command::LoadFailed {
                        message: "Loading failed. Press Enter to try again.".to_string(),
                    }
                }
            };
            let _ = tx.send(msg);
        });
        self.loader = Some(handle.abort_handle());
    }

    fn on_select(&mut self, index: usize) {
        if index >= OPTIONS_PER_ROUND {
            return;
        }
        if state::apply_answer(&mut self.state, Answer::Choice(index)) {
            self.stop_timer();
        }
    }

    fn on_tick(&mut self, epoch: u64) {
        if epoch != self.timer_epoch {
            // A tick from a timer that was already stopped
            return;
        }
        if state::apply_tick(&mut self.state) {
            // Countdown hit zero: a timeout rides the same transition as a
            // real selection, so there is exactly one path into Result.
            if state::apply_answer(&mut self.state, Answer::TimedOut) {
                self.stop_timer();
            }
        }
    }

    fn on_advance(&mut self) {
        match state::apply_advance(&mut self.state) {
            AdvanceOutcome::EnteredQuiz => self.start_timer(),
            AdvanceOutcome::Finished => {
                info!(score = self.state.score, "game over");
            }
            AdvanceOutcome::NeedsFetch(next) => self.spawn_fetcher(next),
            AdvanceOutcome::Ignored => {}
        }
    }

    fn on_load_progress(&mut self, message: String) {
        if self.state.phase == GamePhase::LoadingRound && !self.state.load_failed {
            self.state.status_message = message;
        }
    }

    fn on_load_ready(&mut self, rounds: Vec<Round>) {
        if self.state.phase != GamePhase::LoadingRound || self.state.load_failed {
            // Stale result from before a reset
            return;
        }
        self.seen_names
            .extend(rounds.iter().map(|r| r.location.name.clone()));
        state::begin_game(&mut self.state, rounds);
        self.loader = None;
        self.start_timer();
        // The sweep subscribes to the watch channel when it starts; the new
        // rounds must be visible there before it runs.
        self.state_tx.send_replace(self.state.clone());
        self.start_prefetch();
    }

    fn on_load_failed(&mut self, message: String) {
        if self.state.phase != GamePhase::LoadingRound {
            return;
        }
        self.loader = None;
        state::fail_loading(&mut self.state, message);
    }

    fn on_fetch_ready(&mut self, round: usize, path: PathBuf) {
        state::set_round_image(&mut self.state, round, path);
        if self.pending_fetch == Some(round) && self.state.phase == GamePhase::LoadingRound {
            self.pending_fetch = None;
            self.fetcher = None;
            state::enter_quiz_at(&mut self.state, round);
            self.start_timer();
        }
    }

    fn on_reset(&mut self) {
        self.abort_children();
        self.pending_fetch = None;
        state::reset(&mut self.state);
    }

    fn start_timer(&mut self) {
        self.stop_timer();
        self.timer_epoch += 1;
        let epoch = self.timer_epoch;
        let tx = self.tx.clone();
        let period = self.config.tick_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(Command::Tick { epoch }).is_err() {
                    break;
                }
            }
        });
        self.timer = Some(handle.abort_handle());
    }

    fn stop_timer(&mut self) {
        // Bumping the epoch invalidates ticks already sitting in the queue
        self.timer_epoch += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn start_prefetch(&mut self) {
        if let Some(handle) = &self.prefetch {
            if !handle.is_finished() {
                return;
            }
        }
        let task = prefetch::sweep(
            Arc::clone(&self.images),
            self.state_tx.subscribe(),
            self.tx.clone(),
            self.config.clone(),
        );
        self.prefetch = Some(tokio::spawn(task));
    }

    fn spawn_fetcher(&mut self, round: usize) {
        let Some(location) = self.state.rounds.get(round).map(|r| r.location.clone()) else {
            return;
        };
        self.pending_fetch = Some(round);

        let tx = self.tx.clone();
        let images = Arc::clone(&self.images);
        let budget = self.config.retry_budget;
        let initial_delay = self.config.retry_initial_delay;
        let pause = self.config.advance_retry_delay;

        let handle = tokio::spawn(async move {
            // No retry cap on this path: advance keeps trying until the
            // image arrives, so a persistent outage holds the loading
            // screen until the player resets.
            loop {
                let attempt =
                    retry::with_backoff(|| images.generate_image(&location), budget, initial_delay)
                        .await;
                match attempt {
                    Ok(path) => {
                        let _ = tx.send(Command::FetchReady { round, path });
                        break;
                    }
                    Err(err) => {
                        warn!(round, error = %err, "on-demand fetch failed, retrying");
                        tokio::time::sleep(pause).await;
                    }
                }
            }
        });
        self.fetcher = Some(handle.abort_handle());
    }

    fn abort_children(&mut self) {
        self.stop_timer();
        for handle in [self.loader.take(), self.fetcher.take()].into_iter().flatten() {
            handle.abort();
        }
        if let Some(prefetch) = self.prefetch.take() {
            prefetch.abort();
        }
    }
}

/// Generate the location list and the round-0 image, reporting progress
/// through the command queue.
async fn load_first_round(
    locations: Arc<dyn LocationSource>,
    images: Arc<dyn ImageSource>,
    count: usize,
    exclude: Vec<String>,
    budget: u32,
    delay: Duration,
    tx: &mpsc::UnboundedSender<Command>,
) -> Result<Vec<Round>, GenError> {
    let locs = locations.generate_locations(count, &exclude).await?;
    let mut rounds: Vec<Round> = locs.into_iter().map(Round::new).collect();

    let _ = tx.send(Command::LoadProgress {
        message: "Developing the first photo...".to_string(),
    });

    let first = rounds
        .first()
        .map(|round| round.location.clone())
        .ok_or_else(|| GenError::Malformed("empty location list".to_string()))?;
    let path = retry::with_backoff(|| images.generate_image(&first), budget, delay).await?;
    if let Some(round) = rounds.first_mut() {
        round.image_path = Some(path);
    }
    Ok(rounds)
}
