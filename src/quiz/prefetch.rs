//! Background image prefetch
//!
//! While the player answers round 0, a single sweep walks rounds 1..N in
//! order and fills in their photos, so most advances land directly on the
//! next quiz screen. The sweep reads the latest state snapshot before every
//! request and reports results back through the session's command queue; it
//! never touches the state itself.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::gen::{retry, ImageSource};

use super::session::{Command, SessionConfig};
use super::types::GameState;

/// Sweep rounds 1..N once, in order.
///
/// Round 0 already has its image from the eager initial load. Requests are
/// throttled with a fixed delay to stay under the service's rate limits; a
/// round that still fails after the backoff budget is logged and skipped
/// after a longer cooldown; the player will trigger an on-demand fetch when
/// reaching it.
pub(crate) async fn sweep(
    images: Arc<dyn ImageSource>,
    mut state: watch::Receiver<GameState>,
    tx: mpsc::UnboundedSender<Command>,
    config: SessionConfig,
) {
    // The sweep may get polled before the game-start snapshot is published;
    // the round count is only valid once the rounds are visible.
    let total = {
        let Ok(snapshot) = state.wait_for(|s| s.round_count() > 0).await else {
            return;
        };
        snapshot.round_count()
    };

    for index in 1..total {
        let location = {
            let snapshot = state.borrow();
            match snapshot.rounds.get(index) {
                Some(round) if !round.has_image() => round.location.clone(),
                _ => continue,
            }
        };

        sleep(config.prefetch_delay).await;

        let attempt = retry::with_backoff(
            || images.generate_image(&location),
            config.retry_budget,
            config.retry_initial_delay,
        )
        .await;

        match attempt {
            Ok(path) => {
                debug!(round = index, "prefetched image");
                if tx.send(Command::ImageReady { round: index, path }).is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!(round = index, error = %err, "prefetch failed, leaving round for on-demand fetch");
                sleep(config.prefetch_cooldown).await;
            }
        }
    }

    debug!(rounds = total, "prefetch sweep finished");
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use async_trait::async_trait;
    use tokio::time::{timeout, Duration};

    use crate::gen::GenError;
    use crate::quiz::types::fixtures::location;
    use crate::quiz::types::{GamePhase, Location, Round};

    use super::*;

    struct StubImages;

    #[async_trait]
    impl ImageSource for StubImages {
        async fn generate_image(&self, loc: &Location) -> Result<PathBuf, GenError> {
            Ok(PathBuf::from(format!("img/{}.png", loc.name)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_polled_before_the_game_snapshot_still_covers_every_round() {
        let (state_tx, state_rx) = watch::channel(GameState::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sweep_task = tokio::spawn(sweep(
            Arc::new(StubImages),
            state_rx,
            tx,
            SessionConfig::default(),
        ));
        // Let the sweep run against the pre-game snapshot first
        tokio::task::yield_now().await;

        let mut game = GameState::new();
        game.phase = GamePhase::Quiz;
        game.rounds = (0..4)
            .map(|i| {
                let mut round = Round::new(location(&format!("Place {i}"), 0));
                if i == 0 {
                    round.image_path = Some(PathBuf::from("img/eager.png"));
                }
                round
            })
            .collect();
        state_tx.send_replace(game);

        let mut fetched = Vec::new();
        for _ in 0..3 {
            let cmd = timeout(Duration::from_secs(3600), rx.recv())
                .await
                .expect("sweep never produced an image")
                .expect("sweep dropped its sender early");
            match cmd {
                Command::ImageReady { round, .. } => fetched.push(round),
                other => panic!("unexpected command: {other:?}"),
            }
        }
        assert_eq!(fetched, vec![1, 2, 3]);
        sweep_task.await.unwrap();
    }
}
