use std::{sync::Arc, time::SystemTime};

use tracing::{error, info, warn};

use crate::{
    dao::{content_store::ContentStore, models::SessionEntity},
    error::ServiceError,
    state::stats::{apply_global_score, apply_language_score},
};

/// Fold a completed session into the player's per-language and global statistics.
///
/// The two rows are written one after the other; a failure on the second write
/// leaves the first one applied.
pub async fn record_completed_session(
    store: &Arc<dyn ContentStore>,
    session: &SessionEntity,
) -> Result<(), ServiceError> {
    let Some(user_id) = session.user_id.clone() else {
        return Ok(());
    };
    let now = session.completed_at.unwrap_or_else(SystemTime::now);

    let existing = store
        .find_user_stats(user_id.clone(), session.language.clone())
        .await?;
    let stats = apply_language_score(
        existing,
        &user_id,
        &session.language,
        session.volume,
        session.score,
        now,
    );
    store.save_user_stats(stats.clone()).await?;

    let Some(mut user) = store.find_user(user_id.clone()).await? else {
        warn!(user_id = %user_id, "user vanished before global stats update");
        return Ok(());
    };
    apply_global_score(&mut user, session.score);
    if let Err(err) = store.save_user(user.clone()).await {
        error!(
            user_id = %user_id,
            language = %session.language,
            error = %err,
            "language stats updated but global stats write failed"
        );
        return Err(err.into());
    }

    info!(
        user_id = %user_id,
        language = %session.language,
        score = session.score,
        games_played = stats.games_played,
        total_games = user.total_games,
        "recorded completed session"
    );
    Ok(())
}
