use std::{cmp::Ordering, collections::HashMap};

use crate::{
    dao::models::LanguageStatus,
    dto::public::{GlobalLeaderboardEntry, LanguageLeaderboardEntry, LanguageSummary},
    error::ServiceError,
    state::SharedState,
};

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Languages currently open for play.
pub async fn active_languages(state: &SharedState) -> Result<Vec<LanguageSummary>, ServiceError> {
    let store = state.require_store().await?;
    let languages = store.list_languages().await?;
    Ok(languages
        .into_iter()
        .filter(|language| language.status == LanguageStatus::Active)
        .map(LanguageSummary::from)
        .collect())
}

/// Best players of one language, by highest score then average score.
pub async fn language_leaderboard(
    state: &SharedState,
    language: String,
    limit: Option<usize>,
) -> Result<Vec<LanguageLeaderboardEntry>, ServiceError> {
    let store = state.require_store().await?;
    if store.find_language(language.clone()).await?.is_none() {
        return Err(ServiceError::NotFound(format!("language `{language}`")));
    }
    let limit = state.config().leaderboard().clamp(limit);

    let mut rows = store.list_user_stats(Some(language)).await?;
    rows.sort_by(|a, b| {
        b.highest_score
            .cmp(&a.highest_score)
            .then_with(|| descending(a.average_score, b.average_score))
            .then_with(|| b.games_played.cmp(&a.games_played))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    rows.truncate(limit);

    let names: HashMap<String, String> = store
        .list_users()
        .await?
        .into_iter()
        .map(|user| (user.id, user.display_name))
        .collect();

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| LanguageLeaderboardEntry {
            rank: index + 1,
            display_name: names.get(&row.user_id).cloned(),
            user_id: row.user_id,
            highest_score: row.highest_score,
            average_score: row.average_score,
            games_played: row.games_played,
        })
        .collect())
}

/// Players across every language, by global average then games played.
pub async fn global_leaderboard(
    state: &SharedState,
    limit: Option<usize>,
) -> Result<Vec<GlobalLeaderboardEntry>, ServiceError> {
    let store = state.require_store().await?;
    let limit = state.config().leaderboard().clamp(limit);

    let mut users: Vec<_> = store
        .list_users()
        .await?
        .into_iter()
        .filter(|user| user.total_games > 0)
        .collect();
    users.sort_by(|a, b| {
        descending(a.average_score, b.average_score)
            .then_with(|| b.total_games.cmp(&a.total_games))
            .then_with(|| a.id.cmp(&b.id))
    });
    users.truncate(limit);

    Ok(users
        .into_iter()
        .enumerate()
        .map(|(index, user)| GlobalLeaderboardEntry {
            rank: index + 1,
            user_id: user.id,
            display_name: user.display_name,
            average_score: user.average_score,
            total_games: user.total_games,
        })
        .collect())
}
