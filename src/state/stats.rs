use std::time::SystemTime;

use crate::dao::models::{UserEntity, UserStatsEntity};

/// Fold one observation into a mean over `count` previous observations.
pub fn running_average(average: f64, count: u32, value: f64) -> f64 {
    (average * f64::from(count) + value) / (f64::from(count) + 1.0)
}

/// Apply a completed game to the (user, language) row, creating it when absent.
pub fn apply_language_score(
    existing: Option<UserStatsEntity>,
    user_id: &str,
    language: &str,
    volume: u32,
    score: u32,
    now: SystemTime,
) -> UserStatsEntity {
    let mut stats = existing.unwrap_or_else(|| UserStatsEntity {
        user_id: user_id.to_owned(),
        language: language.to_owned(),
        games_played: 0,
        average_score: 0.0,
        highest_score: 0,
        last_played_at: now,
        volumes_played: Vec::new(),
    });

    stats.average_score = running_average(stats.average_score, stats.games_played, score.into());
    stats.games_played += 1;
    stats.highest_score = stats.highest_score.max(score);
    stats.last_played_at = now;
    if !stats.volumes_played.contains(&volume) {
        stats.volumes_played.push(volume);
    }
    stats
}

/// Apply a completed game to the user's global counters.
pub fn apply_global_score(user: &mut UserEntity, score: u32) {
    user.average_score = running_average(user.average_score, user.total_games, score.into());
    user.total_games += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::Role;

    #[test]
    fn incremental_average_equals_arithmetic_mean() {
        let scores = [3u32, 0, 7, 5, 5, 1, 2, 6];
        let mut average = 0.0;
        for (count, score) in scores.iter().enumerate() {
            average = running_average(average, count as u32, f64::from(*score));
            let seen = &scores[..=count];
            let mean = seen.iter().map(|s| f64::from(*s)).sum::<f64>() / seen.len() as f64;
            assert!((average - mean).abs() < 1e-9);
        }
    }

    #[test]
    fn language_row_accumulates_games() {
        let now = SystemTime::now();
        let first = apply_language_score(None, "u1", "rust", 1, 2, now);
        assert_eq!(first.games_played, 1);
        assert_eq!(first.highest_score, 2);
        assert_eq!(first.volumes_played, vec![1]);

        let second = apply_language_score(Some(first), "u1", "rust", 1, 4, now);
        assert_eq!(second.games_played, 2);
        assert_eq!(second.average_score, 3.0);
        assert_eq!(second.highest_score, 4);
        assert_eq!(second.volumes_played, vec![1]);

        let third = apply_language_score(Some(second), "u1", "rust", 2, 0, now);
        assert_eq!(third.highest_score, 4);
        assert_eq!(third.volumes_played, vec![1, 2]);
        assert!((third.average_score - 2.0).abs() < 1e-9);
    }

    #[test]
    fn global_counters_use_the_same_formula() {
        let mut user = UserEntity {
            id: "u1".into(),
            display_name: "Ada".into(),
            role: Role::User,
            total_games: 0,
            average_score: 0.0,
            created_at: SystemTime::now(),
        };
        apply_global_score(&mut user, 3);
        apply_global_score(&mut user, 1);
        assert_eq!(user.total_games, 2);
        assert_eq!(user.average_score, 2.0);
    }
}
