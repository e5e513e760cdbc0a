use std::time::SystemTime;

use rand::Rng;
use uuid::Uuid;

use crate::dao::models::SessionEntity;

/// Result of recording one claim against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedAnswer {
    /// Position of the answered snippet.
    pub index: usize,
    /// Whether the claim matched the answer key.
    pub correct: bool,
    /// Whether this answer completed the session.
    pub completed: bool,
}

impl SessionEntity {
    /// Number of snippets in the session.
    pub fn total(&self) -> usize {
        self.snippet_ids.len()
    }

    /// A session is over once every snippet has an answer.
    pub fn is_over(&self) -> bool {
        self.answers.len() >= self.snippet_ids.len()
    }

    /// Snippet awaiting an answer, if any.
    pub fn current_snippet(&self) -> Option<Uuid> {
        self.snippet_ids.get(self.answers.len()).copied()
    }

    /// Append a claim, scoring it against the answer key.
    ///
    /// Returns `None` without touching the session when it is already over.
    pub fn record_answer(&mut self, claim: bool, now: SystemTime) -> Option<RecordedAnswer> {
        if self.is_over() {
            return None;
        }

        let index = self.answers.len();
        let expected = *self.answer_key.get(index)?;
        let correct = claim == expected;

        self.answers.push(claim);
        if correct {
            self.score += 1;
        }

        let completed = self.is_over();
        if completed {
            self.completed_at = Some(now);
        }

        Some(RecordedAnswer {
            index,
            correct,
            completed,
        })
    }

    /// Score derived from the stored answers and answer key.
    pub fn recomputed_score(&self) -> u32 {
        self.answers
            .iter()
            .zip(&self.answer_key)
            .filter(|(answer, expected)| answer == expected)
            .count() as u32
    }

    /// Build a public slug for this session: `{language}-{difficulty}-{nnnn}-{id suffix}`.
    pub fn share_slug<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let simple = self.id.simple().to_string();
        let suffix = &simple[simple.len() - 6..];
        let number: u16 = rng.random_range(1000..=9999);
        format!(
            "{}-{}-{}-{}",
            self.language,
            self.difficulty.as_str(),
            number,
            suffix
        )
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::dao::models::Difficulty;

    fn session(answer_key: Vec<bool>) -> SessionEntity {
        SessionEntity {
            id: Uuid::new_v4(),
            user_id: None,
            language: "typescript".into(),
            level: 1,
            difficulty: Difficulty::Easy,
            volume: 1,
            snippet_ids: answer_key.iter().map(|_| Uuid::new_v4()).collect(),
            answer_key,
            answers: vec![],
            score: 0,
            time_limit_secs: 60,
            created_at: SystemTime::now(),
            completed_at: None,
            share_slug: None,
            finalized_at: None,
        }
    }

    #[test]
    fn score_tracks_matching_claims_and_completion_is_monotonic() {
        let mut session = session(vec![true, false, true]);
        let now = SystemTime::now();

        let claims = [true, true, true];
        for (step, claim) in claims.into_iter().enumerate() {
            assert!(!session.is_over());
            assert_eq!(session.current_snippet(), Some(session.snippet_ids[step]));
            let recorded = session.record_answer(claim, now).unwrap();
            assert_eq!(recorded.index, step);
            assert_eq!(session.score, session.recomputed_score());
            assert_eq!(recorded.completed, step == 2);
        }

        assert_eq!(session.score, 2);
        assert!(session.is_over());
        assert_eq!(session.completed_at, Some(now));
        assert_eq!(session.current_snippet(), None);

        assert!(session.record_answer(false, now).is_none());
        assert_eq!(session.answers.len(), 3);
        assert!(session.is_over());
    }

    #[test]
    fn slug_has_expected_shape() {
        let session = session(vec![true]);
        let mut rng = StdRng::seed_from_u64(7);
        let slug = session.share_slug(&mut rng);

        let parts: Vec<&str> = slug.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "typescript");
        assert_eq!(parts[1], "easy");
        let number: u16 = parts[2].parse().unwrap();
        assert!((1000..=9999).contains(&number));
        assert!(session.id.simple().to_string().ends_with(parts[3]));
        assert_eq!(parts[3].len(), 6);
    }
}
