//! One respondent's sitting of a quiz: the answers they gave, grouped under a
//! shared submission id, and the per-category totals derived from them.

use once_cell::sync::OnceCell;
use uuid::Uuid;

use crate::models::domain::quiz::{Category, Quiz};
use crate::models::domain::question::Question;

/// A single stored answer to one question.
#[derive(Clone, Debug, PartialEq)]
pub struct UserAnswer {
    /// Groups every answer submitted in the same quiz-taking session.
    pub submission_id: Uuid,
    pub user: String,
    pub question: Question,
    pub value: f64,
}

/// All answers from one submission of one quiz, with memoised scoring.
#[derive(Clone, Debug)]
pub struct AnswerSet {
    pub quiz: Quiz,
    pub submission_id: Uuid,
    pub answers: Vec<UserAnswer>,
    // Compute-once cache; sound because answers never mutate after
    // construction.
    scores: OnceCell<Vec<(String, f64)>>,
}

impl AnswerSet {
    pub fn new(quiz: Quiz, submission_id: Uuid, answers: Vec<UserAnswer>) -> Self {
        AnswerSet {
            quiz,
            submission_id,
            answers,
            scores: OnceCell::new(),
        }
    }

    /// Per-category score totals in category declaration order, computed on
    /// first use.
    ///
    /// Answers whose question no longer has a spec in a category are skipped:
    /// they are historical rows left behind by quiz edits, not an invariant
    /// violation.
    pub fn score_answers(&self) -> &[(String, f64)] {
        self.scores.get_or_init(|| {
            let mut totals = vec![0.0; self.quiz.categories.len()];

            for answer in &self.answers {
                for (index, category) in self.quiz.categories.iter().enumerate() {
                    if let Some(spec) = category.answer_spec(&answer.question) {
                        totals[index] += spec.scoring_function.score(answer.value);
                    }
                }
            }

            self.quiz
                .categories
                .iter()
                .zip(totals)
                .map(|(category, total)| (category.name.clone(), total))
                .collect()
        })
    }

    /// The category with the highest total. Ties resolve to whichever
    /// category was declared first, so repeated calls agree. `None` only when
    /// the quiz has no categories.
    pub fn find_best_matching_category(&self) -> Option<&Category> {
        let scores = self.score_answers();

        let mut best: Option<(usize, f64)> = None;
        for (index, (_, total)) in scores.iter().enumerate() {
            match best {
                Some((_, best_total)) if *total <= best_total => {}
                _ => best = Some((index, *total)),
            }
        }

        best.map(|(index, _)| &self.quiz.categories[index])
    }
}
