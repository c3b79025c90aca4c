//! Recording quiz submissions and reconstructing them later as answer sets.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::forms::FormData;
use crate::models::domain::{AnswerSet, Question, UserAnswer};
use crate::repositories::{NewAnswerRow, QuizRepository};
use crate::services::quiz_service::StoredQuiz;

pub struct AnswerService {
    repository: Arc<dyn QuizRepository>,
}

impl AnswerService {
    pub fn new(repository: Arc<dyn QuizRepository>) -> Self {
        Self { repository }
    }

    /// Extracts the typed answers from a submitted response form and stores
    /// them under one fresh submission id. Unanswered questions are simply
    /// not recorded.
    pub async fn record_submission(
        &self,
        stored: &StoredQuiz,
        user: &str,
        form: &FormData,
    ) -> AppResult<Uuid> {
        let submission_id = Uuid::new_v4();

        let mut rows = Vec::new();
        for (index, question) in stored.questions.iter().enumerate() {
            let Some(value) = question.value.answer_from_form(form, index + 1)? else {
                continue;
            };
            rows.push(NewAnswerRow {
                submission_id,
                user: user.to_string(),
                question_id: question.id,
                value,
            });
        }

        if rows.is_empty() {
            return Err(AppError::ValidationError(
                "No answers were submitted".to_string(),
            ));
        }

        let count = rows.len();
        self.repository.insert_answers(rows).await?;
        log::info!(
            "recorded submission {} with {} answers for quiz {}",
            submission_id,
            count,
            stored.id
        );
        Ok(submission_id)
    }

    /// Groups every stored answer to the quiz into per-submission answer
    /// sets, oldest submission first. Rows pointing at questions that no
    /// longer exist are skipped; they are leftovers from before an edit.
    pub async fn answer_sets(&self, stored: &StoredQuiz) -> AppResult<Vec<AnswerSet>> {
        let rows = self.repository.answers_for_quiz(stored.id).await?;

        let questions_by_id: HashMap<i64, &Question> = stored
            .questions
            .iter()
            .map(|question| (question.id, &question.value))
            .collect();

        let mut order: Vec<Uuid> = Vec::new();
        let mut grouped: HashMap<Uuid, Vec<UserAnswer>> = HashMap::new();
        for row in rows {
            let Some(question) = questions_by_id.get(&row.question_id) else {
                continue;
            };
            grouped
                .entry(row.submission_id)
                .or_insert_with(|| {
                    order.push(row.submission_id);
                    Vec::new()
                })
                .push(UserAnswer {
                    submission_id: row.submission_id,
                    user: row.user,
                    question: (*question).clone(),
                    value: row.value,
                });
        }

        Ok(order
            .into_iter()
            .map(|submission_id| {
                let answers = grouped.remove(&submission_id).unwrap_or_default();
                AnswerSet::new(stored.quiz.clone(), submission_id, answers)
            })
            .collect())
    }

    /// How many submissions were best matched to each category, in category
    /// declaration order.
    pub async fn category_breakdown(&self, stored: &StoredQuiz) -> AppResult<Vec<(String, usize)>> {
        let mut counts = vec![0usize; stored.quiz.categories.len()];

        for answer_set in self.answer_sets(stored).await? {
            let Some(best) = answer_set.find_best_matching_category() else {
                continue;
            };
            if let Some(position) = stored
                .quiz
                .categories
                .iter()
                .position(|category| category.name == best.name)
            {
                counts[position] += 1;
            }
        }

        Ok(stored
            .quiz
            .categories
            .iter()
            .zip(counts)
            .map(|(category, count)| (category.name.clone(), count))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryQuizRepository;
    use crate::services::quiz_service::QuizService;
    use crate::test_utils::fixtures;

    async fn services() -> (QuizService, AnswerService) {
        let repository = Arc::new(InMemoryQuizRepository::new());
        (
            QuizService::new(repository.clone()),
            AnswerService::new(repository),
        )
    }

    #[tokio::test]
    async fn submissions_are_grouped_into_answer_sets() {
        let (quiz_service, answer_service) = services().await;
        let stored = quiz_service
            .create_quiz(&fixtures::two_category_quiz())
            .await
            .unwrap();

        let first = answer_service
            .record_submission(&stored, "taker", &fixtures::response_form(&[("question-1", "1")]))
            .await
            .unwrap();
        let second = answer_service
            .record_submission(&stored, "taker", &fixtures::response_form(&[("question-1", "2")]))
            .await
            .unwrap();

        let sets = answer_service.answer_sets(&stored).await.unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].submission_id, first);
        assert_eq!(sets[1].submission_id, second);
        assert_eq!(sets[0].find_best_matching_category().unwrap().name, "Cat1");
        assert_eq!(sets[1].find_best_matching_category().unwrap().name, "Cat2");
    }

    #[tokio::test]
    async fn empty_submissions_are_rejected() {
        let (quiz_service, answer_service) = services().await;
        let stored = quiz_service
            .create_quiz(&fixtures::two_category_quiz())
            .await
            .unwrap();

        let result = answer_service
            .record_submission(&stored, "taker", &FormData::new())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn breakdown_counts_best_matches_in_category_order() {
        let (quiz_service, answer_service) = services().await;
        let stored = quiz_service
            .create_quiz(&fixtures::two_category_quiz())
            .await
            .unwrap();

        for answer in ["1", "1", "2"] {
            answer_service
                .record_submission(
                    &stored,
                    "taker",
                    &fixtures::response_form(&[("question-1", answer)]),
                )
                .await
                .unwrap();
        }

        let breakdown = answer_service.category_breakdown(&stored).await.unwrap();
        assert_eq!(
            breakdown,
            vec![("Cat1".to_string(), 2), ("Cat2".to_string(), 1)]
        );
    }
}
