//! The storage boundary. The engine never talks to a database directly; it
//! reads and writes the row shapes below through the [`QuizRepository`]
//! trait, and the web layer wires in a real implementation. The in-memory
//! implementation here backs the tests and any single-process deployment.
//!
//! Domain objects never carry storage ids themselves; [`Persisted`] pairs a
//! value with its identity at the boundary instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// An immutable pairing of a domain object with its storage identity.
#[derive(Clone, Debug, PartialEq)]
pub struct Persisted<T> {
    pub id: i64,
    pub value: T,
}

impl<T> Persisted<T> {
    pub fn new(id: i64, value: T) -> Self {
        Persisted { id, value }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizRow {
    pub id: i64,
    pub name: String,
    pub owner: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuestionRow {
    pub id: i64,
    pub quiz_id: i64,
    /// Sort key; question order is meaningful.
    pub position: i64,
    pub text: String,
    pub encoded: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CategoryRow {
    pub id: i64,
    pub quiz_id: i64,
    pub position: i64,
    pub name: String,
    /// One encoded scoring function per question, in question order.
    pub encoded_specs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AnswerRow {
    pub id: i64,
    /// Groups the answers of one quiz-taking session.
    pub submission_id: Uuid,
    pub user: String,
    pub question_id: i64,
    pub value: f64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewQuestionRow {
    pub quiz_id: i64,
    pub position: i64,
    pub text: String,
    pub encoded: String,
}

#[derive(Clone, Debug)]
pub struct NewCategoryRow {
    pub quiz_id: i64,
    pub position: i64,
    pub name: String,
    pub encoded_specs: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct NewAnswerRow {
    pub submission_id: Uuid,
    pub user: String,
    pub question_id: i64,
    pub value: f64,
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn insert_quiz(&self, name: &str, owner: &str) -> AppResult<QuizRow>;
    async fn update_quiz_name(&self, quiz_id: i64, name: &str) -> AppResult<()>;
    async fn find_quiz(&self, quiz_id: i64) -> AppResult<Option<QuizRow>>;
    async fn list_quizzes(&self) -> AppResult<Vec<QuizRow>>;

    async fn insert_question(&self, row: NewQuestionRow) -> AppResult<QuestionRow>;
    async fn update_question_position(&self, question_id: i64, position: i64) -> AppResult<()>;
    /// Deletes a question and every stored answer to it.
    async fn delete_question(&self, question_id: i64) -> AppResult<()>;
    /// Questions of a quiz ordered by position.
    async fn questions_for_quiz(&self, quiz_id: i64) -> AppResult<Vec<QuestionRow>>;

    async fn insert_category(&self, row: NewCategoryRow) -> AppResult<CategoryRow>;
    async fn update_category(
        &self,
        category_id: i64,
        position: i64,
        encoded_specs: Vec<String>,
    ) -> AppResult<()>;
    async fn delete_category(&self, category_id: i64) -> AppResult<()>;
    /// Categories of a quiz ordered by position.
    async fn categories_for_quiz(&self, quiz_id: i64) -> AppResult<Vec<CategoryRow>>;

    async fn insert_answers(&self, rows: Vec<NewAnswerRow>) -> AppResult<Vec<AnswerRow>>;
    /// All answers to any question of the quiz, in insertion order.
    async fn answers_for_quiz(&self, quiz_id: i64) -> AppResult<Vec<AnswerRow>>;
}

#[derive(Default)]
struct Store {
    next_id: i64,
    quizzes: HashMap<i64, QuizRow>,
    questions: HashMap<i64, QuestionRow>,
    categories: HashMap<i64, CategoryRow>,
    answers: HashMap<i64, AnswerRow>,
}

impl Store {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Hash-map backed repository with monotonically allocated ids.
#[derive(Clone, Default)]
pub struct InMemoryQuizRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn insert_quiz(&self, name: &str, owner: &str) -> AppResult<QuizRow> {
        let mut store = self.store.write().await;
        let id = store.allocate_id();
        let row = QuizRow {
            id,
            name: name.to_string(),
            owner: owner.to_string(),
        };
        store.quizzes.insert(id, row.clone());
        log::debug!("inserted quiz {} (\"{}\")", id, name);
        Ok(row)
    }

    async fn update_quiz_name(&self, quiz_id: i64, name: &str) -> AppResult<()> {
        let mut store = self.store.write().await;
        let row = store
            .quizzes
            .get_mut(&quiz_id)
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))?;
        row.name = name.to_string();
        Ok(())
    }

    async fn find_quiz(&self, quiz_id: i64) -> AppResult<Option<QuizRow>> {
        let store = self.store.read().await;
        Ok(store.quizzes.get(&quiz_id).cloned())
    }

    async fn list_quizzes(&self) -> AppResult<Vec<QuizRow>> {
        let store = self.store.read().await;
        let mut rows: Vec<_> = store.quizzes.values().cloned().collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    async fn insert_question(&self, row: NewQuestionRow) -> AppResult<QuestionRow> {
        let mut store = self.store.write().await;
        if !store.quizzes.contains_key(&row.quiz_id) {
            return Err(AppError::StorageError(format!(
                "Cannot add question to missing quiz '{}'",
                row.quiz_id
            )));
        }
        let id = store.allocate_id();
        let row = QuestionRow {
            id,
            quiz_id: row.quiz_id,
            position: row.position,
            text: row.text,
            encoded: row.encoded,
        };
        store.questions.insert(id, row.clone());
        Ok(row)
    }

    async fn update_question_position(&self, question_id: i64, position: i64) -> AppResult<()> {
        let mut store = self.store.write().await;
        let row = store.questions.get_mut(&question_id).ok_or_else(|| {
            AppError::NotFound(format!("Question with id '{}' not found", question_id))
        })?;
        row.position = position;
        Ok(())
    }

    async fn delete_question(&self, question_id: i64) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store.questions.remove(&question_id).is_none() {
            return Err(AppError::NotFound(format!(
                "Question with id '{}' not found",
                question_id
            )));
        }
        // Answers to a deleted question are meaningless; cascade.
        store
            .answers
            .retain(|_, answer| answer.question_id != question_id);
        log::debug!("deleted question {} and its answers", question_id);
        Ok(())
    }

    async fn questions_for_quiz(&self, quiz_id: i64) -> AppResult<Vec<QuestionRow>> {
        let store = self.store.read().await;
        let mut rows: Vec<_> = store
            .questions
            .values()
            .filter(|row| row.quiz_id == quiz_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.position);
        Ok(rows)
    }

    async fn insert_category(&self, row: NewCategoryRow) -> AppResult<CategoryRow> {
        let mut store = self.store.write().await;
        if !store.quizzes.contains_key(&row.quiz_id) {
            return Err(AppError::StorageError(format!(
                "Cannot add category to missing quiz '{}'",
                row.quiz_id
            )));
        }
        let id = store.allocate_id();
        let row = CategoryRow {
            id,
            quiz_id: row.quiz_id,
            position: row.position,
            name: row.name,
            encoded_specs: row.encoded_specs,
        };
        store.categories.insert(id, row.clone());
        Ok(row)
    }

    async fn update_category(
        &self,
        category_id: i64,
        position: i64,
        encoded_specs: Vec<String>,
    ) -> AppResult<()> {
        let mut store = self.store.write().await;
        let row = store.categories.get_mut(&category_id).ok_or_else(|| {
            AppError::NotFound(format!("Category with id '{}' not found", category_id))
        })?;
        row.position = position;
        row.encoded_specs = encoded_specs;
        Ok(())
    }

    async fn delete_category(&self, category_id: i64) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store.categories.remove(&category_id).is_none() {
            return Err(AppError::NotFound(format!(
                "Category with id '{}' not found",
                category_id
            )));
        }
        Ok(())
    }

    async fn categories_for_quiz(&self, quiz_id: i64) -> AppResult<Vec<CategoryRow>> {
        let store = self.store.read().await;
        let mut rows: Vec<_> = store
            .categories
            .values()
            .filter(|row| row.quiz_id == quiz_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.position);
        Ok(rows)
    }

    async fn insert_answers(&self, rows: Vec<NewAnswerRow>) -> AppResult<Vec<AnswerRow>> {
        let mut store = self.store.write().await;
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            if !store.questions.contains_key(&row.question_id) {
                return Err(AppError::StorageError(format!(
                    "Cannot record answer to missing question '{}'",
                    row.question_id
                )));
            }
            let id = store.allocate_id();
            let row = AnswerRow {
                id,
                submission_id: row.submission_id,
                user: row.user,
                question_id: row.question_id,
                value: row.value,
                submitted_at: Utc::now(),
            };
            store.answers.insert(id, row.clone());
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn answers_for_quiz(&self, quiz_id: i64) -> AppResult<Vec<AnswerRow>> {
        let store = self.store.read().await;
        let question_ids: Vec<i64> = store
            .questions
            .values()
            .filter(|row| row.quiz_id == quiz_id)
            .map(|row| row.id)
            .collect();

        let mut rows: Vec<_> = store
            .answers
            .values()
            .filter(|row| question_ids.contains(&row.question_id))
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn quiz_rows_round_trip() {
        let repository = InMemoryQuizRepository::new();

        let quiz = repository.insert_quiz("Hot drinks", "maddie").await.unwrap();
        assert_eq!(repository.find_quiz(quiz.id).await.unwrap(), Some(quiz.clone()));
        assert_eq!(repository.find_quiz(quiz.id + 1).await.unwrap(), None);

        repository.update_quiz_name(quiz.id, "Hotter drinks").await.unwrap();
        let renamed = repository.find_quiz(quiz.id).await.unwrap().unwrap();
        assert_eq!(renamed.name, "Hotter drinks");
    }

    #[tokio::test]
    async fn questions_come_back_in_position_order() {
        let repository = InMemoryQuizRepository::new();
        let quiz = repository.insert_quiz("Hot drinks", "maddie").await.unwrap();

        for (position, encoded) in [(2, "multi(C)"), (1, "multi(A,B)")] {
            repository
                .insert_question(NewQuestionRow {
                    quiz_id: quiz.id,
                    position,
                    text: format!("Question {}", position),
                    encoded: encoded.to_string(),
                })
                .await
                .unwrap();
        }

        let rows = repository.questions_for_quiz(quiz.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].encoded, "multi(A,B)");
        assert_eq!(rows[1].encoded, "multi(C)");
    }

    #[tokio::test]
    async fn deleting_a_question_cascades_to_answers() {
        let repository = InMemoryQuizRepository::new();
        let quiz = repository.insert_quiz("Hot drinks", "maddie").await.unwrap();
        let question = repository
            .insert_question(NewQuestionRow {
                quiz_id: quiz.id,
                position: 1,
                text: "Tea or coffee?".to_string(),
                encoded: "multi(A,B)".to_string(),
            })
            .await
            .unwrap();

        repository
            .insert_answers(vec![NewAnswerRow {
                submission_id: Uuid::new_v4(),
                user: "taker".to_string(),
                question_id: question.id,
                value: 1.0,
            }])
            .await
            .unwrap();
        assert_eq!(repository.answers_for_quiz(quiz.id).await.unwrap().len(), 1);

        repository.delete_question(question.id).await.unwrap();
        assert!(repository.answers_for_quiz(quiz.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn answers_require_an_existing_question() {
        let repository = InMemoryQuizRepository::new();
        let result = repository
            .insert_answers(vec![NewAnswerRow {
                submission_id: Uuid::new_v4(),
                user: "taker".to_string(),
                question_id: 42,
                value: 1.0,
            }])
            .await;
        assert!(result.is_err());
    }
}
