//! Persistence orchestration for quizzes: saving a freshly authored quiz,
//! reassembling one from its stored rows, and applying edits.
//!
//! An edited quiz arrives as a brand new in-memory value with no storage
//! identity. Diffing it against the previously persisted quiz decides which
//! questions and categories are semantically unchanged so they keep their old
//! identity (and therefore their answer history). A question whose encoding
//! changed at all is treated as removed-then-added and loses its answers;
//! partial-field diffing of encoded strings is deliberately not attempted.

use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::models::domain::{AnswerSpec, Category, Question, Quiz, ScoringFunction};
use crate::repositories::{
    NewCategoryRow, NewQuestionRow, Persisted, QuizRepository, QuizRow,
};

/// A quiz reassembled from storage, with the identity of each of its parts.
#[derive(Clone, Debug)]
pub struct StoredQuiz {
    pub id: i64,
    pub quiz: Quiz,
    pub questions: Vec<Persisted<Question>>,
    pub categories: Vec<Persisted<Category>>,
}

/// Outcome of matching a new question list against the persisted one.
#[derive(Clone, Debug, Default)]
pub struct QuestionDiff {
    /// Unchanged questions: old identity plus the index they now occupy.
    pub kept: Vec<(Persisted<Question>, usize)>,
    pub removed: Vec<Persisted<Question>>,
    /// Indexes into the new question list with no persisted counterpart.
    pub added: Vec<usize>,
}

/// Outcome of matching new categories against persisted ones, by name.
#[derive(Clone, Debug, Default)]
pub struct CategoryDiff {
    pub kept: Vec<(Persisted<Category>, usize)>,
    pub removed: Vec<Persisted<Category>>,
    pub added: Vec<usize>,
}

/// Matches persisted questions against the new list by structural equality.
/// Each new question is claimed at most once, so duplicated questions pair
/// off one-to-one.
pub fn diff_quiz_questions(old: &[Persisted<Question>], new: &[Question]) -> QuestionDiff {
    let mut diff = QuestionDiff::default();
    let mut claimed = vec![false; new.len()];

    for old_question in old {
        let matched = new
            .iter()
            .enumerate()
            .find(|(index, question)| !claimed[*index] && **question == old_question.value);
        match matched {
            Some((index, _)) => {
                claimed[index] = true;
                diff.kept.push((old_question.clone(), index));
            }
            None => diff.removed.push(old_question.clone()),
        }
    }

    diff.added = claimed
        .iter()
        .enumerate()
        .filter(|(_, claimed)| !**claimed)
        .map(|(index, _)| index)
        .collect();
    diff
}

/// Matches persisted categories against the new list by name. The scoring
/// functions inside a kept category may still change; those are rewritten
/// wholesale on save.
pub fn diff_quiz_categories(old: &[Persisted<Category>], new: &[Category]) -> CategoryDiff {
    let mut diff = CategoryDiff::default();
    let mut claimed = vec![false; new.len()];

    for old_category in old {
        let matched = new
            .iter()
            .enumerate()
            .find(|(index, category)| !claimed[*index] && category.name == old_category.value.name);
        match matched {
            Some((index, _)) => {
                claimed[index] = true;
                diff.kept.push((old_category.clone(), index));
            }
            None => diff.removed.push(old_category.clone()),
        }
    }

    diff.added = claimed
        .iter()
        .enumerate()
        .filter(|(_, claimed)| !**claimed)
        .map(|(index, _)| index)
        .collect();
    diff
}

pub struct QuizService {
    repository: Arc<dyn QuizRepository>,
}

impl QuizService {
    pub fn new(repository: Arc<dyn QuizRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_quizzes(&self) -> AppResult<Vec<QuizRow>> {
        self.repository.list_quizzes().await
    }

    /// Validates and persists a freshly authored quiz.
    pub async fn create_quiz(&self, quiz: &Quiz) -> AppResult<StoredQuiz> {
        let errors = quiz.validate();
        if !errors.is_empty() {
            return Err(AppError::ValidationError(errors.join("; ")));
        }

        let quiz_row = self.repository.insert_quiz(&quiz.name, &quiz.owner).await?;

        let mut questions = Vec::with_capacity(quiz.questions.len());
        for (index, question) in quiz.questions.iter().enumerate() {
            let row = self
                .repository
                .insert_question(NewQuestionRow {
                    quiz_id: quiz_row.id,
                    position: index as i64 + 1,
                    text: question.text.clone(),
                    encoded: question.encode()?,
                })
                .await?;
            questions.push(Persisted::new(row.id, question.clone()));
        }

        let mut categories = Vec::with_capacity(quiz.categories.len());
        for (index, category) in quiz.categories.iter().enumerate() {
            let row = self
                .repository
                .insert_category(NewCategoryRow {
                    quiz_id: quiz_row.id,
                    position: index as i64 + 1,
                    name: category.name.clone(),
                    encoded_specs: encode_category_specs(category, &quiz.questions)?,
                })
                .await?;
            categories.push(Persisted::new(row.id, category.clone()));
        }

        log::info!(
            "created quiz {} (\"{}\") with {} questions and {} categories",
            quiz_row.id,
            quiz.name,
            questions.len(),
            categories.len()
        );
        Ok(StoredQuiz {
            id: quiz_row.id,
            quiz: quiz.clone(),
            questions,
            categories,
        })
    }

    /// Parses the editable text document and persists it as a new quiz.
    pub async fn create_quiz_from_text(
        &self,
        name: &str,
        owner: &str,
        encoded_text: &str,
    ) -> AppResult<StoredQuiz> {
        let quiz = Quiz::parse(name, owner, encoded_text)?;
        self.create_quiz(&quiz).await
    }

    /// Reassembles a quiz from its stored rows.
    pub async fn load_quiz(&self, quiz_id: i64) -> AppResult<StoredQuiz> {
        let quiz_row = self
            .repository
            .find_quiz(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))?;

        let question_rows = self.repository.questions_for_quiz(quiz_id).await?;
        let questions: Vec<Persisted<Question>> = question_rows
            .into_iter()
            .map(|row| Persisted::new(row.id, Question::parse(row.text, &row.encoded)))
            .collect();

        let mut categories = Vec::new();
        for row in self.repository.categories_for_quiz(quiz_id).await? {
            if row.encoded_specs.len() > questions.len() {
                return Err(AppError::StorageError(format!(
                    "Category \"{}\" has more scoring functions than the quiz has questions",
                    row.name
                )));
            }

            let mut category = Category::new(&row.name);
            for (question, encoded_spec) in questions.iter().zip(&row.encoded_specs) {
                let scoring_function = ScoringFunction::parse(encoded_spec)?;
                category.answer_specs.push(AnswerSpec {
                    question: question.value.clone(),
                    scoring_function,
                });
            }
            categories.push(Persisted::new(row.id, category));
        }

        let quiz = Quiz {
            name: quiz_row.name,
            owner: quiz_row.owner,
            questions: questions.iter().map(|q| q.value.clone()).collect(),
            categories: categories.iter().map(|c| c.value.clone()).collect(),
        };

        Ok(StoredQuiz {
            id: quiz_id,
            quiz,
            questions,
            categories,
        })
    }

    /// Applies an edit: unchanged questions and same-named categories keep
    /// their stored identity, everything else is removed and re-added.
    pub async fn edit_quiz(&self, quiz_id: i64, new_quiz: &Quiz) -> AppResult<StoredQuiz> {
        let stored = self.load_quiz(quiz_id).await?;

        let errors = new_quiz.validate();
        if !errors.is_empty() {
            return Err(AppError::ValidationError(errors.join("; ")));
        }

        let question_diff = diff_quiz_questions(&stored.questions, &new_quiz.questions);
        for removed in &question_diff.removed {
            self.repository.delete_question(removed.id).await?;
        }

        let mut question_slots: Vec<Option<Persisted<Question>>> =
            vec![None; new_quiz.questions.len()];
        for (old_question, index) in &question_diff.kept {
            self.repository
                .update_question_position(old_question.id, *index as i64 + 1)
                .await?;
            question_slots[*index] = Some(Persisted::new(
                old_question.id,
                new_quiz.questions[*index].clone(),
            ));
        }
        for &index in &question_diff.added {
            let question = &new_quiz.questions[index];
            let row = self
                .repository
                .insert_question(NewQuestionRow {
                    quiz_id,
                    position: index as i64 + 1,
                    text: question.text.clone(),
                    encoded: question.encode()?,
                })
                .await?;
            question_slots[index] = Some(Persisted::new(row.id, question.clone()));
        }
        let questions = filled_slots(question_slots)?;

        let category_diff = diff_quiz_categories(&stored.categories, &new_quiz.categories);
        for removed in &category_diff.removed {
            self.repository.delete_category(removed.id).await?;
        }

        let mut category_slots: Vec<Option<Persisted<Category>>> =
            vec![None; new_quiz.categories.len()];
        for (old_category, index) in &category_diff.kept {
            let category = &new_quiz.categories[*index];
            self.repository
                .update_category(
                    old_category.id,
                    *index as i64 + 1,
                    encode_category_specs(category, &new_quiz.questions)?,
                )
                .await?;
            category_slots[*index] = Some(Persisted::new(old_category.id, category.clone()));
        }
        for &index in &category_diff.added {
            let category = &new_quiz.categories[index];
            let row = self
                .repository
                .insert_category(NewCategoryRow {
                    quiz_id,
                    position: index as i64 + 1,
                    name: category.name.clone(),
                    encoded_specs: encode_category_specs(category, &new_quiz.questions)?,
                })
                .await?;
            category_slots[index] = Some(Persisted::new(row.id, category.clone()));
        }
        let categories = filled_slots(category_slots)?;

        self.repository.update_quiz_name(quiz_id, &new_quiz.name).await?;

        log::info!(
            "edited quiz {}: kept {} questions, removed {}, added {}",
            quiz_id,
            question_diff.kept.len(),
            question_diff.removed.len(),
            question_diff.added.len()
        );
        Ok(StoredQuiz {
            id: quiz_id,
            quiz: new_quiz.clone(),
            questions,
            categories,
        })
    }

    /// Parses the editable text document and applies it as an edit. The owner
    /// of a quiz never changes through editing.
    pub async fn edit_quiz_from_text(
        &self,
        quiz_id: i64,
        name: &str,
        encoded_text: &str,
    ) -> AppResult<StoredQuiz> {
        let stored = self.load_quiz(quiz_id).await?;
        let new_quiz = Quiz::parse(name, stored.quiz.owner.clone(), encoded_text)?;
        self.edit_quiz(quiz_id, &new_quiz).await
    }
}

/// The scoring lines stored for one category: one encoded function per
/// question, in question order. Positional, matching the text format.
fn encode_category_specs(category: &Category, questions: &[Question]) -> AppResult<Vec<String>> {
    questions
        .iter()
        .map(|question| {
            category
                .answer_spec(question)
                .map(|spec| spec.scoring_function.encode())
                .ok_or_else(|| {
                    AppError::InternalError(format!(
                        "Missing answer spec for question in category {}",
                        category.name
                    ))
                })
        })
        .collect()
}

fn filled_slots<T>(slots: Vec<Option<T>>) -> AppResult<Vec<T>> {
    slots
        .into_iter()
        .collect::<Option<Vec<T>>>()
        .ok_or_else(|| AppError::InternalError("Diff left a slot unfilled".to_string()))
}
