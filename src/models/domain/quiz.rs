//! The quiz aggregate: an ordered list of questions plus the categories a
//! respondent can be sorted into, with one scoring rule per (category,
//! question) pair. Includes the whole-document text encoding used for storage
//! and hand-editing, and scoring of a full response form.

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::forms::FormData;
use crate::models::domain::question::Question;
use crate::models::domain::scoring_function::ScoringFunction;

/// The rule for scoring answers to one question within one category.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AnswerSpec {
    pub question: Question,
    pub scoring_function: ScoringFunction,
}

/// A classification outcome a respondent can be placed into, holding one
/// answer spec per question of the quiz.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Category {
    pub name: String,
    pub answer_specs: Vec<AnswerSpec>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Category {
            name: name.into(),
            answer_specs: Vec::new(),
        }
    }

    /// The answer spec for the given question, matched structurally.
    pub fn answer_spec(&self, question: &Question) -> Option<&AnswerSpec> {
        self.answer_specs
            .iter()
            .find(|spec| spec.question == *question)
    }
}

/// Marker used in place of the category section when a quiz has none.
const NO_CATEGORIES_SENTINEL: &str = ":None";

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Quiz {
    pub name: String,
    pub owner: String,
    /// Order is meaningful: it defines the 1-based index used in the text
    /// encoding, form field naming, and display.
    pub questions: Vec<Question>,
    pub categories: Vec<Category>,
}

impl Quiz {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Quiz {
            name: name.into(),
            owner: owner.into(),
            questions: Vec::new(),
            categories: Vec::new(),
        }
    }

    /// Encodes this quiz into its editable text document:
    ///
    /// ```text
    /// category1
    /// category2
    ///
    /// question1 text
    /// question1 encoding
    /// scoring for category1
    /// scoring for category2
    ///
    /// question2 text
    /// ...
    /// ```
    ///
    /// Scoring lines correspond to categories by position, in declaration
    /// order. A missing answer spec is a data-integrity failure, not
    /// something to paper over.
    pub fn encode(&self) -> AppResult<String> {
        let mut encoded = String::new();

        for category in &self.categories {
            encoded.push_str(&category.name);
            encoded.push('\n');
        }
        if self.categories.is_empty() {
            encoded.push_str(NO_CATEGORIES_SENTINEL);
            encoded.push('\n');
        }
        encoded.push('\n');

        for question in &self.questions {
            encoded.push_str(&question.text);
            encoded.push('\n');
            encoded.push_str(&question.encode()?);
            encoded.push('\n');
            for category in &self.categories {
                let spec = category.answer_spec(question).ok_or_else(|| {
                    AppError::InternalError(format!(
                        "Missing answer spec for question in category {}",
                        category.name
                    ))
                })?;
                encoded.push_str(&spec.scoring_function.encode());
                encoded.push('\n');
            }
            encoded.push('\n');
        }

        Ok(encoded)
    }

    /// Parses a quiz from its text document. Sections are delimited by blank
    /// lines, `#` lines are comments, and a trailing blank line is implied.
    ///
    /// Unreadable questions degrade to malformed ones; unreadable scoring
    /// functions fail the whole parse, since they are only ever written
    /// alongside validated questions.
    pub fn parse(name: impl Into<String>, owner: impl Into<String>, encoded_text: &str) -> AppResult<Quiz> {
        let mut sections: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in encoded_text.lines().chain(std::iter::once("")) {
            let line = line.trim();
            if line.is_empty() {
                if !current.is_empty() {
                    sections.push(std::mem::take(&mut current));
                }
            } else if !line.starts_with('#') {
                current.push(line);
            }
        }

        let mut quiz = Quiz::new(name, owner);
        let mut sections = sections.into_iter();

        let Some(category_section) = sections.next() else {
            return Ok(quiz);
        };
        if category_section != [NO_CATEGORIES_SENTINEL] {
            for name in category_section {
                quiz.categories.push(Category::new(name));
            }
        }

        for section in sections {
            let text = section[0];
            let question = match section.get(1) {
                Some(encoded_question) => Question::parse(text, encoded_question),
                // A lone text line has nothing to decode; keep it visible as
                // a malformed question rather than dropping it.
                None => Question::malformed(text, "Missing encoded question line"),
            };

            let spec_lines: &[&str] = section.get(2..).unwrap_or(&[]);
            if spec_lines.len() > quiz.categories.len() {
                return Err(AppError::ValidationError(format!(
                    "Question \"{}\" has more scoring functions than categories",
                    text
                )));
            }
            for (category_index, encoded_spec) in spec_lines.iter().enumerate() {
                let scoring_function = ScoringFunction::parse(encoded_spec)?;
                quiz.categories[category_index].answer_specs.push(AnswerSpec {
                    question: question.clone(),
                    scoring_function,
                });
            }

            quiz.questions.push(question);
        }

        Ok(quiz)
    }

    /// Scores a full set of submitted responses against every category.
    ///
    /// Unanswered questions are skipped; a category whose every question went
    /// unanswered ends at 0, it is not excluded. Totals come back in category
    /// declaration order.
    pub fn score_responses(&self, form: &FormData) -> AppResult<Vec<(String, f64)>> {
        let mut totals = vec![0.0; self.categories.len()];

        for (index, question) in self.questions.iter().enumerate() {
            let Some(answer) = question.answer_from_form(form, index + 1)? else {
                continue;
            };

            for (category_index, category) in self.categories.iter().enumerate() {
                let spec = category.answer_spec(question).ok_or_else(|| {
                    AppError::InternalError(format!(
                        "Missing answer spec for question in category {}",
                        category.name
                    ))
                })?;
                totals[category_index] += spec.scoring_function.score(answer);
            }
        }

        Ok(self
            .categories
            .iter()
            .zip(totals)
            .map(|(category, total)| (category.name.clone(), total))
            .collect())
    }

    /// Builds a quiz from the structured authoring form.
    ///
    /// Reads `category_{c}_name` fields first, then question blocks by
    /// incrementing 1-based index while `question_{n}_text` exists,
    /// dispatching on the `question_{n}_type` discriminator. Problems are
    /// accumulated into `errors` so the author can fix everything in one
    /// round-trip; an unrecognised question type skips that question without
    /// failing the rest.
    pub fn from_form(owner: &str, form: &FormData, errors: &mut Vec<String>) -> Quiz {
        let name = match form.get_trimmed("title") {
            Some(title) => title.to_string(),
            None => {
                errors.push("Missing quiz title".to_string());
                String::new()
            }
        };
        let mut quiz = Quiz::new(name, owner);

        let mut category_number = 1;
        while form.contains(&format!("category_{}_name", category_number)) {
            match form.get_trimmed(&format!("category_{}_name", category_number)) {
                Some(name) => quiz.categories.push(Category::new(name)),
                None => errors.push(format!("Missing name for category {}", category_number)),
            }
            category_number += 1;
        }
        let category_count = quiz.categories.len();

        let mut question_number = 1;
        while form.contains(&format!("question_{}_text", question_number)) {
            let text = match form.get_trimmed(&format!("question_{}_text", question_number)) {
                Some(text) => text.to_string(),
                None => {
                    errors.push(format!("Missing text for question {}", question_number));
                    question_number += 1;
                    continue;
                }
            };

            let question_type = form.get_trimmed(&format!("question_{}_type", question_number));
            let parsed = match question_type {
                Some("Multiple Choice") => Some(Question::multi_from_form(
                    question_number,
                    text,
                    form,
                    category_count,
                    errors,
                )),
                Some("Discrete Slider") => Question::int_slider_from_form(
                    question_number,
                    text,
                    form,
                    category_count,
                    errors,
                ),
                Some("Continuous Slider") => Question::float_slider_from_form(
                    question_number,
                    text,
                    form,
                    category_count,
                    errors,
                ),
                Some(unknown) => {
                    errors.push(format!(
                        "Unknown question type \"{}\" for question {}",
                        unknown, question_number
                    ));
                    None
                }
                None => {
                    errors.push(format!("Missing type for question {}", question_number));
                    None
                }
            };

            if let Some((question, scoring_functions)) = parsed {
                for (category, scoring_function) in
                    quiz.categories.iter_mut().zip(scoring_functions)
                {
                    category.answer_specs.push(AnswerSpec {
                        question: question.clone(),
                        scoring_function,
                    });
                }
                quiz.questions.push(question);
            }

            question_number += 1;
        }

        quiz
    }

    /// Checks the fully assembled quiz, returning every problem found rather
    /// than stopping at the first.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Missing quiz title".to_string());
        }
        if self.questions.is_empty() {
            errors.push("A quiz needs at least one question".to_string());
        }

        for (index, question) in self.questions.iter().enumerate() {
            if let Some(error) = question.error() {
                errors.push(format!("Could not parse question {}: {}", index + 1, error));
            }
        }

        for (index, category) in self.categories.iter().enumerate() {
            let duplicated = self.categories[..index]
                .iter()
                .any(|earlier| earlier.name == category.name);
            if duplicated {
                errors.push(format!("Duplicate category name \"{}\"", category.name));
            }
        }

        for category in &self.categories {
            for (index, question) in self.questions.iter().enumerate() {
                if !question.is_valid() {
                    continue;
                }
                match category.answer_spec(question) {
                    None => {
                        errors.push(format!(
                            "Missing answer spec for question {} in category {}",
                            index + 1,
                            category.name
                        ));
                    }
                    Some(spec) => {
                        self.validate_spec(spec, index + 1, &category.name, &mut errors);
                    }
                }
            }
        }

        errors
    }

    fn validate_spec(
        &self,
        spec: &AnswerSpec,
        question_number: usize,
        category_name: &str,
        errors: &mut Vec<String>,
    ) {
        use crate::models::domain::question::QuestionKind;

        match (&spec.question.kind, &spec.scoring_function) {
            (QuestionKind::MultiChoice { options }, ScoringFunction::Multi(multi)) => {
                if options.len() != multi.option_scores.len() {
                    errors.push(format!(
                        "Category {} scores {} options for question {} but it has {}",
                        category_name,
                        multi.option_scores.len(),
                        question_number,
                        options.len()
                    ));
                }
            }
            (_, ScoringFunction::Gaussian(gaussian)) => {
                if gaussian.std_dev == 0.0 {
                    errors.push(format!(
                        "Margin of error must be non-zero for question {} in category {}",
                        question_number, category_name
                    ));
                }
            }
            _ => {}
        }
    }
}
