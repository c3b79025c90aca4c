//! Questions in a quiz: their typed shapes, string encoding, and the
//! extraction of typed answers from submitted forms.
//!
//! Parsing a stored question never fails. Anything unreadable becomes a
//! `Malformed` question carrying a diagnostic, so one corrupt record cannot
//! break rendering of a page full of otherwise valid questions.

use serde::{Deserialize, Serialize};

use crate::encoding::{encode_function, parse_function};
use crate::errors::{AppError, AppResult};
use crate::forms::FormData;
use crate::models::domain::scoring_function::ScoringFunction;

/// Type-specific shape of a question. Closed set: every operation matches
/// exhaustively over these variants.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum QuestionKind {
    /// A fixed set of labelled choices, referenced 1-based by answers.
    MultiChoice { options: Vec<String> },
    /// A discrete slider. `step` defaults to 1 when omitted in the encoding.
    IntSlider { min: i64, max: i64, step: i64 },
    /// A continuous slider.
    FloatSlider { min: f64, max: f64 },
    /// A question that could not be parsed. Never valid, never encodable.
    Malformed { error: String },
}

impl QuestionKind {
    /// The value a slider starts at before the respondent moves it.
    pub fn slider_default(&self) -> Option<f64> {
        match self {
            QuestionKind::IntSlider { min, max, .. } => {
                Some((min + max).div_euclid(2) as f64)
            }
            QuestionKind::FloatSlider { min, max } => Some((min + max) / 2.0),
            QuestionKind::MultiChoice { .. } | QuestionKind::Malformed { .. } => None,
        }
    }

    /// Presentation granularity for sliders. Continuous sliders get a step
    /// fine enough to feel continuous in an HTML range input; this plays no
    /// part in scoring.
    pub fn display_step(&self) -> Option<f64> {
        match self {
            QuestionKind::IntSlider { step, .. } => Some(*step as f64),
            QuestionKind::FloatSlider { min, max } => Some((max - min) / 1_000_000.0),
            QuestionKind::MultiChoice { .. } | QuestionKind::Malformed { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Question {
    pub text: String,
    pub kind: QuestionKind,
}

impl Question {
    pub fn multi_choice(text: impl Into<String>, options: Vec<String>) -> Self {
        Question {
            text: text.into(),
            kind: QuestionKind::MultiChoice { options },
        }
    }

    pub fn int_slider(text: impl Into<String>, min: i64, max: i64, step: i64) -> Self {
        Question {
            text: text.into(),
            kind: QuestionKind::IntSlider { min, max, step },
        }
    }

    pub fn float_slider(text: impl Into<String>, min: f64, max: f64) -> Self {
        Question {
            text: text.into(),
            kind: QuestionKind::FloatSlider { min, max },
        }
    }

    pub fn malformed(text: impl Into<String>, error: impl Into<String>) -> Self {
        Question {
            text: text.into(),
            kind: QuestionKind::Malformed {
                error: error.into(),
            },
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match &self.kind {
            QuestionKind::MultiChoice { .. } => "multi",
            QuestionKind::IntSlider { .. } => "int_slider",
            QuestionKind::FloatSlider { .. } => "float_slider",
            QuestionKind::Malformed { .. } => "malformed",
        }
    }

    /// Whether the question parsed cleanly and can be shown with an input
    /// control.
    pub fn is_valid(&self) -> bool {
        !matches!(self.kind, QuestionKind::Malformed { .. })
    }

    /// The parse diagnostic, for malformed questions.
    pub fn error(&self) -> Option<&str> {
        match &self.kind {
            QuestionKind::Malformed { error } => Some(error),
            _ => None,
        }
    }

    /// Encodes this question into the string stored in the database.
    ///
    /// Calling this on a malformed question is a programming error, not a
    /// user-visible failure: malformed questions exist only to surface parse
    /// failures and must never be written back.
    pub fn encode(&self) -> AppResult<String> {
        let args = match &self.kind {
            QuestionKind::MultiChoice { options } => options.clone(),
            QuestionKind::IntSlider { min, max, step } => {
                let mut args = vec![min.to_string(), max.to_string()];
                if *step != 1 {
                    args.push(step.to_string());
                }
                args
            }
            QuestionKind::FloatSlider { min, max } => {
                vec![min.to_string(), max.to_string()]
            }
            QuestionKind::Malformed { .. } => {
                return Err(AppError::InternalError(
                    "Encoding malformed questions is unsupported".to_string(),
                ));
            }
        };
        Ok(encode_function(self.type_tag(), &args))
    }

    /// Parses the given encoded question. Never fails: decode and argument
    /// errors come back as a `Malformed` question carrying the diagnostic.
    pub fn parse(text: impl Into<String>, encoded: &str) -> Question {
        let text = text.into();

        let (name, args) = match parse_function(encoded) {
            Ok(parsed) => parsed,
            Err(err) => return Question::malformed(text, err.to_string()),
        };

        match name.as_str() {
            "multi" => Question::multi_choice(text, args),
            "int_slider" => Self::parse_int_slider(text, &args),
            "float_slider" => Self::parse_float_slider(text, &args),
            _ => {
                let error = format!(
                    "Unknown question type \"{}\" for encoded question: {}",
                    name, encoded
                );
                Question::malformed(text, error)
            }
        }
    }

    /// Format: `int_slider(min,max)` or `int_slider(min,max,step)`.
    fn parse_int_slider(text: String, args: &[String]) -> Question {
        if args.len() != 2 && args.len() != 3 {
            let error = format!("Expected two or three arguments, got: {}", args.len());
            return Question::malformed(text, error);
        }

        let min = match args[0].parse::<i64>() {
            Ok(min) => min,
            Err(_) => {
                let error = format!("Expected min to be an integer, instead was: {}", args[0]);
                return Question::malformed(text, error);
            }
        };
        let max = match args[1].parse::<i64>() {
            Ok(max) => max,
            Err(_) => {
                let error = format!("Expected max to be an integer, instead was: {}", args[1]);
                return Question::malformed(text, error);
            }
        };
        let step = match args.get(2) {
            None => 1,
            Some(arg) => match arg.parse::<i64>() {
                Ok(step) => step,
                Err(_) => {
                    let error = format!("Expected step to be an integer, instead was: {}", arg);
                    return Question::malformed(text, error);
                }
            },
        };

        Question::int_slider(text, min, max, step)
    }

    /// Format: `float_slider(min,max)`.
    fn parse_float_slider(text: String, args: &[String]) -> Question {
        if args.len() != 2 {
            let error = format!("Expected two arguments, got: {}", args.len());
            return Question::malformed(text, error);
        }

        let min = match args[0].parse::<f64>() {
            Ok(min) => min,
            Err(_) => {
                let error = format!("Expected min to be a number, instead was: {}", args[0]);
                return Question::malformed(text, error);
            }
        };
        let max = match args[1].parse::<f64>() {
            Ok(max) => max,
            Err(_) => {
                let error = format!("Expected max to be a number, instead was: {}", args[1]);
                return Question::malformed(text, error);
            }
        };

        Question::float_slider(text, min, max)
    }

    /// Parses a block of text/encoding line pairs, the format used by the
    /// plain authoring textarea:
    ///
    /// ```text
    /// text1
    /// encoded1
    ///
    /// text2
    /// encoded2
    /// ```
    ///
    /// Blank lines and lines starting with `#` are ignored.
    pub fn parse_many(block: &str) -> Vec<Question> {
        let mut questions = Vec::new();
        let mut pending_text: Option<&str> = None;

        for line in block.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match pending_text.take() {
                None => pending_text = Some(line),
                Some(text) => questions.push(Question::parse(text, line)),
            }
        }

        questions
    }

    /// Extracts the typed answer given for this question from a submitted
    /// form, where `index` is the 1-based position of the question in its
    /// quiz. An absent or blank field means the question went unanswered.
    ///
    /// Multi-choice and discrete-slider answers must be integers; a
    /// non-coercible non-empty value is a caller error, not a skipped answer.
    pub fn answer_from_form(&self, form: &FormData, index: usize) -> AppResult<Option<f64>> {
        let field = format!("question-{}", index);
        let Some(raw) = form.get_trimmed(&field) else {
            return Ok(None);
        };

        match &self.kind {
            QuestionKind::MultiChoice { .. } | QuestionKind::IntSlider { .. } => raw
                .parse::<i64>()
                .map(|value| Some(value as f64))
                .map_err(|_| {
                    AppError::ValidationError(format!(
                        "Expected an integer answer for question {}, got: {}",
                        index, raw
                    ))
                }),
            QuestionKind::FloatSlider { .. } => {
                raw.parse::<f64>().map(Some).map_err(|_| {
                    AppError::ValidationError(format!(
                        "Expected a numeric answer for question {}, got: {}",
                        index, raw
                    ))
                })
            }
            // Malformed questions render without an input control, so any
            // value under their field name is meaningless.
            QuestionKind::Malformed { .. } => Ok(None),
        }
    }

    /// Builds a multi-choice question, and one scoring function per category,
    /// from the structured authoring form.
    ///
    /// Option text lives in `question_{n}_multi_choice_{m}` and per-category
    /// option weights in `question_{n}_multi_choice_{m}_category_{c}_weight`,
    /// all 1-based. Problems are accumulated into `errors` so the author sees
    /// every mistake in one pass.
    pub fn multi_from_form(
        question_number: usize,
        text: String,
        form: &FormData,
        category_count: usize,
        errors: &mut Vec<String>,
    ) -> (Question, Vec<ScoringFunction>) {
        let mut options = Vec::new();
        let mut kept_option_numbers = Vec::new();

        let mut option_number = 1;
        while form.contains(&format!(
            "question_{}_multi_choice_{}",
            question_number, option_number
        )) {
            let field = format!("question_{}_multi_choice_{}", question_number, option_number);
            match form.get_trimmed(&field) {
                Some(option) => {
                    options.push(option.to_string());
                    kept_option_numbers.push(option_number);
                }
                None => {
                    errors.push(format!(
                        "Missing text for option {} of multi-choice question {}",
                        option_number, question_number
                    ));
                }
            }
            option_number += 1;
        }

        let mut scoring_functions = Vec::with_capacity(category_count);
        for category_number in 1..=category_count {
            let mut option_scores = Vec::with_capacity(kept_option_numbers.len());
            for &option_number in &kept_option_numbers {
                let field = format!(
                    "question_{}_multi_choice_{}_category_{}_weight",
                    question_number, option_number, category_number
                );
                // An unticked or blank weight contributes nothing.
                let score = match form.get_trimmed(&field) {
                    None => 0.0,
                    Some(raw) => match raw.parse::<f64>() {
                        Ok(score) => score,
                        Err(_) => {
                            errors.push(format!(
                                "Expected a number for the weight of option {} in category {} \
                                 of question {}, got: {}",
                                option_number, category_number, question_number, raw
                            ));
                            0.0
                        }
                    },
                };
                option_scores.push(score);
            }
            scoring_functions.push(ScoringFunction::multi(option_scores));
        }

        (Question::multi_choice(text, options), scoring_functions)
    }

    /// Builds a discrete slider question, and one gaussian scoring function
    /// per category, from the structured authoring form.
    ///
    /// Returns `None` when the slider cannot be built at all; the reasons are
    /// accumulated into `errors`.
    pub fn int_slider_from_form(
        question_number: usize,
        text: String,
        form: &FormData,
        category_count: usize,
        errors: &mut Vec<String>,
    ) -> Option<(Question, Vec<ScoringFunction>)> {
        let bounds = slider_bounds(question_number, form, errors)?;
        let (min_text, max_text) = bounds;

        let (Ok(min), Ok(max)) = (min_text.parse::<i64>(), max_text.parse::<i64>()) else {
            errors.push(format!(
                "Min and max must both be integers for slider question {}",
                question_number
            ));
            return None;
        };

        let step_field = format!("question_{}_slider_step", question_number);
        let step = match form.get_trimmed(&step_field) {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(step) => step,
                Err(_) => {
                    errors.push(format!(
                        "Step must be an integer for slider question {}",
                        question_number
                    ));
                    return None;
                }
            },
        };

        let scoring_functions =
            slider_scoring_from_form(question_number, form, category_count, errors)?;
        Some((
            Question::int_slider(text, min, max, step),
            scoring_functions,
        ))
    }

    /// Builds a continuous slider question, and one gaussian scoring function
    /// per category, from the structured authoring form.
    pub fn float_slider_from_form(
        question_number: usize,
        text: String,
        form: &FormData,
        category_count: usize,
        errors: &mut Vec<String>,
    ) -> Option<(Question, Vec<ScoringFunction>)> {
        let (min_text, max_text) = slider_bounds(question_number, form, errors)?;

        let (Ok(min), Ok(max)) = (min_text.parse::<f64>(), max_text.parse::<f64>()) else {
            errors.push(format!(
                "Min and max must both be numbers for slider question {}",
                question_number
            ));
            return None;
        };

        let scoring_functions =
            slider_scoring_from_form(question_number, form, category_count, errors)?;
        Some((Question::float_slider(text, min, max), scoring_functions))
    }
}

/// Reads the raw min/max fields shared by both slider kinds.
fn slider_bounds<'f>(
    question_number: usize,
    form: &'f FormData,
    errors: &mut Vec<String>,
) -> Option<(&'f str, &'f str)> {
    let min = form.get_trimmed(&format!("question_{}_slider_min", question_number));
    let max = form.get_trimmed(&format!("question_{}_slider_max", question_number));
    match (min, max) {
        (Some(min), Some(max)) => Some((min, max)),
        _ => {
            errors.push(format!(
                "Missing min or max value for slider question {}",
                question_number
            ));
            None
        }
    }
}

/// Builds the per-category gaussian scoring functions for a slider question:
/// an expected value (`peak`) and weight per category, and one shared margin
/// of error that becomes the standard deviation.
fn slider_scoring_from_form(
    question_number: usize,
    form: &FormData,
    category_count: usize,
    errors: &mut Vec<String>,
) -> Option<Vec<ScoringFunction>> {
    let margin_field = format!("question_{}_slider_margin", question_number);
    let margin = match form.get_trimmed(&margin_field) {
        None => {
            errors.push(format!(
                "Missing margin of error for slider question {}",
                question_number
            ));
            None
        }
        Some(raw) => match raw.parse::<f64>() {
            Ok(margin) => Some(margin),
            Err(_) => {
                errors.push(format!(
                    "Margin of error must be a number for slider question {}",
                    question_number
                ));
                None
            }
        },
    };

    let mut scoring_functions = Vec::with_capacity(category_count);
    let mut failed = margin.is_none();
    for category_number in 1..=category_count {
        let peak = parse_category_field(question_number, category_number, "peak", form, errors);
        let weight = parse_category_field(question_number, category_number, "weight", form, errors);

        match (peak, weight, margin) {
            (Some(peak), Some(weight), Some(margin)) => {
                scoring_functions.push(ScoringFunction::gaussian(weight, peak, margin));
            }
            _ => failed = true,
        }
    }

    if failed {
        None
    } else {
        Some(scoring_functions)
    }
}

fn parse_category_field(
    question_number: usize,
    category_number: usize,
    name: &str,
    form: &FormData,
    errors: &mut Vec<String>,
) -> Option<f64> {
    let field = format!(
        "question_{}_slider_category_{}_{}",
        question_number, category_number, name
    );
    match form.get_trimmed(&field) {
        None => {
            errors.push(format!(
                "Missing {} for category {} of slider question {}",
                name, category_number, question_number
            ));
            None
        }
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => Some(value),
            Err(_) => {
                errors.push(format!(
                    "Expected a number for the {} of category {} of slider question {}, got: {}",
                    name, category_number, question_number, raw
                ));
                None
            }
        },
    }
}
