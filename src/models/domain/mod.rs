pub mod answer_set;
pub mod question;
pub mod quiz;
pub mod scoring_function;

pub use answer_set::{AnswerSet, UserAnswer};
pub use question::{Question, QuestionKind};
pub use quiz::{AnswerSpec, Category, Quiz};
pub use scoring_function::{GaussianScoring, MultiScoring, ScoringFunction};
