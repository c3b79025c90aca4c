pub mod answer_service;
pub mod quiz_service;

pub use answer_service::AnswerService;
pub use quiz_service::{
    diff_quiz_categories, diff_quiz_questions, CategoryDiff, QuestionDiff, QuizService, StoredQuiz,
};
