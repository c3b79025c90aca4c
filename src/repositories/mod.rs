pub mod quiz_repository;

pub use quiz_repository::{
    AnswerRow, CategoryRow, InMemoryQuizRepository, NewAnswerRow, NewCategoryRow, NewQuestionRow,
    Persisted, QuestionRow, QuizRepository, QuizRow,
};
