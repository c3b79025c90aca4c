use std::sync::Arc;

use persona_server::forms::FormData;
use persona_server::models::domain::Quiz;
use persona_server::repositories::InMemoryQuizRepository;
use persona_server::services::{AnswerService, QuizService};

const QUIZ_TEXT: &str = "\
Cat1
Cat2

Tea or coffee?
multi(A,B)
[10,0]
[0,10]

How adventurous are you?
int_slider(1,10)
gaussian(5,2,2)
gaussian(5,9,2)
";

fn services() -> (QuizService, AnswerService) {
    let _ = env_logger::builder().is_test(true).try_init();
    let repository = Arc::new(InMemoryQuizRepository::new());
    (
        QuizService::new(repository.clone()),
        AnswerService::new(repository),
    )
}

fn form(fields: &[(&str, &str)]) -> FormData {
    fields.iter().copied().collect()
}

#[tokio::test]
async fn create_load_and_score_a_quiz() {
    let (quiz_service, _) = services();

    let stored = quiz_service
        .create_quiz_from_text("Hot drinks", "maddie", QUIZ_TEXT)
        .await
        .unwrap();

    let loaded = quiz_service.load_quiz(stored.id).await.unwrap();
    assert_eq!(loaded.quiz, stored.quiz);

    // Answering option 1 lands the respondent squarely in Cat1.
    let scores = loaded
        .quiz
        .score_responses(&form(&[("question-1", "1")]))
        .unwrap();
    assert_eq!(
        scores,
        vec![("Cat1".to_string(), 10.0), ("Cat2".to_string(), 0.0)]
    );

    // The slider answer shifts the balance: 10 + gaussian(5,2,2) at 2 = 15
    // for Cat1, while Cat2 only gets the far tail of its curve.
    let scores = loaded
        .quiz
        .score_responses(&form(&[("question-1", "1"), ("question-2", "2")]))
        .unwrap();
    assert_eq!(scores[0].1, 15.0);
    assert!(scores[1].1 < 1.0);
}

#[tokio::test]
async fn loaded_quiz_round_trips_through_its_text_document() {
    let (quiz_service, _) = services();

    let stored = quiz_service
        .create_quiz_from_text("Hot drinks", "maddie", QUIZ_TEXT)
        .await
        .unwrap();
    let loaded = quiz_service.load_quiz(stored.id).await.unwrap();

    let encoded = loaded.quiz.encode().unwrap();
    let reparsed = Quiz::parse("Hot drinks", "maddie", &encoded).unwrap();
    assert_eq!(reparsed, loaded.quiz);
}

#[tokio::test]
async fn submissions_survive_an_edit_that_keeps_questions_unchanged() {
    let (quiz_service, answer_service) = services();

    let stored = quiz_service
        .create_quiz_from_text("Hot drinks", "maddie", QUIZ_TEXT)
        .await
        .unwrap();
    answer_service
        .record_submission(&stored, "taker", &form(&[("question-1", "1")]))
        .await
        .unwrap();

    // Rename the quiz without touching any question encoding.
    let edited = quiz_service
        .edit_quiz_from_text(stored.id, "Hotter drinks", QUIZ_TEXT)
        .await
        .unwrap();

    // Unchanged questions carried their identity forward.
    assert_eq!(
        edited.questions.iter().map(|q| q.id).collect::<Vec<_>>(),
        stored.questions.iter().map(|q| q.id).collect::<Vec<_>>()
    );

    // So the earlier submission is still there.
    let sets = answer_service.answer_sets(&edited).await.unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].find_best_matching_category().unwrap().name, "Cat1");
}

#[tokio::test]
async fn editing_a_question_discards_its_answers() {
    let (quiz_service, answer_service) = services();

    let stored = quiz_service
        .create_quiz_from_text("Hot drinks", "maddie", QUIZ_TEXT)
        .await
        .unwrap();
    answer_service
        .record_submission(&stored, "taker", &form(&[("question-1", "1")]))
        .await
        .unwrap();

    // One character of the first question's options changed.
    let edited_text = QUIZ_TEXT.replace("multi(A,B)", "multi(A,C)");
    let edited = quiz_service
        .edit_quiz_from_text(stored.id, "Hot drinks", &edited_text)
        .await
        .unwrap();

    // The edited question was removed and re-added under a new identity...
    assert_ne!(edited.questions[0].id, stored.questions[0].id);
    // ...while the untouched slider kept its identity.
    assert_eq!(edited.questions[1].id, stored.questions[1].id);

    // The answers to the old question went with it.
    let sets = answer_service.answer_sets(&edited).await.unwrap();
    assert!(sets.is_empty());
}

#[tokio::test]
async fn invalid_quizzes_are_rejected_with_every_problem_reported() {
    let (quiz_service, _) = services();

    // A scoring line for a category that does not exist.
    let result = quiz_service
        .create_quiz_from_text("Broken", "maddie", "Cat1\n\nQ?\nmulti(A)\n[1]\n[2]\n")
        .await;
    assert!(result.is_err());

    // A malformed question is reported with its diagnostic.
    let result = quiz_service
        .create_quiz_from_text("Broken", "maddie", ":None\n\nQ?\nint_slider(a,2)\n")
        .await;
    let err = result.unwrap_err().to_string();
    assert!(err.contains("Could not parse question 1"), "got: {}", err);
    assert!(
        err.contains("Expected min to be an integer, instead was: a"),
        "got: {}",
        err
    );
}

#[tokio::test]
async fn loading_a_missing_quiz_is_not_found() {
    let (quiz_service, _) = services();
    let err = quiz_service.load_quiz(999).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}
