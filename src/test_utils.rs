pub mod fixtures {
    use crate::forms::FormData;
    use crate::models::domain::{AnswerSpec, Category, Question, Quiz, ScoringFunction};

    /// The editable text document for [`two_category_quiz`].
    pub fn two_category_quiz_text() -> &'static str {
        "Cat1\nCat2\n\nTea or coffee?\nmulti(A,B)\n[10,0]\n[0,10]\n"
    }

    /// A quiz with one multi-choice question where option 1 points wholly at
    /// Cat1 and option 2 wholly at Cat2.
    pub fn two_category_quiz() -> Quiz {
        let question = Question::multi_choice("Tea or coffee?", vec!["A".into(), "B".into()]);
        let mut quiz = Quiz::new("Hot drinks", "maddie");
        quiz.categories = vec![Category::new("Cat1"), Category::new("Cat2")];
        quiz.categories[0].answer_specs.push(AnswerSpec {
            question: question.clone(),
            scoring_function: ScoringFunction::multi(vec![10.0, 0.0]),
        });
        quiz.categories[1].answer_specs.push(AnswerSpec {
            question: question.clone(),
            scoring_function: ScoringFunction::multi(vec![0.0, 10.0]),
        });
        quiz.questions.push(question);
        quiz
    }

    /// Builds the form a respondent would submit when taking a quiz.
    pub fn response_form(fields: &[(&str, &str)]) -> FormData {
        fields.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use crate::models::domain::Quiz;

    #[test]
    fn fixture_text_parses_to_fixture_quiz() {
        let parsed = Quiz::parse("Hot drinks", "maddie", two_category_quiz_text()).unwrap();
        assert_eq!(parsed, two_category_quiz());
    }
}
