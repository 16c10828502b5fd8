use serde_json::{Map, Value as JsonValue};

use crate::models::question::{Question, QuestionType};

/// Outcome of auto-grading one submission.
#[derive(Debug, Clone)]
pub struct GradeOutcome {
    pub earned_marks: i32,
    pub total_marks: i32,
    pub graded_answers: Vec<JsonValue>,
    /// True when at least one theory answer still needs a teacher.
    pub needs_review: bool,
}

pub struct GradingService;

impl GradingService {
    /// Score objective questions automatically; theory questions are left
    /// pending manual grading. Unanswered questions earn zero but still
    /// appear in the graded list so teachers see the gaps.
    pub fn grade_objective_only(
        questions: &[Question],
        answers: &Map<String, JsonValue>,
    ) -> GradeOutcome {
        let mut total_marks = 0;
        let mut earned_marks = 0;
        let mut graded = Vec::with_capacity(questions.len());
        let mut needs_review = false;

        for (idx, q) in questions.iter().enumerate() {
            total_marks += q.marks;
            let question_id = q.id.max(idx as i32 + 1);
            let student_answer = answers
                .get(&question_id.to_string())
                .cloned()
                .unwrap_or(JsonValue::Null);

            match q.question_type {
                QuestionType::Objective => {
                    let selected = selected_index(&student_answer);
                    let correct = q.correct_answer;
                    let is_correct = match (selected, correct) {
                        (Some(s), Some(c)) => s == c,
                        _ => false,
                    };
                    let marks_earned = if is_correct { q.marks } else { 0 };
                    earned_marks += marks_earned;
                    graded.push(serde_json::json!({
                        "question_id": question_id,
                        "prompt": q.prompt,
                        "type": "objective",
                        "student_answer": student_answer,
                        "correct_answer": correct,
                        "marks_earned": marks_earned,
                        "max_marks": q.marks,
                        "is_correct": is_correct,
                    }));
                }
                QuestionType::Theory => {
                    let answered = !student_answer.is_null();
                    if answered {
                        needs_review = true;
                    }
                    graded.push(serde_json::json!({
                        "question_id": question_id,
                        "prompt": q.prompt,
                        "type": "theory",
                        "student_answer": student_answer,
                        "marks_earned": 0,
                        "max_marks": q.marks,
                        "is_correct": false,
                        "needs_review": answered,
                    }));
                }
            }
        }

        GradeOutcome {
            earned_marks,
            total_marks,
            graded_answers: graded,
            needs_review,
        }
    }
}

/// Accepts either a bare option index or `{"selected": idx}`.
fn selected_index(answer: &JsonValue) -> Option<i32> {
    answer
        .as_i64()
        .or_else(|| {
            if answer.is_object() {
                answer.get("selected").and_then(|v| v.as_i64())
            } else {
                None
            }
        })
        .map(|v| v as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionType;
    use serde_json::json;

    fn objective(id: i32, marks: i32, correct: i32) -> Question {
        Question {
            id,
            question_type: QuestionType::Objective,
            prompt: format!("obj {}", id),
            marks,
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer: Some(correct),
        }
    }

    fn theory(id: i32, marks: i32) -> Question {
        Question {
            id,
            question_type: QuestionType::Theory,
            prompt: format!("theory {}", id),
            marks,
            options: vec![],
            correct_answer: None,
        }
    }

    fn answers(entries: &[(i32, JsonValue)]) -> Map<String, JsonValue> {
        entries
            .iter()
            .map(|(id, v)| (id.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn objective_answers_are_scored_immediately() {
        let questions = vec![objective(1, 2, 0), objective(2, 3, 1)];
        let ans = answers(&[(1, json!(0)), (2, json!(2))]);
        let outcome = GradingService::grade_objective_only(&questions, &ans);
        assert_eq!(outcome.earned_marks, 2);
        assert_eq!(outcome.total_marks, 5);
        assert!(!outcome.needs_review);
    }

    #[test]
    fn selected_object_form_is_accepted() {
        let questions = vec![objective(1, 1, 2)];
        let ans = answers(&[(1, json!({"selected": 2}))]);
        let outcome = GradingService::grade_objective_only(&questions, &ans);
        assert_eq!(outcome.earned_marks, 1);
    }

    #[test]
    fn theory_answers_stay_pending() {
        let questions = vec![objective(1, 1, 0), theory(2, 5)];
        let ans = answers(&[(1, json!(0)), (2, json!("an essay"))]);
        let outcome = GradingService::grade_objective_only(&questions, &ans);
        assert_eq!(outcome.earned_marks, 1);
        assert_eq!(outcome.total_marks, 6);
        assert!(outcome.needs_review);
        let entry = &outcome.graded_answers[1];
        assert_eq!(entry["needs_review"], json!(true));
        assert_eq!(entry["marks_earned"], json!(0));
    }

    #[test]
    fn unanswered_questions_earn_zero_and_skip_review() {
        let questions = vec![objective(1, 2, 0), theory(2, 5)];
        let outcome = GradingService::grade_objective_only(&questions, &Map::new());
        assert_eq!(outcome.earned_marks, 0);
        assert_eq!(outcome.total_marks, 7);
        assert!(!outcome.needs_review);
        assert_eq!(outcome.graded_answers.len(), 2);
        assert_eq!(outcome.graded_answers[0]["student_answer"], JsonValue::Null);
    }
}
