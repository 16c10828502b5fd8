use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub id: i32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub prompt: String,
    #[serde(default = "default_marks")]
    pub marks: i32,
    /// Objective questions only.
    #[serde(default)]
    pub options: Vec<String>,
    /// Index into `options`; absent for theory questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<i32>,
}

fn default_marks() -> i32 {
    1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Objective,
    Theory,
}

impl Question {
    /// Copy safe to hand to a student taking the test.
    pub fn without_answer(&self) -> Question {
        Question {
            correct_answer: None,
            ..self.clone()
        }
    }
}
