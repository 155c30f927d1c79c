use crate::error::{Error, Result};
use crate::models::evaluation::{Question, QuestionType};
use std::collections::{BTreeMap, HashMap};

pub const TRUE_LITERAL: &str = "true";
pub const FALSE_LITERAL: &str = "false";

/// Wire form of an answer set: question id to answer value.
pub type AnswerMap = BTreeMap<String, String>;

#[derive(Debug, Clone)]
enum AnswerRule {
    FreeText,
    OneOf(Vec<String>),
    TrueFalse,
}

impl AnswerRule {
    fn for_question(question: &Question) -> Self {
        match question.question_type {
            QuestionType::ShortAnswer => AnswerRule::FreeText,
            QuestionType::MultipleChoice => AnswerRule::OneOf(question.options.clone()),
            QuestionType::TrueFalse => AnswerRule::TrueFalse,
        }
    }

    fn check(&self, value: &str) -> std::result::Result<(), String> {
        // An empty value clears the answer for every question type.
        if value.is_empty() {
            return Ok(());
        }
        match self {
            AnswerRule::FreeText => Ok(()),
            AnswerRule::OneOf(options) if options.iter().any(|o| o == value) => Ok(()),
            AnswerRule::OneOf(_) => Err(format!("'{}' is not one of the options", value)),
            AnswerRule::TrueFalse if value == TRUE_LITERAL || value == FALSE_LITERAL => Ok(()),
            AnswerRule::TrueFalse => Err(format!(
                "expected '{}' or '{}', got '{}'",
                TRUE_LITERAL, FALSE_LITERAL, value
            )),
        }
    }
}

/// Answers keyed by question id. The key set is fixed when the set is
/// seeded; only values change afterwards.
#[derive(Debug, Clone, Default)]
pub struct AnswerSet {
    values: AnswerMap,
    rules: HashMap<String, AnswerRule>,
}

impl AnswerSet {
    pub fn seed(questions: &[Question]) -> Self {
        let mut values = AnswerMap::new();
        let mut rules = HashMap::with_capacity(questions.len());
        for q in questions {
            values.insert(q.id.clone(), String::new());
            rules.insert(q.id.clone(), AnswerRule::for_question(q));
        }
        Self { values, rules }
    }

    pub fn get(&self, question_id: &str) -> Option<&str> {
        self.values.get(question_id).map(String::as_str)
    }

    pub fn set(&mut self, question_id: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        let rule = self
            .rules
            .get(question_id)
            .ok_or_else(|| Error::UnknownQuestion(question_id.to_string()))?;
        rule.check(&value).map_err(|reason| Error::InvalidAnswer {
            question_id: question_id.to_string(),
            reason,
        })?;
        if let Some(slot) = self.values.get_mut(question_id) {
            *slot = value;
        }
        Ok(())
    }

    /// Owned copy for a request payload; later edits do not reach it.
    pub fn snapshot(&self) -> AnswerMap {
        self.values.clone()
    }

    pub fn answered(&self) -> usize {
        self.values.values().filter(|v| !v.is_empty()).count()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
