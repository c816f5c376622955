use std::{collections::HashSet, fmt};

use crate::{
    models::{Category, ChoiceQuestion, PassageQuestion, Question, QuestionBody},
    names,
    question_id::{is_valid_question_id, is_valid_sentence_question_id},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

/// Every problem found in a payload, not just the first one. Rendered as a
/// single `path: message; ...` line in the response message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.path, e.message)?;
        }
        Ok(())
    }
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Shape checks for a question list before ids are assigned.
pub fn validate_questions(questions: &[Question]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if questions.is_empty() {
        errors.push("questions", "at least one question is required");
    }
    if questions.len() > names::MAX_QUESTIONS {
        errors.push(
            "questions",
            format!("at most {} questions are allowed", names::MAX_QUESTIONS),
        );
    }

    for (idx, question) in questions.iter().enumerate() {
        let path = format!("questions[{idx}]");
        match &question.body {
            QuestionBody::Sentence(passage) => check_passage(&path, passage, &mut errors),
            QuestionBody::Patinig(choice)
            | QuestionBody::Katinig(choice)
            | QuestionBody::Malapantig(choice)
            | QuestionBody::Word(choice) => check_choice(&path, choice, &mut errors),
        }
    }

    errors.into_result()
}

fn check_choice(path: &str, choice: &ChoiceQuestion, errors: &mut ValidationErrors) {
    if blank(&choice.question_text) {
        errors.push(format!("{path}.questionText"), "question text is required");
    }
    if choice.choice_options.is_empty() {
        errors.push(
            format!("{path}.choiceOptions"),
            "choice options are required",
        );
        return;
    }
    for (idx, option) in choice.choice_options.iter().enumerate() {
        if blank(&option.option_text) {
            errors.push(
                format!("{path}.choiceOptions[{idx}].optionText"),
                "option text is required",
            );
        }
    }
    if !choice.choice_options.iter().any(|o| o.is_correct) {
        errors.push(
            format!("{path}.choiceOptions"),
            "at least one option must be marked correct",
        );
    }
}

fn check_passage(path: &str, passage: &PassageQuestion, errors: &mut ValidationErrors) {
    if passage.passages.is_empty() {
        errors.push(format!("{path}.passages"), "at least one page is required");
    }
    for (idx, page) in passage.passages.iter().enumerate() {
        if blank(&page.page_text) {
            errors.push(
                format!("{path}.passages[{idx}].pageText"),
                "page text is required",
            );
        }
    }

    if passage.sentence_questions.is_empty() {
        errors.push(
            format!("{path}.sentenceQuestions"),
            "at least one comprehension question is required",
        );
    }
    for (idx, sub) in passage.sentence_questions.iter().enumerate() {
        let sub_path = format!("{path}.sentenceQuestions[{idx}]");
        for (field, value) in [
            ("questionText", &sub.question_text),
            ("correctAnswer", &sub.correct_answer),
            ("incorrectAnswer", &sub.incorrect_answer),
        ] {
            if blank(value) {
                errors.push(format!("{sub_path}.{field}"), format!("{field} is required"));
            }
        }
    }
}

/// Checks assigned ids against the category format. Runs before every write.
pub fn validate_question_ids(
    category: Category,
    questions: &[Question],
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut seen = HashSet::new();

    for (idx, question) in questions.iter().enumerate() {
        let path = format!("questions[{idx}].questionId");
        let id = question.question_id.as_str();

        if !is_valid_question_id(category, id) {
            errors.push(
                &path,
                format!(
                    "question id `{id}` does not match the {}_NNN format for {category}",
                    category.prefix()
                ),
            );
        } else if !seen.insert(id) {
            errors.push(&path, format!("duplicate question id `{id}`"));
        }

        if let QuestionBody::Sentence(passage) = &question.body {
            for (sq_idx, sub) in passage.sentence_questions.iter().enumerate() {
                if !is_valid_sentence_question_id(id, &sub.question_id) {
                    errors.push(
                        format!("questions[{idx}].sentenceQuestions[{sq_idx}].questionId"),
                        format!("sub-question id `{}` must be {id}_SQNN", sub.question_id),
                    );
                }
            }
        }
    }

    errors.into_result()
}
