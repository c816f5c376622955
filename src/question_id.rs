//! Human-readable question identifiers.
//!
//! Ids are derived from the assessment category and the question's position,
//! e.g. `AK_001`. Comprehension sub-questions hang off their parent id as
//! `AK_001_SQ01`. Ids are recomputed on every save, so moving a question
//! changes its id.

use std::sync::LazyLock;

use regex::Regex;
use ulid::Ulid;

use crate::models::{Category, Question, QuestionBody};

static QUESTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(AK|PA|DC|WR|RC)_\d{3}$").expect("valid question id regex"));

static SENTENCE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^_SQ\d{2}$").expect("valid sub-question regex"));

pub fn question_id(category: Category, ordinal: usize) -> String {
    format!("{}_{:03}", category.prefix(), ordinal)
}

pub fn sentence_question_id(parent_id: &str, ordinal: usize) -> String {
    format!("{parent_id}_SQ{ordinal:02}")
}

/// Whether `id` has the `{prefix}_NNN` shape for `category`.
pub fn is_valid_question_id(category: Category, id: &str) -> bool {
    QUESTION_ID.is_match(id) && id.starts_with(category.prefix())
}

pub fn is_valid_sentence_question_id(parent_id: &str, id: &str) -> bool {
    id.strip_prefix(parent_id)
        .is_some_and(|suffix| SENTENCE_SUFFIX.is_match(suffix))
}

/// Rewrites ids and ordering fields of `questions` from their list position.
///
/// Passage pages are renumbered from 1 and choice options that arrive
/// without an `optionId` get a fresh one. Existing option ids are kept.
pub fn assign_question_ids(category: Category, questions: &mut [Question]) {
    for (idx, question) in questions.iter_mut().enumerate() {
        let ordinal = idx + 1;
        question.question_id = question_id(category, ordinal);
        question.order = ordinal as u32;

        match &mut question.body {
            QuestionBody::Patinig(choice)
            | QuestionBody::Katinig(choice)
            | QuestionBody::Malapantig(choice)
            | QuestionBody::Word(choice) => {
                for option in &mut choice.choice_options {
                    if option.option_id.trim().is_empty() {
                        option.option_id = Ulid::new().to_string();
                    }
                }
            }
            QuestionBody::Sentence(passage) => {
                for (page_idx, page) in passage.passages.iter_mut().enumerate() {
                    page.page_number = page_idx as u32 + 1;
                }
                for (sq_idx, sub) in passage.sentence_questions.iter_mut().enumerate() {
                    sub.question_id = sentence_question_id(&question.question_id, sq_idx + 1);
                    sub.order = sq_idx as u32 + 1;
                }
            }
        }
    }
}
