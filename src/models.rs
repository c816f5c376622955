use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error returned when a string does not name one of the allowed enum values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidValue {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid {}. Must be one of: {}",
            self.field,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for InvalidValue {}

macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InvalidValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    _ => Err(InvalidValue {
                        field: $field,
                        value: s.to_owned(),
                        expected: Self::LABELS,
                    }),
                }
            }
        }
    };
}

labelled_enum!(
    /// CRLA proficiency tier, ordered from lowest to highest.
    ReadingLevel, "reading level" {
        LowEmerging => "Low Emerging",
        HighEmerging => "High Emerging",
        Developing => "Developing",
        Transitioning => "Transitioning",
        AtGradeLevel => "At Grade Level",
    }
);

labelled_enum!(
    /// Literacy skill domain an assessment covers.
    Category, "category" {
        AlphabetKnowledge => "Alphabet Knowledge",
        PhonologicalAwareness => "Phonological Awareness",
        Decoding => "Decoding",
        WordRecognition => "Word Recognition",
        ReadingComprehension => "Reading Comprehension",
    }
);

labelled_enum!(
    AssessmentStatus, "status" {
        Active => "active",
        Draft => "draft",
        Inactive => "inactive",
    }
);

impl Category {
    /// Two-letter code used to build question ids.
    pub fn prefix(self) -> &'static str {
        match self {
            Category::AlphabetKnowledge => "AK",
            Category::PhonologicalAwareness => "PA",
            Category::Decoding => "DC",
            Category::WordRecognition => "WR",
            Category::ReadingComprehension => "RC",
        }
    }
}

impl Default for AssessmentStatus {
    fn default() -> Self {
        AssessmentStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub question_id: String,
    #[serde(default)]
    pub order: u32,
    #[serde(flatten)]
    pub body: QuestionBody,
}

/// Question variants, discriminated by `questionType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "questionType", rename_all = "lowercase")]
pub enum QuestionBody {
    Patinig(ChoiceQuestion),
    Katinig(ChoiceQuestion),
    Malapantig(ChoiceQuestion),
    Word(ChoiceQuestion),
    Sentence(PassageQuestion),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceQuestion {
    #[serde(default)]
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_image: Option<String>,
    #[serde(default)]
    pub question_value: Option<String>,
    #[serde(default)]
    pub choice_options: Vec<ChoiceOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    #[serde(default)]
    pub option_id: String,
    #[serde(default)]
    pub option_text: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub description: String,
}

/// A multi-page story followed by comprehension sub-questions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassageQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    #[serde(default)]
    pub passages: Vec<Passage>,
    #[serde(default)]
    pub sentence_questions: Vec<SentenceQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passage {
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub page_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceQuestion {
    #[serde(default)]
    pub question_id: String,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub incorrect_answer: String,
    #[serde(default)]
    pub correct_answer_description: String,
    #[serde(default)]
    pub incorrect_answer_description: String,
    #[serde(default)]
    pub order: u32,
}

impl QuestionBody {
    pub fn question_type(&self) -> &'static str {
        match self {
            QuestionBody::Patinig(_) => "patinig",
            QuestionBody::Katinig(_) => "katinig",
            QuestionBody::Malapantig(_) => "malapantig",
            QuestionBody::Word(_) => "word",
            QuestionBody::Sentence(_) => "sentence",
        }
    }

    pub fn as_choice(&self) -> Option<&ChoiceQuestion> {
        match self {
            QuestionBody::Patinig(q)
            | QuestionBody::Katinig(q)
            | QuestionBody::Malapantig(q)
            | QuestionBody::Word(q) => Some(q),
            QuestionBody::Sentence(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub reading_level: ReadingLevel,
    pub category: Category,
    pub questions: Vec<Question>,
    pub status: AssessmentStatus,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assessment {
    /// Sets `status` and keeps `is_active` in lockstep with it.
    pub fn set_status(&mut self, status: AssessmentStatus) {
        self.status = status;
        self.is_active = status == AssessmentStatus::Active;
    }
}

/// Body of `POST /assessments`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssessment {
    pub reading_level: ReadingLevel,
    pub category: Category,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub status: Option<AssessmentStatus>,
}

/// Body of `PUT /assessments/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentPatch {
    #[serde(default)]
    pub reading_level: Option<ReadingLevel>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub questions: Option<Vec<Question>>,
    #[serde(default)]
    pub status: Option<AssessmentStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssessmentFilter {
    pub reading_level: Option<ReadingLevel>,
    pub category: Option<Category>,
    pub status: Option<AssessmentStatus>,
}
