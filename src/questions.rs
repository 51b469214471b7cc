//! Question model and the built-in fallback bank

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four answer options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    pub fn index(self) -> usize {
        match self {
            OptionLabel::A => 0,
            OptionLabel::B => 1,
            OptionLabel::C => 2,
            OptionLabel::D => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" => Some(OptionLabel::A),
            "B" => Some(OptionLabel::B),
            "C" => Some(OptionLabel::C),
            "D" => Some(OptionLabel::D),
            _ => None,
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multiple-choice question as delivered by the question source.
///
/// `answer` is present only when the source trusts the client with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: [String; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<OptionLabel>,
}

impl Question {
    pub fn option(&self, label: OptionLabel) -> &str {
        &self.options[label.index()]
    }

    /// True when `label` matches the known answer; `None` when withheld
    pub fn is_correct(&self, label: OptionLabel) -> Option<bool> {
        self.answer.map(|answer| answer == label)
    }
}

/// Ordered questions of one bank folder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionBank {
    pub folder: String,
    pub questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(folder: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            folder: folder.into(),
            questions,
        }
    }

    /// Small bank used when no question source is configured
    pub fn builtin() -> Self {
        let q = |question: &str, options: [&str; 4], answer: OptionLabel| Question {
            question: question.to_string(),
            options: options.map(str::to_string),
            answer: Some(answer),
        };
        Self::new(
            "builtin-01",
            vec![
                q(
                    "What is the capital of New Zealand?",
                    ["Auckland", "Wellington", "Christchurch", "Hamilton"],
                    OptionLabel::B,
                ),
                q("What is 2 + 2?", ["3", "4", "5", "6"], OptionLabel::B),
                q(
                    "What color is the sky?",
                    ["Red", "Blue", "Green", "Yellow"],
                    OptionLabel::B,
                ),
            ],
        )
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// True when every question carries its answer (local checking possible)
    pub fn has_answers(&self) -> bool {
        !self.questions.is_empty() && self.questions.iter().all(|q| q.answer.is_some())
    }
}

/// Folder holding the next bank, e.g. `comp705-01` -> `comp705-02`
pub fn next_folder(folder: &str) -> Option<String> {
    let (prefix, number) = split_folder(folder)?;
    Some(format!("{}-{:02}", prefix, number + 1))
}

/// Folder holding the previous bank; `None` at the first one
pub fn previous_folder(folder: &str) -> Option<String> {
    let (prefix, number) = split_folder(folder)?;
    if number <= 1 {
        return None;
    }
    Some(format!("{}-{:02}", prefix, number - 1))
}

/// Split `prefix-NN` where NN has at least two digits
fn split_folder(folder: &str) -> Option<(&str, u32)> {
    let folder = folder.trim_matches('/');
    // First dash whose remainder is all digits
    let dash = folder.match_indices('-').map(|(i, _)| i).find(|&i| {
        let rest = &folder[i + 1..];
        rest.len() >= 2 && rest.bytes().all(|b| b.is_ascii_digit())
    })?;
    let number = folder[dash + 1..].parse().ok()?;
    Some((&folder[..dash], number))
}
