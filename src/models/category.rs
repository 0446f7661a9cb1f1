// src/models/category.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Academic tier. Drives both pricing and the question pool served in the exam.
///
/// This is the single list shared by pricing, participant records and questions.
/// The display labels used by the registration form are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[serde(alias = "Class 6th to 10th", alias = "JUNIOR")]
    Junior,
    #[serde(alias = "Class 11th / 12th or College", alias = "SENIOR")]
    Senior,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Junior, Category::Senior];

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Junior => "junior",
            Category::Senior => "senior",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Junior => "Class 6th to 10th",
            Category::Senior => "Class 11th / 12th or College",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| {
                c.as_str().eq_ignore_ascii_case(s) || c.label().eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| format!("Unknown category '{}'", s))
    }
}
