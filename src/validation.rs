// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Submission validation rules
//!
//! Every rule runs and every failure is reported, so a client can fix all
//! problems in one round trip. Lengths count Unicode scalar values.

use serde::Serialize;

use crate::idea::{Category, Submission};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MIN: usize = 10;
pub const DESCRIPTION_MAX: usize = 500;
pub const AUTHOR_MAX: usize = 50;

pub const MISSING_REQUIRED: &str = "Title, description, and category are required";
pub const RATE_LIMITED: &str = "Please wait before submitting another idea";

const TITLE_BLOCKLIST: &[&str] = &["test", "spam"];

const DESCRIPTION_BLOCKLIST: &[&str] = &[
    "test",
    "spam",
    "asdf",
    "123",
    "xxx",
    "free money",
    "click here",
    "limited offer",
];

const TAG_BLOCKLIST: &[&str] = &[
    "test",
    "spam",
    "xxx",
    "123",
    "free money",
    "limited offer",
    "click here",
];

/// Outcome of validating a submission
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    needles.iter().any(|needle| lowered.contains(needle))
}

/// True when title, description or category is absent
pub fn missing_required(submission: &Submission) -> bool {
    submission.title.is_empty() || submission.description.is_empty() || submission.category.is_empty()
}

/// Validate a submission's content
///
/// A submission missing a required field gets the single
/// [`MISSING_REQUIRED`] message; otherwise all rules are applied.
pub fn validate(submission: &Submission) -> ValidationReport {
    let mut report = ValidationReport::default();

    if missing_required(submission) {
        report.push(MISSING_REQUIRED);
        return report;
    }

    let title = &submission.title;
    if title.trim().chars().count() < TITLE_MIN {
        report.push("Title must be at least 3 characters long");
    }
    if title.chars().count() > TITLE_MAX {
        report.push("Title must be less than 100 characters");
    }
    if contains_any(title, TITLE_BLOCKLIST) {
        report.push("Title cannot contain \"test\" or \"spam\"");
    }

    let description = &submission.description;
    if description.trim().chars().count() < DESCRIPTION_MIN {
        report.push("Description must be at least 10 characters long");
    }
    if description.chars().count() > DESCRIPTION_MAX {
        report.push("Description must be less than 500 characters");
    }
    if contains_any(description, DESCRIPTION_BLOCKLIST) {
        report.push("Description contains inappropriate content");
    }

    if submission.category.parse::<Category>().is_err() {
        report.push("Please select a valid category");
    }

    if submission.tags.iter().any(|tag| contains_any(tag, TAG_BLOCKLIST)) {
        report.push("Tags contain inappropriate content");
    }

    if let Some(author) = &submission.author_name {
        if author.chars().count() > AUTHOR_MAX {
            report.push("Author name must be less than 50 characters");
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn good() -> Submission {
        Submission {
            title: "Meeting summariser".to_string(),
            description: "Turns call recordings into action items".to_string(),
            category: "Productivity".to_string(),
            tags: vec!["AI".to_string(), "NLP".to_string()],
            author_name: Some("Ada".to_string()),
        }
    }

    #[test]
    fn test_good_submission_passes() {
        assert!(validate(&good()).is_valid());
    }

    #[test]
    fn test_missing_fields_short_circuit() {
        let mut submission = good();
        submission.category = String::new();
        assert_eq!(validate(&submission).errors, vec![MISSING_REQUIRED]);
    }

    #[test]
    fn test_whitespace_title_too_short() {
        let mut submission = good();
        submission.title = "  ab   ".to_string();
        assert_eq!(
            validate(&submission).errors,
            vec!["Title must be at least 3 characters long"]
        );
    }

    #[test]
    fn test_length_bounds_are_inclusive() {
        let mut submission = good();
        submission.title = "a".repeat(TITLE_MAX);
        submission.description = "b".repeat(DESCRIPTION_MAX);
        assert!(validate(&submission).is_valid());

        submission.title = "a".repeat(TITLE_MAX + 1);
        submission.description = "b".repeat(DESCRIPTION_MAX + 1);
        assert_eq!(
            validate(&submission).errors,
            vec![
                "Title must be less than 100 characters",
                "Description must be less than 500 characters",
            ]
        );
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        let mut submission = good();
        submission.title = "é".repeat(TITLE_MAX);
        assert!(validate(&submission).is_valid());
    }

    #[test]
    fn test_blocklists_are_case_insensitive() {
        let mut submission = good();
        submission.title = "My SPAM machine".to_string();
        submission.description = "Click Here to get rich quickly".to_string();
        submission.tags = vec!["XXX".to_string()];
        assert_eq!(
            validate(&submission).errors,
            vec![
                "Title cannot contain \"test\" or \"spam\"",
                "Description contains inappropriate content",
                "Tags contain inappropriate content",
            ]
        );
    }

    #[test]
    fn test_substring_match_catches_embedded_words() {
        let mut submission = good();
        submission.title = "Contest helper".to_string();
        assert!(!validate(&submission).is_valid());

        let mut submission = good();
        submission.description = "Predicts room 1234 occupancy".to_string();
        assert_eq!(
            validate(&submission).errors,
            vec!["Description contains inappropriate content"]
        );
    }

    #[test]
    fn test_tag_blocklist_differs_from_description() {
        let mut submission = good();
        submission.tags = vec!["asdf".to_string()];
        assert!(validate(&submission).is_valid());
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut submission = good();
        submission.category = "Crypto".to_string();
        assert_eq!(validate(&submission).errors, vec!["Please select a valid category"]);
    }

    #[test]
    fn test_author_name_length() {
        let mut submission = good();
        submission.author_name = Some("x".repeat(AUTHOR_MAX + 1));
        assert_eq!(
            validate(&submission).errors,
            vec!["Author name must be less than 50 characters"]
        );

        // Measured on the raw value, like the form's maxlength
        submission.author_name = Some(format!("{}  ", "x".repeat(AUTHOR_MAX - 1)));
        assert_eq!(
            validate(&submission).errors,
            vec!["Author name must be less than 50 characters"]
        );

        submission.author_name = Some("x".repeat(AUTHOR_MAX));
        assert!(validate(&submission).is_valid());
    }

    #[test]
    fn test_collects_every_failure() {
        let submission = Submission {
            title: "ab".to_string(),
            description: "short".to_string(),
            category: "Nope".to_string(),
            tags: vec![],
            author_name: None,
        };
        assert_eq!(validate(&submission).errors.len(), 3);
    }
}
