// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Idea domain types, tag handling and filtering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Tags suggested by the submission form
pub const EXAMPLE_TAGS: &[&str] = &[
    "AI",
    "Machine Learning",
    "Automation",
    "Chatbot",
    "Computer Vision",
    "NLP",
    "Analytics",
];

/// Idea categories, serialized by their display name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Productivity,
    Healthcare,
    Education,
    Entertainment,
    Business,
    Creative,
    SocialGood,
    DeveloperTools,
    Lifestyle,
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Productivity,
        Category::Healthcare,
        Category::Education,
        Category::Entertainment,
        Category::Business,
        Category::Creative,
        Category::SocialGood,
        Category::DeveloperTools,
        Category::Lifestyle,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Productivity => "Productivity",
            Category::Healthcare => "Healthcare",
            Category::Education => "Education",
            Category::Entertainment => "Entertainment",
            Category::Business => "Business",
            Category::Creative => "Creative",
            Category::SocialGood => "Social Good",
            Category::DeveloperTools => "Developer Tools",
            Category::Lifestyle => "Lifestyle",
            Category::Other => "Other",
        }
    }

    /// Display names of every category, in form order
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Category::as_str).collect()
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
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Tags as sent by a client: a list, or one comma-separated string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TagsInput {
    List(Vec<String>),
    Text(String),
}

fn deserialize_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let input: Option<TagsInput> = Option::deserialize(deserializer)?;
    Ok(match input {
        Some(TagsInput::List(tags)) => normalize_tags(tags),
        Some(TagsInput::Text(text)) => parse_tags(&text),
        None => Vec::new(),
    })
}

/// An inbound idea submission, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author_name: Option<String>,
}

impl Submission {
    /// Text sent to the moderator: title, description and tags separated by spaces
    pub fn moderation_text(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.tags.join(" "))
    }
}

/// A validated idea ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewIdea {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub author_name: Option<String>,
}

impl NewIdea {
    /// Build from a submission that already passed validation
    pub fn from_submission(submission: &Submission, category: Category) -> Self {
        let author_name = submission
            .author_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from);

        Self {
            title: submission.title.trim().to_string(),
            description: submission.description.trim().to_string(),
            category,
            tags: submission.tags.clone(),
            author_name,
        }
    }
}

/// A stored idea
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author_name: Option<String>,
    pub is_approved: bool,
    pub is_nsfw: bool,
    pub created_at: DateTime<Utc>,
}

impl Idea {
    pub fn has_any_tag(&self, selected: &[String]) -> bool {
        selected.iter().any(|tag| self.tags.contains(tag))
    }
}

/// Split a comma-separated tag string, trimming and dropping empties
pub fn parse_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Unique tags across all ideas, sorted
pub fn all_tags(ideas: &[Idea]) -> Vec<String> {
    ideas
        .iter()
        .flat_map(|idea| idea.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Keep ideas carrying any selected tag; an empty selection keeps everything
pub fn filter_by_tags(ideas: Vec<Idea>, selected: &[String]) -> Vec<Idea> {
    if selected.is_empty() {
        return ideas;
    }
    ideas.into_iter().filter(|idea| idea.has_any_tag(selected)).collect()
}

/// Remove the tag when selected, append it otherwise
pub fn toggle_tag(selected: &[String], tag: &str) -> Vec<String> {
    if selected.iter().any(|t| t == tag) {
        selected.iter().filter(|t| *t != tag).cloned().collect()
    } else {
        let mut next = selected.to_vec();
        next.push(tag.to_string());
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea(id: &str, tags: &[&str]) -> Idea {
        Idea {
            id: id.to_string(),
            title: format!("Idea {}", id),
            description: "A description long enough".to_string(),
            category: "Other".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            author_name: None,
            is_approved: true,
            is_nsfw: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_category_round_trips_display_name() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("social good".parse::<Category>().is_err());
        assert_eq!(Category::names().len(), 10);
    }

    #[test]
    fn test_parse_tags_trims_and_drops_empty() {
        assert_eq!(parse_tags(" AI, NLP ,, ,Chatbot"), vec!["AI", "NLP", "Chatbot"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_submission_accepts_tag_string_or_list() {
        let from_text: Submission = serde_json::from_str(
            r#"{"title":"t","description":"d","category":"Other","tags":"AI, NLP"}"#,
        )
        .unwrap();
        assert_eq!(from_text.tags, vec!["AI", "NLP"]);

        let from_list: Submission = serde_json::from_str(
            r#"{"title":"t","description":"d","category":"Other","tags":[" AI ",""],"authorName":"Ada"}"#,
        )
        .unwrap();
        assert_eq!(from_list.tags, vec!["AI"]);
        assert_eq!(from_list.author_name.as_deref(), Some("Ada"));

        let without: Submission = serde_json::from_str(r#"{"tags":null}"#).unwrap();
        assert!(without.tags.is_empty());
        assert!(without.title.is_empty());
    }

    #[test]
    fn test_moderation_text_joins_fields() {
        let submission = Submission {
            title: "Smart notes".to_string(),
            description: "Summarise meetings".to_string(),
            category: "Productivity".to_string(),
            tags: vec!["AI".to_string(), "NLP".to_string()],
            author_name: None,
        };
        assert_eq!(submission.moderation_text(), "Smart notes Summarise meetings AI NLP");
    }

    #[test]
    fn test_new_idea_drops_blank_author() {
        let submission = Submission {
            title: "  Smart notes ".to_string(),
            description: "Summarise meetings".to_string(),
            category: "Productivity".to_string(),
            tags: vec![],
            author_name: Some("   ".to_string()),
        };
        let new_idea = NewIdea::from_submission(&submission, Category::Productivity);
        assert_eq!(new_idea.title, "Smart notes");
        assert_eq!(new_idea.author_name, None);
    }

    #[test]
    fn test_all_tags_unique_sorted() {
        let ideas = vec![idea("1", &["NLP", "AI"]), idea("2", &["AI", "Chatbot"])];
        assert_eq!(all_tags(&ideas), vec!["AI", "Chatbot", "NLP"]);
    }

    #[test]
    fn test_filter_matches_any_selected_tag() {
        let ideas = vec![idea("1", &["NLP"]), idea("2", &["Chatbot"]), idea("3", &[])];

        let all = filter_by_tags(ideas.clone(), &[]);
        assert_eq!(all.len(), 3);

        let selected = vec!["NLP".to_string(), "Chatbot".to_string()];
        let ids: Vec<_> = filter_by_tags(ideas.clone(), &selected)
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);

        assert!(filter_by_tags(ideas, &["nlp".to_string()]).is_empty());
    }

    #[test]
    fn test_toggle_tag() {
        let selected = toggle_tag(&[], "AI");
        assert_eq!(selected, vec!["AI"]);
        let selected = toggle_tag(&selected, "NLP");
        assert_eq!(selected, vec!["AI", "NLP"]);
        let selected = toggle_tag(&selected, "AI");
        assert_eq!(selected, vec!["NLP"]);
    }
}
