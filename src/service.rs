// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Submission pipeline: validate, throttle, moderate, store

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::db::Database;
use crate::idea::{all_tags, filter_by_tags, Category, Idea, NewIdea, Submission};
use crate::moderation::{self, Moderator, Verdict};
use crate::ratelimit::RateLimiter;
use crate::validation::{self, RATE_LIMITED};
use crate::{IdeaBoardError, Result};

/// Warning used when a rejecting verdict carries none
pub const DEFAULT_REJECTION_WARNING: &str = "Please revise your content to be more appropriate.";

pub struct IdeaService {
    db: Database,
    moderator: Arc<dyn Moderator>,
    limiter: RateLimiter,
}

impl IdeaService {
    pub fn new(db: Database, moderator: Arc<dyn Moderator>, limiter: RateLimiter) -> Self {
        Self {
            db,
            moderator,
            limiter,
        }
    }

    /// Build the service with the moderator and limits from configuration
    pub fn from_config(config: &AppConfig, db: Database) -> Result<Self> {
        let moderator = moderation::from_config(&config.moderation)?;
        info!("Moderation: {}", moderator.name());
        Ok(Self::new(db, moderator, RateLimiter::new(&config.rate_limit)))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Run a submission through the full pipeline and store it
    ///
    /// The client's rate-limit window is reserved before moderation and
    /// released again if the submission is rejected or cannot be stored.
    pub async fn submit(&self, client: &str, submission: Submission) -> Result<Idea> {
        let mut report = validation::validate(&submission);
        if !report.is_valid() {
            let missing = report.errors.iter().any(|e| e == validation::MISSING_REQUIRED);
            if !missing && self.limiter.check(client).is_err() {
                report.push(RATE_LIMITED);
            }
            debug!(client = %client, errors = ?report.errors, "submission failed validation");
            return Err(IdeaBoardError::Validation(report.errors));
        }

        let category: Category = submission
            .category
            .parse()
            .map_err(|e: String| IdeaBoardError::Validation(vec![e]))?;

        // A throttled client with otherwise valid content gets a 429
        self.limiter.try_reserve(client)?;

        let verdict = self.moderator.review(&submission.moderation_text()).await;
        if !verdict.is_appropriate {
            self.limiter.release(client);
            let warning = if verdict.warning.trim().is_empty() {
                DEFAULT_REJECTION_WARNING.to_string()
            } else {
                verdict.warning
            };
            warn!(client = %client, reason = ?verdict.reason, "submission rejected by moderation");
            return Err(IdeaBoardError::ContentRejected { warning });
        }

        let idea = match self.db.insert_idea(&NewIdea::from_submission(&submission, category)) {
            Ok(idea) => idea,
            Err(e) => {
                self.limiter.release(client);
                return Err(e);
            }
        };
        info!(id = %idea.id, category = %idea.category, "idea published");
        Ok(idea)
    }

    /// Visible ideas, newest first, filtered by any of the selected tags
    pub fn list(&self, selected_tags: &[String]) -> Result<Vec<Idea>> {
        Ok(filter_by_tags(self.db.list_visible()?, selected_tags))
    }

    /// Sorted unique tags across visible ideas
    pub fn tags(&self) -> Result<Vec<String>> {
        Ok(all_tags(&self.db.list_visible()?))
    }

    /// Review arbitrary content without storing anything
    pub async fn moderate(&self, content: &str) -> Verdict {
        self.moderator.review(content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::moderation::AllowAll;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Rejecting {
        warning: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Moderator for Rejecting {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        async fn review(&self, _content: &str) -> Verdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Verdict {
                is_appropriate: false,
                reason: Some("off topic".to_string()),
                warning: self.warning.to_string(),
            }
        }
    }

    fn service(moderator: Arc<dyn Moderator>) -> IdeaService {
        IdeaService::new(
            Database::in_memory().unwrap(),
            moderator,
            RateLimiter::new(&RateLimitConfig::default()),
        )
    }

    fn submission(title: &str, tags: &[&str]) -> Submission {
        Submission {
            title: title.to_string(),
            description: "Drafts replies to customer emails".to_string(),
            category: "Business".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            author_name: Some("Grace".to_string()),
        }
    }

    #[test]
    fn test_submit_stores_idea() {
        let service = service(Arc::new(AllowAll));
        let idea = tokio_test::block_on(service.submit("client-a", submission("Inbox helper", &["AI"])))
            .unwrap();

        assert_eq!(idea.category, "Business");
        assert_eq!(idea.author_name.as_deref(), Some("Grace"));
        assert_eq!(service.list(&[]).unwrap().len(), 1);
        assert_eq!(service.tags().unwrap(), vec!["AI"]);
    }

    #[test]
    fn test_second_submission_rate_limited() {
        let service = service(Arc::new(AllowAll));
        tokio_test::block_on(service.submit("client-a", submission("Inbox helper", &[]))).unwrap();

        let second = tokio_test::block_on(service.submit("client-a", submission("Another helper", &[])));
        assert!(matches!(second, Err(IdeaBoardError::RateLimited)));

        let other = tokio_test::block_on(service.submit("client-b", submission("Another helper", &[])));
        assert!(other.is_ok());
    }

    #[test]
    fn test_rate_limit_joins_other_errors() {
        let service = service(Arc::new(AllowAll));
        tokio_test::block_on(service.submit("client-a", submission("Inbox helper", &[]))).unwrap();

        match tokio_test::block_on(service.submit("client-a", submission("ab", &[]))) {
            Err(IdeaBoardError::Validation(errors)) => {
                assert_eq!(
                    errors,
                    vec!["Title must be at least 3 characters long", RATE_LIMITED]
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_submission_skips_moderation() {
        let rejecting = Arc::new(Rejecting {
            warning: "",
            calls: AtomicUsize::new(0),
        });
        let service = service(rejecting.clone());

        let result = tokio_test::block_on(service.submit("client-a", submission("spam bot", &[])));
        assert!(matches!(result, Err(IdeaBoardError::Validation(_))));
        assert_eq!(rejecting.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rejection_uses_default_warning_and_keeps_window_open() {
        let service = service(Arc::new(Rejecting {
            warning: " ",
            calls: AtomicUsize::new(0),
        }));

        for _ in 0..2 {
            match tokio_test::block_on(service.submit("client-a", submission("Inbox helper", &[]))) {
                Err(IdeaBoardError::ContentRejected { warning }) => {
                    assert_eq!(warning, DEFAULT_REJECTION_WARNING);
                }
                other => panic!("expected rejection, got {:?}", other),
            }
        }
        assert!(service.list(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_rejection_passes_model_warning() {
        let service = service(Arc::new(Rejecting {
            warning: "Keep it about AI",
            calls: AtomicUsize::new(0),
        }));
        match tokio_test::block_on(service.submit("client-a", submission("Inbox helper", &[]))) {
            Err(IdeaBoardError::ContentRejected { warning }) => assert_eq!(warning, "Keep it about AI"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_list_filters_by_tag() {
        let service = service(Arc::new(AllowAll));
        tokio_test::block_on(service.submit("a", submission("Vision helper", &["Computer Vision"]))).unwrap();
        tokio_test::block_on(service.submit("b", submission("Chat helper", &["Chatbot"]))).unwrap();

        let filtered = service.list(&["Chatbot".to_string()]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Chat helper");
    }

    struct Slow;

    #[async_trait]
    impl Moderator for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn review(&self, _content: &str) -> Verdict {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            Verdict::allow()
        }
    }

    #[tokio::test]
    async fn test_concurrent_submissions_share_one_window() {
        let service = service(Arc::new(Slow));

        let (first, second, third) = tokio::join!(
            service.submit("client-a", submission("Inbox helper", &[])),
            service.submit("client-a", submission("Meeting notes", &[])),
            service.submit("client-a", submission("Code reviewer", &[])),
        );

        let results = [first, second, third];
        let stored = results.iter().filter(|r| r.is_ok()).count();
        let throttled = results
            .iter()
            .filter(|r| matches!(r, Err(IdeaBoardError::RateLimited)))
            .count();
        assert_eq!(stored, 1);
        assert_eq!(throttled, 2);
        assert_eq!(service.list(&[]).unwrap().len(), 1);
    }

    #[test]
    fn test_rejection_releases_reserved_window() {
        let rejecting = Arc::new(Rejecting {
            warning: "Keep it about AI",
            calls: AtomicUsize::new(0),
        });
        let service = service(rejecting.clone());

        for _ in 0..3 {
            let result = tokio_test::block_on(service.submit("client-a", submission("Inbox helper", &[])));
            assert!(matches!(result, Err(IdeaBoardError::ContentRejected { .. })));
        }
        assert_eq!(rejecting.calls.load(Ordering::SeqCst), 3);
        assert!(service.limiter.check("client-a").is_ok());
    }
}
