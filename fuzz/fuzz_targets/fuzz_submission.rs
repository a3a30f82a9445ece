// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use ideaboard::idea::{parse_tags, Submission};
use ideaboard::moderation::interpret;
use ideaboard::validation::validate;

#[derive(Arbitrary, Debug)]
struct Input {
    title: String,
    description: String,
    category: String,
    tags: String,
    author_name: Option<String>,
    raw_json: String,
    reply: String,
}

fuzz_target!(|input: Input| {
    let tags = parse_tags(&input.tags);
    assert!(tags.iter().all(|tag| !tag.is_empty() && tag.trim() == tag));

    let submission = Submission {
        title: input.title,
        description: input.description,
        category: input.category,
        tags,
        author_name: input.author_name,
    };
    let report = validate(&submission);
    assert!(report.errors.len() <= 9);

    let _ = serde_json::from_str::<Submission>(&input.raw_json);

    let _ = interpret(&input.reply);
});
