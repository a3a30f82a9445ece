// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Idea Board: a public board for sharing AI ideas
//!
//! Anonymous visitors submit short ideas with a category and tags. Each
//! submission is validated, throttled per client and reviewed by a language
//! model before it is stored in SQLite and shown on the board.

pub mod config;
pub mod db;
pub mod error;
pub mod idea;
pub mod moderation;
pub mod ratelimit;
pub mod service;
pub mod validation;
pub mod web;

pub use config::AppConfig;
pub use error::{IdeaBoardError, Result};
