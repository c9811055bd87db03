// src/exam/session.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::GUEST_NAME,
    exam::{
        clock::{self, StartTime},
        scoring::Score,
    },
};

/// Results kept in the session between submission and the results page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResults {
    pub score: i64,
    pub total_questions: i64,
    pub percentage: f64,
    pub user_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

/// Where a visitor stands in the exam flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamState {
    NotStarted,
    NameEntered { quiz_id: i64 },
    ExamActive { quiz_id: i64 },
    Submitted,
}

/// Per-browser exam state.
///
/// `start_time` is an ISO-8601 string so that a damaged value is still
/// representable; reading it goes through [`clock::resolve_start_time`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamSession {
    pub quiz_id: Option<i64>,
    pub user_name: Option<String>,
    pub answers: HashMap<i64, i64>,
    pub start_time: Option<String>,
    pub quiz_results: Option<QuizResults>,
    #[serde(default)]
    pub messages: Vec<FlashMessage>,
}

impl ExamSession {
    pub fn state(&self) -> ExamState {
        match (self.quiz_id, &self.user_name, &self.start_time) {
            (Some(quiz_id), Some(_), Some(_)) => ExamState::ExamActive { quiz_id },
            (Some(quiz_id), Some(_), None) => ExamState::NameEntered { quiz_id },
            _ if self.quiz_results.is_some() => ExamState::Submitted,
            _ => ExamState::NotStarted,
        }
    }

    /// Guard shared by every step between name entry and submission.
    pub fn is_taking(&self, quiz_id: i64) -> bool {
        self.user_name.is_some() && self.quiz_id == Some(quiz_id)
    }

    /// Name entry. Any clock left over from an abandoned attempt is dropped.
    pub fn begin(&mut self, quiz_id: i64, user_name: String) {
        self.quiz_id = Some(quiz_id);
        self.user_name = Some(user_name);
        self.answers.clear();
        self.start_time = None;
    }

    pub fn start_timer(&mut self, now: DateTime<Utc>) {
        self.start_time = Some(clock::format_start_time(now));
    }

    pub fn started_at(&self, now: DateTime<Utc>) -> Option<StartTime> {
        self.start_time
            .as_deref()
            .map(|raw| clock::resolve_start_time(raw, now))
    }

    /// Stores the graded result and clears the in-progress fields.
    /// The user name survives until the results page has been shown.
    pub fn record_results(&mut self, score: Score) -> &QuizResults {
        let user_name = self
            .user_name
            .clone()
            .unwrap_or_else(|| GUEST_NAME.to_string());

        self.quiz_id = None;
        self.start_time = None;
        self.answers.clear();

        self.quiz_results.insert(QuizResults {
            score: score.score,
            total_questions: score.total_questions,
            percentage: score.percentage,
            user_name,
        })
    }

    /// Hands out the results exactly once.
    pub fn take_results(&mut self) -> Option<QuizResults> {
        let results = self.quiz_results.take()?;
        self.user_name = None;
        Some(results)
    }

    pub fn flash(&mut self, level: FlashLevel, text: impl Into<String>) {
        self.messages.push(FlashMessage {
            level,
            text: text.into(),
        });
    }

    pub fn take_messages(&mut self) -> Vec<FlashMessage> {
        std::mem::take(&mut self.messages)
    }
}
