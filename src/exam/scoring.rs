// src/exam/scoring.rs

use std::collections::HashMap;

use crate::models::question::QuestionWithOptions;

/// Prefix of the form fields carrying an answer, e.g. `question_12=40`.
pub const ANSWER_FIELD_PREFIX: &str = "question_";

/// Outcome of grading one submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub score: i64,
    pub total_questions: i64,
    /// 0..=100, rounded to two decimals.
    pub percentage: f64,
}

/// Extracts `question id -> option id` pairs from submitted form fields.
///
/// Fields without the answer prefix, and keys or values that are not
/// integers, are dropped.
pub fn parse_answers<'a, I>(fields: I) -> HashMap<i64, i64>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    fields
        .into_iter()
        .filter_map(|(key, value)| {
            let question_id = key.strip_prefix(ANSWER_FIELD_PREFIX)?.trim().parse().ok()?;
            let option_id = value.trim().parse().ok()?;
            Some((question_id, option_id))
        })
        .collect()
}

/// Grades answers against the questions of a quiz.
///
/// A chosen option only counts when it belongs to the question it answers
/// and is flagged correct.
pub fn grade(questions: &[QuestionWithOptions], answers: &HashMap<i64, i64>) -> Score {
    let total_questions = questions.len() as i64;

    let correct = questions
        .iter()
        .filter(|q| {
            answers.get(&q.question.id).is_some_and(|chosen| {
                q.options
                    .iter()
                    .any(|option| option.id == *chosen && option.is_correct)
            })
        })
        .count() as i64;

    Score {
        score: correct,
        total_questions,
        percentage: percentage(correct, total_questions),
    }
}

fn percentage(correct: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    // Ties go to the even hundredth: 1 of 800 is 0.12.
    let raw = correct as f64 * 100.0 / total as f64;
    (raw * 100.0).round_ties_even() / 100.0
}
