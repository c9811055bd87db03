// src/exam/mod.rs

//! Exam flow: the per-browser session record, its clock and grading.

pub mod clock;
pub mod scoring;
pub mod session;
