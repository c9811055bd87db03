// src/models/mod.rs

pub mod answer_option;
pub mod question;
pub mod quiz;
pub mod user;
