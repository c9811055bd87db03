// src/utils/html.rs

/// Clean admin-authored HTML (quiz descriptions, question bodies) before it
/// is stored. Templates render these fields unescaped.
///
/// Whitelist-based: safe tags such as <b>, <p> and <img> survive, while
/// <script>, <iframe> and event-handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
