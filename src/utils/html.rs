// src/utils/html.rs

/// Whitelist sanitisation for admin-authored question content: safe tags
/// (`<b>`, `<p>`, ...) stay, `<script>` and event-handler attributes go.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
