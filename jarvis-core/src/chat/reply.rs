use crate::chat::calls::FunctionResult;

/// Model text followed by one status line per executed call.
pub fn render_reply(visible_text: &str, results: &[FunctionResult]) -> String {
    let lines: Vec<String> = results
        .iter()
        .map(|result| {
            if result.success {
                format!("✅ {}", result.message)
            } else {
                format!(
                    "❌ Function failed: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                )
            }
        })
        .collect();

    match (visible_text.is_empty(), lines.is_empty()) {
        (_, true) => visible_text.to_string(),
        (true, false) => lines.join("\n"),
        (false, false) => format!("{visible_text}\n\n{}", lines.join("\n")),
    }
}
