use jarvis_core::ai::TokenUsage;
use jarvis_core::chat::FunctionResult;

#[derive(Clone)]
pub struct Formatter {
    use_colors: bool,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn print_system(&self, msg: &str) {
        if self.use_colors {
            println!("\x1b[33m[System]\x1b[0m {msg}");
        } else {
            println!("[System] {msg}");
        }
    }

    pub fn print_ai(&self, msg: &str, name: &str, usage: Option<&TokenUsage>) {
        let usage_text = usage
            .map(|usage| format!(" (usage: {}/{})", usage.input_tokens, usage.output_tokens))
            .unwrap_or_default();

        if self.use_colors {
            println!("\x1b[32m[{name}]\x1b[0m\x1b[90m{usage_text}\x1b[0m {msg}");
        } else {
            println!("[{name}]{usage_text} {msg}");
        }
    }

    pub fn print_error(&self, msg: &str) {
        if self.use_colors {
            eprintln!("\x1b[31m[Error]\x1b[0m {msg}");
        } else {
            eprintln!("[Error] {msg}");
        }
    }

    pub fn prompt(&self) -> &'static str {
        if self.use_colors {
            "\x1b[35m>\x1b[0m "
        } else {
            "> "
        }
    }

    pub fn print_call_summary(&self, results: &[FunctionResult]) {
        if results.is_empty() {
            return;
        }
        let count = results.len();
        let call_text = if count == 1 { "call" } else { "calls" };
        let names = results
            .iter()
            .map(|r| r.function.as_str())
            .collect::<Vec<&str>>()
            .join(", ");
        self.print_system(&format!("🔧 {count} function {call_text}: {names}"));
    }
}
