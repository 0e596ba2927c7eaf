use anyhow::Result;
use jarvis_core::calendar::types::EventWhen;
use jarvis_core::calendar::{CalendarEvent, Task, DEFAULT_TASK_LIST};
use jarvis_core::service::factory::create_assistant;
use jarvis_core::service::Assistant;
use jarvis_core::settings::manager::SettingsManager;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use tracing::info;

use crate::commands::{parse_local_command, LocalCommand, LocalCommandResult, HELP_TEXT};
use crate::formatter::Formatter;

pub struct InteractiveApp {
    assistant: Assistant,
    assistant_name: String,
    formatter: Formatter,
}

impl InteractiveApp {
    pub fn new(settings_path: Option<PathBuf>, offline: bool) -> Result<Self> {
        let settings_manager = match settings_path {
            Some(path) => SettingsManager::from_path(path)?,
            None => SettingsManager::new()?,
        };

        let mut settings = settings_manager.settings();
        settings.apply_process_env();
        info!(path = ?settings_manager.path(), offline, "Loaded settings");

        let assistant = create_assistant(&settings, offline)?;
        let formatter = Formatter::new();

        formatter.print_system(&format!(
            "💡 {} is ready. Type /help for commands, /auth to connect Google Calendar, /quit to exit",
            settings.assistant_name
        ));

        Ok(Self {
            assistant,
            assistant_name: settings.assistant_name,
            formatter,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            let line = match rl.readline(self.formatter.prompt()) {
                Ok(line) => line,
                Err(err) => match err {
                    ReadlineError::Interrupted => {
                        continue;
                    }
                    _ => break,
                },
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            rl.add_history_entry(&line)?;

            match parse_local_command(input) {
                LocalCommandResult::Command(LocalCommand::Quit) => break,
                LocalCommandResult::Command(command) => {
                    self.run_command(command).await;
                    continue;
                }
                LocalCommandResult::Invalid { msg } => {
                    self.formatter.print_error(&msg);
                    continue;
                }
                LocalCommandResult::Unhandled => (),
            }

            let outcome = self.assistant.send(input).await;
            match &outcome.reply {
                Some(reply) => {
                    self.formatter.print_call_summary(&reply.results);
                    self.formatter
                        .print_ai(&outcome.text, &self.assistant_name, Some(&reply.usage));
                }
                None => self.formatter.print_error(&outcome.text),
            }
        }

        println!("\nGoodbye!");
        Ok(())
    }

    async fn run_command(&mut self, command: LocalCommand) {
        match command {
            LocalCommand::Help => self.formatter.print_system(HELP_TEXT),
            LocalCommand::New => {
                let session = self.assistant.conversation_mut().create_session();
                let msg = format!("Started conversation {}", session.id);
                self.formatter.print_system(&msg);
            }
            LocalCommand::Sessions => self.print_sessions(),
            LocalCommand::Switch { id } => {
                match self.assistant.conversation_mut().select(&id) {
                    Ok(session) => {
                        let msg = format!(
                            "Switched to \"{}\" ({} messages)",
                            session.title,
                            session.messages().len()
                        );
                        self.formatter.print_system(&msg);
                    }
                    Err(e) => self.formatter.print_error(&e.to_string()),
                }
            }
            LocalCommand::Auth => match self.assistant.calendar().auth_url() {
                Ok(url) => self.formatter.print_system(&format!(
                    "Open this URL, grant access, then run /code <code>:\n{url}"
                )),
                Err(e) => self.formatter.print_error(&e.to_string()),
            },
            LocalCommand::Code { code } => {
                match self.assistant.calendar().set_auth_code(&code).await {
                    Ok(()) => self
                        .formatter
                        .print_system("Google Calendar and Tasks connected"),
                    Err(e) => self.formatter.print_error(&e.to_string()),
                }
            }
            LocalCommand::Events => {
                let max_results = self.assistant.limits().max_events;
                match self.assistant.calendar().get_events(max_results).await {
                    Ok(events) if events.is_empty() => {
                        self.formatter.print_system("No upcoming events")
                    }
                    Ok(events) => {
                        let lines: Vec<String> = events.iter().map(describe_event).collect();
                        self.formatter.print_system(&lines.join("\n"));
                    }
                    Err(e) => self.formatter.print_error(&e.to_string()),
                }
            }
            LocalCommand::Tasks => {
                let max_results = self.assistant.limits().max_tasks;
                match self
                    .assistant
                    .calendar()
                    .get_tasks(DEFAULT_TASK_LIST, max_results)
                    .await
                {
                    Ok(tasks) if tasks.is_empty() => self.formatter.print_system("No open tasks"),
                    Ok(tasks) => {
                        let lines: Vec<String> = tasks.iter().map(describe_task).collect();
                        self.formatter.print_system(&lines.join("\n"));
                    }
                    Err(e) => self.formatter.print_error(&e.to_string()),
                }
            }
            LocalCommand::Memory => self.print_memory(),
            LocalCommand::Quit => {}
        }
    }

    fn print_sessions(&self) {
        let conversation = self.assistant.conversation();
        if conversation.sessions().is_empty() {
            self.formatter.print_system("No conversations yet");
            return;
        }

        let active_id = conversation.active().map(|s| s.id.as_str());
        let lines: Vec<String> = conversation
            .sessions()
            .iter()
            .map(|session| {
                let marker = if Some(session.id.as_str()) == active_id {
                    "*"
                } else {
                    " "
                };
                format!(
                    "{marker} {} {} ({} messages)",
                    session.id,
                    session.title,
                    session.messages().len()
                )
            })
            .collect();
        self.formatter.print_system(&lines.join("\n"));
    }

    fn print_memory(&self) {
        let Some(memory) = self.assistant.memory() else {
            self.formatter.print_system("Memory is disabled");
            return;
        };

        let limits = self.assistant.limits();
        let snapshot = memory.snapshot(limits.recent_facts, limits.recent_topics);
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => self.formatter.print_system(&json),
            Err(e) => self.formatter.print_error(&e.to_string()),
        }
    }
}

fn describe_event(event: &CalendarEvent) -> String {
    let when = match event.start.when() {
        Some(EventWhen::At(start)) => start.format("%a %b %-d, %-I:%M %p").to_string(),
        Some(EventWhen::AllDay(date)) => format!("{} (all day)", date.format("%a %b %-d")),
        None => "unscheduled".to_string(),
    };
    format!("- {when}: {}", event.summary)
}

fn describe_task(task: &Task) -> String {
    match task.due {
        Some(due) => format!("- {} (due {}) [{}]", task.title, due.format("%Y-%m-%d"), task.id),
        None => format!("- {} [{}]", task.title, task.id),
    }
}
