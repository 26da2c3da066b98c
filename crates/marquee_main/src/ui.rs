use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use marquee_api::API;
use marquee_domain::{Environment, SessionId, StoreConfig, TurnResponse};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::{Cli, Command};

const PROMPT: &str = "marquee> ";

pub struct UI<A> {
    api: Arc<A>,
    cli: Cli,
    session: Option<SessionId>,
}

impl<A: API> UI<A> {
    pub fn new(cli: Cli, api: Arc<A>) -> Self {
        let session = cli.session();
        Self { api, cli, session }
    }

    pub async fn run(&mut self) -> Result<()> {
        if let Some(prompt) = self.cli.prompt.clone() {
            if let Err(e) = self.ask(&prompt).await {
                report(&e);
                std::process::exit(1);
            }
            return Ok(());
        }

        let mut editor = DefaultEditor::new()?;
        println!("{}", "Ask about movies. Commands: /new, /info, /exit".dimmed());

        loop {
            let line = match tokio::task::block_in_place(|| editor.readline(PROMPT)) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };

            match Command::parse(&line) {
                Command::Empty => continue,
                Command::Exit => break,
                Command::New => {
                    let session = SessionId::generate();
                    println!("{} {}", "New session".green(), session.as_str().dimmed());
                    self.session = Some(session);
                }
                Command::Info => println!("{}", info(self.api.environment(), self.session.as_ref())),
                Command::Message(question) => {
                    editor.add_history_entry(question.as_str())?;
                    if let Err(e) = self.ask(&question).await {
                        report(&e);
                    }
                }
            }
        }
        Ok(())
    }

    async fn ask(&self, question: &str) -> Result<()> {
        let response = self.api.ask(self.session.clone(), question).await?;
        println!("{}", format_response(&response, self.cli.json)?);
        Ok(())
    }
}

fn report(error: &anyhow::Error) {
    eprintln!("{} {error:#}", "could not process:".red().bold());
}

fn format_response(response: &TurnResponse, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string(response)?);
    }
    let mut output = response.answer.clone();
    if response.has_chart() {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&format!("{}\n{}", "chart".cyan().bold(), response.chart));
    }
    Ok(output)
}

fn info(environment: &Environment, session: Option<&SessionId>) -> String {
    let store = match &environment.store {
        StoreConfig::Dataset(path) => path.display().to_string(),
        StoreConfig::Empty => "empty".to_string(),
        StoreConfig::Mongo { database, .. } => format!("mongodb ({database})"),
    };
    let session = session.cloned().unwrap_or_default();
    [
        ("model", environment.model.as_str().to_string()),
        ("router model", environment.router_model.as_str().to_string()),
        ("store", store),
        ("result limit", environment.result_limit.to_string()),
        ("session", session.as_str().to_string()),
    ]
    .into_iter()
    .map(|(key, value)| format!("{} {value}", format!("{key}:").bold()))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
    use marquee_domain::ChartArtifact;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_json_response() {
        let fixture = TurnResponse::new("Heat (1995)", ChartArtifact::empty());
        let actual = format_response(&fixture, true).unwrap();
        let expected = r#"{"answer":"Heat (1995)","chart":""}"#;
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_text_response_with_chart() {
        colored::control::set_override(false);
        let fixture = TurnResponse::new("", ChartArtifact::from_figure(&json!({"data": []})));
        let actual = format_response(&fixture, false).unwrap();
        let expected = "chart\n{\"data\":[]}";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_info_lists_configuration() {
        colored::control::set_override(false);
        let actual = info(&Environment::default(), None);
        assert!(actual.contains("model: gpt-4o\n"));
        assert!(actual.contains("store: empty"));
        assert!(actual.contains("session: movie-session"));
    }
}
