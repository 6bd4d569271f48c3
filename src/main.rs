//! symptom-flow - terminal client for the symptom assessment service
//!
//! Usage: `symptom-flow <topic>`; answers are read from stdin.

use std::io::Write;
use symptom_flow::flow::{AssessmentController, Effect, FlowError};
use symptom_flow::notice::NoticeBoard;
use symptom_flow::service::{Question, ServiceClient, ServiceConfig};
use symptom_flow::session::{self, MemorySessionStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Controller = AssessmentController<ServiceClient>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "symptom_flow=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ServiceConfig::from_env();
    tracing::info!(base_url = %config.base_url, max_attempts = config.retry.max_attempts, "Starting");
    let client = ServiceClient::from_config(&config)?;

    match client.health().await {
        Ok(report) if report.is_ok() => {
            tracing::info!(message = %report.message, version = ?report.version, "Service healthy");
        }
        Ok(report) => tracing::warn!(message = %report.message, "Service reports an error"),
        Err(e) if !e.is_retryable() => {
            let mut board = NoticeBoard::new(config.notice_dismiss_after);
            board.show(&e);
            print_notice(&board);
            return Err(e.into());
        }
        Err(e) => tracing::warn!(error = %e, "Health check failed, continuing"),
    }

    let store = MemorySessionStore::new();
    let session = session::get_or_create(&store);
    let mut flow = AssessmentController::new(client, session)
        .with_notices(NoticeBoard::new(config.notice_dismiss_after));

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut topic = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if topic.trim().is_empty() {
        prompt("What symptom would you like to assess? ")?;
        topic = match input.next_line().await? {
            Some(line) => line,
            None => return Ok(()),
        };
    }

    let mut outcome = flow.start(&topic).await;
    loop {
        match outcome {
            Ok(effects) => render(&effects),
            Err(FlowError::Transport(e)) => {
                print_notice_of(&flow);
                if !e.is_retryable() {
                    return Err(e.into());
                }
                prompt("Retry? [Y/n] ")?;
                let answer = input.next_line().await?.unwrap_or_default();
                if answer.trim().eq_ignore_ascii_case("n") {
                    return Err(e.into());
                }
                if let Some(board) = flow.notices_mut() {
                    board.interact();
                }
                outcome = flow.retry().await;
                continue;
            }
            Err(e @ FlowError::Rejected(_)) if flow.state().is_idle() => return Err(e.into()),
            Err(e) => println!("  {e}"),
        }

        if flow.state().is_complete() {
            return Ok(());
        }
        let Some(question) = flow.state().current_question().cloned() else {
            return Ok(());
        };

        render_question(&flow, &question)?;
        let Some(line) = input.next_line().await? else {
            return Ok(());
        };
        outcome = respond(&mut flow, &question, line.trim()).await;
    }
}

async fn respond(flow: &mut Controller, question: &Question, line: &str) -> Result<Vec<Effect>, FlowError> {
    if question.is_free_text() {
        return flow.answer_text(line).await;
    }
    if question.is_multiple() && line.is_empty() {
        return flow.submit().await;
    }
    match pick(question, line) {
        Some(option) => flow.select(&option).await,
        None => {
            println!("  Enter a number between 1 and {}", question.options.len());
            Ok(vec![])
        }
    }
}

/// Option chosen by 1-based number or by exact text
fn pick(question: &Question, line: &str) -> Option<String> {
    if let Ok(n) = line.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| question.options.get(i))
            .cloned();
    }
    question
        .options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(line))
        .cloned()
}

fn render(effects: &[Effect]) {
    for effect in effects {
        match effect {
            Effect::PresentQuestion {
                message: Some(message),
                ..
            } => println!("\n{message}"),
            Effect::PresentResult {
                formatted_response,
                ..
            } => println!("\n{formatted_response}"),
            Effect::PresentEmergency { message } => {
                println!("\n!!! {message}");
            }
            _ => {}
        }
    }
}

fn render_question(flow: &Controller, question: &Question) -> std::io::Result<()> {
    if let Some(progress) = flow.state().stage.progress() {
        if progress.total > 0 {
            println!("\n[{}/{} - {}%]", progress.current, progress.total, progress.percentage);
        }
    }
    println!("{}", question.prompt);
    if let Some(reason) = &question.reason {
        println!("  ({reason})");
    }

    for (i, option) in question.options.iter().enumerate() {
        let mark = match flow.draft() {
            Some(draft) if draft.contains(option) => "[x] ",
            Some(_) => "[ ] ",
            None => "",
        };
        println!("  {}. {mark}{option}", i + 1);
    }

    if question.is_multiple() && !question.is_free_text() {
        let hint = if flow.can_submit() {
            "toggle a number, empty line submits"
        } else {
            "toggle a number"
        };
        prompt(&format!("({hint}) > "))
    } else {
        prompt("> ")
    }
}

fn print_notice_of(flow: &Controller) {
    if let Some(board) = flow.notices() {
        print_notice(board);
    }
}

fn print_notice(board: &NoticeBoard) {
    let Some(notice) = board.current() else {
        return;
    };
    eprintln!("\n{}", notice.message);
    eprintln!("  detail: {}", notice.detail);
    if let Some(remediation) = notice.remediation {
        eprintln!("  {remediation}");
    }
}

fn prompt(text: &str) -> std::io::Result<()> {
    write_prompt(&mut std::io::stdout(), text)
}

fn write_prompt(out: &mut impl Write, text: &str) -> std::io::Result<()> {
    write!(out, "{text}")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts writes but fails every flush
    struct BrokenPipe(Vec<u8>);

    impl Write for BrokenPipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_prompt_reports_flush_failure() {
        let mut out = BrokenPipe(Vec::new());
        let err = write_prompt(&mut out, "> ").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
        assert_eq!(out.0, b"> ");
    }

    #[test]
    fn test_prompt_writes_text() {
        let mut out = Vec::new();
        write_prompt(&mut out, "Retry? [Y/n] ").unwrap();
        assert_eq!(out, b"Retry? [Y/n] ");
    }
}
