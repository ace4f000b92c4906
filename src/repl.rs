//! Interactive question loop
//!
//! Every question in a session goes through the same [`ChatClient`], so
//! they share its thread id and token cache.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::client::ChatClient;
use crate::error::Error;
use crate::{ui, Result};

/// Ask one question, giving up after `timeout`
///
/// Dropping the timed-out future also drops its connection.
pub async fn ask_with_timeout(client: &ChatClient, question: &str, timeout: Duration) -> Result<String> {
    match tokio::time::timeout(timeout, client.get_answer(question)).await {
        Ok(answer) => answer,
        Err(_) => {
            tracing::warn!("No answer within {:?}", timeout);
            Err(Error::Timeout(timeout))
        }
    }
}

/// Interactive session over one client
pub struct Repl {
    client: ChatClient,
    timeout: Duration,
    asked: usize,
}

impl Repl {
    pub fn new(client: ChatClient, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            asked: 0,
        }
    }

    /// Ask a single question with a spinner while waiting
    pub async fn run_once(&mut self, question: &str) -> Result<String> {
        let spinner = ui::thinking_spinner("Thinking");
        let result = ask_with_timeout(&self.client, question, self.timeout).await;
        spinner.finish_and_clear();

        self.asked += 1;
        result
    }

    /// Run the read-ask-print loop until EOF or an exit command
    pub async fn run_interactive(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("\n\x1b[1;34mYou\x1b[0m: ");
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                // EOF
                break;
            }

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if is_exit_command(input) {
                println!("👋 Bye!");
                break;
            }

            match self.run_once(input).await {
                Ok(answer) => println!("\n\x1b[1;32mGPT\x1b[0m: {}", answer),
                Err(e) => {
                    ui::print_error(&e.to_string());
                    if let Some(details) = e.details() {
                        eprintln!("{}", details);
                    }
                    if e.is_unauthorized() {
                        return Err(e);
                    }
                }
            }
        }

        tracing::debug!("Session ended after {} questions", self.asked);
        Ok(())
    }

    pub fn asked(&self) -> usize {
        self.asked
    }
}

fn is_exit_command(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q")
}
