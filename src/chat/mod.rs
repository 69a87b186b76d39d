// Chat module
// Conversation state, the chat model seam and the interactive question loop

pub mod chain;
pub mod input;


use std::future::Future;
use std::io::Write;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use chain::ConversationalRetrievalChain;
pub use input::{ChannelLines, LineSource};

/// Inputs that end the session, compared case-insensitively
pub const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", ":q"];

pub const BANNER: &str = "Chat with your notes! (type 'exit' to quit)";
pub const PROMPT: &str = "You: ";
pub const GOODBYE: &str = "Goodbye!";
pub const FAREWELL: &str = "Bye!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message sent to a chat model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generates a reply for a list of messages
pub trait ChatModel: Send + Sync {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

/// Answers a question given the conversation so far
#[async_trait]
pub trait AnswerChain: Send + Sync {
    async fn answer(&self, question: &str, history: &[Exchange]) -> Result<String>;
}

/// Result of a single chat turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered(String),
    Failed(String),
}

/// Classified line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Empty,
    Exit,
    Query(String),
}

#[inline]
pub fn classify_input(line: &str) -> UserInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        UserInput::Empty
    } else if EXIT_COMMANDS
        .iter()
        .any(|command| trimmed.eq_ignore_ascii_case(command))
    {
        UserInput::Exit
    } else {
        UserInput::Query(trimmed.to_string())
    }
}

/// In-memory conversation history for one chat session.
///
/// History only grows, and only through successful turns.
#[derive(Debug, Default, Clone)]
pub struct ChatSession {
    history: Vec<Exchange>,
}

impl ChatSession {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    #[inline]
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.history.push(Exchange {
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// Ask `chain` the question with the current history. The exchange is
    /// recorded only when an answer comes back.
    #[inline]
    pub async fn process_turn<C>(&mut self, chain: &C, question: &str) -> TurnOutcome
    where
        C: AnswerChain + ?Sized,
    {
        match chain.answer(question, &self.history).await {
            Ok(answer) => {
                self.record(question, answer.as_str());
                debug!("Recorded exchange {}", self.history.len());
                TurnOutcome::Answered(answer)
            }
            Err(e) => {
                warn!("Chat turn failed: {:#}", e);
                TurnOutcome::Failed(format!("{:#}", e))
            }
        }
    }
}

/// Run the interactive loop until an exit command or end of input, returning
/// the finished session.
#[inline]
pub async fn run_chat_loop<C, L, W>(chain: &C, lines: &mut L, out: &mut W) -> Result<ChatSession>
where
    C: AnswerChain + ?Sized,
    L: LineSource + ?Sized,
    W: Write,
{
    let mut session = ChatSession::new();
    writeln!(out, "{}", BANNER)?;

    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            writeln!(out, "{}", FAREWELL)?;
            break;
        };

        match classify_input(&line) {
            UserInput::Empty => {}
            UserInput::Exit => {
                writeln!(out, "{}", GOODBYE)?;
                break;
            }
            UserInput::Query(question) => match session.process_turn(chain, &question).await {
                TurnOutcome::Answered(answer) => writeln!(out, "Bot: {}", answer)?,
                TurnOutcome::Failed(message) => writeln!(out, "[Error] {}", message)?,
            },
        }
    }

    info!("Chat session ended after {} exchange(s)", session.len());
    Ok(session)
}

/// How a chat session ended
#[derive(Debug)]
pub enum SessionEnd {
    /// Exit command or end of input
    Finished(ChatSession),
    /// `interrupt` resolved first
    Interrupted,
}

/// Run the chat loop on its own task until it finishes or `interrupt`
/// resolves.
///
/// The interrupt is observed even while a turn is blocked on a model call or
/// the input is waiting for a line; the loop task is aborted in that case.
#[inline]
pub async fn run_until_interrupted<C, L, W, I>(
    chain: C,
    mut lines: L,
    mut out: W,
    interrupt: I,
) -> Result<SessionEnd>
where
    C: AnswerChain + 'static,
    L: LineSource + 'static,
    W: Write + Send + 'static,
    I: Future<Output = ()>,
{
    let mut session =
        tokio::spawn(async move { run_chat_loop(&chain, &mut lines, &mut out).await });

    tokio::select! {
        joined = &mut session => {
            let session = joined.context("Chat task failed")??;
            Ok(SessionEnd::Finished(session))
        }
        () = interrupt => {
            session.abort();
            info!("Chat session interrupted");
            Ok(SessionEnd::Interrupted)
        }
    }
}
