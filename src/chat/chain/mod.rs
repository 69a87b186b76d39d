#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{AnswerChain, ChatMessage, ChatModel, Exchange};
use crate::database::{SearchResult, VectorStore};
use crate::embeddings::Embedder;
use crate::retrieval::Retriever;

const CONDENSE_INSTRUCTIONS: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.";

const ANSWER_INSTRUCTIONS: &str = "Use the following pieces of context to answer the user's question.\n\
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Retrieval-augmented question answering over a running conversation.
///
/// Follow-up questions are first rewritten into standalone questions using the
/// history, then answered from the retrieved chunks.
pub struct ConversationalRetrievalChain<M, E, S> {
    model: M,
    retriever: Retriever<E, S>,
}

impl<M, E, S> ConversationalRetrievalChain<M, E, S>
where
    M: ChatModel,
    E: Embedder,
    S: VectorStore,
{
    #[inline]
    pub fn new(model: M, retriever: Retriever<E, S>) -> Self {
        Self { model, retriever }
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever<E, S> {
        &self.retriever
    }

    /// The question to search with: unchanged on the first turn, otherwise
    /// rewritten by the model to stand on its own
    #[inline]
    pub fn condense_question(&self, question: &str, history: &[Exchange]) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = condense_question_prompt(question, history);
        let standalone = self
            .model
            .complete(&[ChatMessage::user(prompt)])
            .context("Failed to condense follow-up question")?;
        let standalone = standalone.trim();

        debug!("Condensed follow-up question to: {}", standalone);
        if standalone.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(standalone.to_string())
        }
    }
}

#[async_trait]
impl<M, E, S> AnswerChain for ConversationalRetrievalChain<M, E, S>
where
    M: ChatModel,
    E: Embedder,
    S: VectorStore,
{
    async fn answer(&self, question: &str, history: &[Exchange]) -> Result<String> {
        let standalone = self.condense_question(question, history)?;
        let documents = self.retriever.retrieve(&standalone).await?;

        let messages = answer_messages(&standalone, &documents);
        let answer = self
            .model
            .complete(&messages)
            .context("Failed to generate answer")?;

        Ok(answer.trim().to_string())
    }
}

/// Render history as alternating `Human:` / `Assistant:` lines
#[inline]
pub fn format_history(history: &[Exchange]) -> String {
    history
        .iter()
        .map(|exchange| {
            format!(
                "Human: {}\nAssistant: {}",
                exchange.question, exchange.answer
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[inline]
pub fn condense_question_prompt(question: &str, history: &[Exchange]) -> String {
    format!(
        "{}\n\nChat History:\n{}\nFollow Up Input: {}\nStandalone question:",
        CONDENSE_INSTRUCTIONS,
        format_history(history),
        question
    )
}

/// System prompt carrying the retrieved chunks followed by the question
#[inline]
pub fn answer_messages(question: &str, documents: &[SearchResult]) -> Vec<ChatMessage> {
    let context = documents
        .iter()
        .map(|doc| doc.chunk_metadata.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    vec![
        ChatMessage::system(format!(
            "{}\n----------------\n{}",
            ANSWER_INSTRUCTIONS, context
        )),
        ChatMessage::user(question),
    ]
}
