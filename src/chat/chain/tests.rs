use super::*;
use crate::chat::Role;
use crate::database::{EmbeddingRecord, InMemoryVectorStore};
use crate::embeddings::Chunk;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

const VOCABULARY: [&str; 3] = ["rust", "tea", "garden"];

struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f32 + 0.01)
            .collect())
    }
}

/// Replies from a script and remembers every request
#[derive(Default)]
struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    fn with_replies(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
        }
    }

    fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().expect("lock").clone()
    }
}

impl ChatModel for &ScriptedModel {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.requests.lock().expect("lock").push(messages.to_vec());
        let reply = self.replies.lock().expect("lock").pop_front();
        match reply {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no scripted reply left")),
        }
    }
}

async fn notes_store() -> InMemoryVectorStore {
    let mut store = InMemoryVectorStore::new();
    let records = ["Rust uses ownership to manage memory.", "Brew green tea at 80C."]
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let chunk = Chunk {
                content: (*text).to_string(),
                source: PathBuf::from("data/notes.txt"),
                page: None,
                char_offset: 0,
                chunk_index: i,
            };
            let vector = KeywordEmbedder.embed(text).expect("embedding");
            EmbeddingRecord::from_chunk(&chunk, vector)
        })
        .collect();
    store.add(records).await.expect("should add");
    store
}

async fn chain_with(
    model: &ScriptedModel,
) -> ConversationalRetrievalChain<&ScriptedModel, KeywordEmbedder, InMemoryVectorStore> {
    let retriever = Retriever::new(KeywordEmbedder, notes_store().await, 1);
    ConversationalRetrievalChain::new(model, retriever)
}

#[tokio::test]
async fn first_turn_answers_without_condensing() {
    let model = ScriptedModel::with_replies(vec![Ok("  Through ownership.  ".to_string())]);
    let chain = chain_with(&model).await;

    let answer = chain
        .answer("How does Rust manage memory?", &[])
        .await
        .expect("should answer");
    assert_eq!(answer, "Through ownership.");

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert!(
        messages[0]
            .content
            .contains("Rust uses ownership to manage memory.")
    );
    assert!(!messages[0].content.contains("green tea"));
    assert_eq!(messages[1], ChatMessage::user("How does Rust manage memory?"));
}

#[tokio::test]
async fn follow_up_is_condensed_before_retrieval() {
    let model = ScriptedModel::with_replies(vec![
        Ok("How hot should the water be for tea?".to_string()),
        Ok("About 80C.".to_string()),
    ]);
    let chain = chain_with(&model).await;
    let history = vec![Exchange {
        question: "What do my notes say about tea?".to_string(),
        answer: "They cover green tea.".to_string(),
    }];

    let answer = chain
        .answer("How hot should it be?", &history)
        .await
        .expect("should answer");
    assert_eq!(answer, "About 80C.");

    let requests = model.requests();
    assert_eq!(requests.len(), 2);

    let condense_prompt = &requests[0][0].content;
    assert!(condense_prompt.contains(
        "Human: What do my notes say about tea?\nAssistant: They cover green tea."
    ));
    assert!(condense_prompt.contains("Follow Up Input: How hot should it be?"));

    let answer_messages = &requests[1];
    assert!(answer_messages[0].content.contains("Brew green tea at 80C."));
    assert_eq!(
        answer_messages[1],
        ChatMessage::user("How hot should the water be for tea?")
    );
}

#[tokio::test]
async fn blank_condensed_question_falls_back_to_original() {
    let model = ScriptedModel::with_replies(vec![Ok("   ".to_string())]);
    let chain = chain_with(&model).await;
    let history = vec![Exchange {
        question: "q".to_string(),
        answer: "a".to_string(),
    }];

    let standalone = chain
        .condense_question("Tell me about rust", &history)
        .expect("should condense");
    assert_eq!(standalone, "Tell me about rust");
}

#[tokio::test]
async fn model_failure_propagates() {
    let model = ScriptedModel::with_replies(vec![Err("rate limited".to_string())]);
    let chain = chain_with(&model).await;

    let error = chain
        .answer("How does Rust manage memory?", &[])
        .await
        .expect_err("should fail");
    assert!(format!("{:#}", error).contains("rate limited"));
}

#[test]
fn history_formatting() {
    assert_eq!(format_history(&[]), "");

    let history = vec![
        Exchange {
            question: "first?".to_string(),
            answer: "one".to_string(),
        },
        Exchange {
            question: "second?".to_string(),
            answer: "two".to_string(),
        },
    ];
    assert_eq!(
        format_history(&history),
        "Human: first?\nAssistant: one\nHuman: second?\nAssistant: two"
    );
}

#[test]
fn answer_messages_join_context() {
    let documents: Vec<SearchResult> = ["first chunk", "second chunk"]
        .iter()
        .map(|content| SearchResult {
            chunk_metadata: crate::database::ChunkMetadata {
                source: "data/a.txt".to_string(),
                page: None,
                chunk_index: 0,
                char_offset: 0,
                content: (*content).to_string(),
                created_at: String::new(),
            },
            similarity_score: 1.0,
            distance: 0.0,
        })
        .collect();

    let messages = answer_messages("question?", &documents);
    assert!(messages[0].content.ends_with("first chunk\n\nsecond chunk"));
    assert_eq!(messages[1].content, "question?");
}
