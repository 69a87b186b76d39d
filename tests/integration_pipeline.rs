#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! End-to-end ingest and chat against a mocked OpenAI-compatible API
use std::fs;
use std::time::Duration;

use notes_rag::RagError;
use notes_rag::chat::{ConversationalRetrievalChain, GOODBYE, run_chat_loop};
use notes_rag::config::Config;
use notes_rag::database::{LanceVectorStore, VectorStore};
use notes_rag::ingest::Ingestor;
use notes_rag::openai::OpenAiClient;
use notes_rag::retrieval::Retriever;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const VOCABULARY: [&str; 4] = ["tea", "rust", "garden", "bread"];

fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    VOCABULARY
        .iter()
        .map(|word| lower.matches(word).count() as f32 + 0.01)
        .collect()
}

/// Embeds each input by counting vocabulary words
struct KeywordEmbeddings;

impl Respond for KeywordEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = request.body_json::<Value>() else {
            return ResponseTemplate::new(400);
        };
        let data: Vec<Value> = body["input"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(index, input)| {
                json!({
                    "object": "embedding",
                    "index": index,
                    "embedding": keyword_vector(input.as_str().unwrap_or_default()),
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({"object": "list", "data": data}))
    }
}

/// Rewrites follow-ups to a fixed tea question and answers by echoing the
/// retrieved context
struct EchoChat;

impl Respond for EchoChat {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = request.body_json::<Value>() else {
            return ResponseTemplate::new(400);
        };
        let first = &body["messages"][0];
        let reply = if first["role"] == "system" {
            let context = first["content"]
                .as_str()
                .and_then(|content| content.split("----------------\n").nth(1))
                .unwrap_or_default();
            format!("From your notes: {}", context.replace('\n', " "))
        } else {
            "How long should green tea steep?".to_string()
        };
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": reply}}],
        }))
    }
}

async fn mock_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(KeywordEmbeddings)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(EchoChat)
        .mount(&server)
        .await;
    server
}

fn test_config(base: &TempDir, server: &MockServer) -> Config {
    let mut config = Config::with_base_dir(base.path());
    config.openai.base_url = format!("{}/v1", server.uri());
    config.openai.batch_size = 2;
    config.retrieval.top_k = 1;
    config
}

fn client(config: &Config) -> OpenAiClient {
    OpenAiClient::new(&config.openai, "sk-test".to_string())
        .expect("client should build")
        .with_timeout(Duration::from_secs(5))
}

fn write_notes(base: &TempDir) {
    let data = base.path().join("data");
    fs::create_dir_all(&data).expect("create data dir");
    fs::write(
        data.join("tea.txt"),
        "Green tea steeps for two minutes at 80 degrees. Tea leaves can be reused.",
    )
    .expect("write tea note");
    fs::write(
        data.join("rust.txt"),
        "Rust ownership: each value has one owner. Rust borrowing lends references.",
    )
    .expect("write rust note");
    fs::write(
        data.join("garden.TXT"),
        "Garden plan: tomatoes by the fence, herbs near the garden door.",
    )
    .expect("write garden note");
    fs::write(data.join("ignored.md"), "# bread recipe").expect("write markdown");
}

async fn chat_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == "/v1/chat/completions")
        .count()
}

#[tokio::test(flavor = "multi_thread")]
async fn ingest_then_chat() {
    let server = mock_api().await;
    let base = TempDir::new().expect("should create temp dir");
    write_notes(&base);
    let config = test_config(&base, &server);

    let stats = Ingestor::with_client(config.clone(), client(&config))
        .expect("ingestor should build")
        .run()
        .await
        .expect("ingest should succeed");
    assert_eq!(stats.files, 3);
    assert_eq!(stats.chunks, 3);
    assert_eq!(stats.stored, 3);

    let store = LanceVectorStore::open(&config.vector_database_path())
        .await
        .expect("store should reopen");
    assert_eq!(store.count().await.expect("count"), 3);

    let chat_client = client(&config);
    let retriever = Retriever::new(chat_client.clone(), store, config.retrieval.top_k);
    let chain = ConversationalRetrievalChain::new(chat_client, retriever);

    let script = "Where do the tomatoes go in the garden?\nAnd the tea?\nexit\n";
    let mut lines = BufReader::new(script.as_bytes()).lines();
    let mut out = Vec::new();
    let session = run_chat_loop(&chain, &mut lines, &mut out)
        .await
        .expect("chat loop should finish");
    let output = String::from_utf8(out).expect("utf8 output");

    assert_eq!(session.len(), 2);
    assert!(output.contains("Bot: From your notes: Garden plan"));
    assert!(output.contains("Bot: From your notes: Green tea steeps"));
    assert!(output.trim_end().ends_with(GOODBYE));

    // one answer for the first turn, condense plus answer for the second
    assert_eq!(chat_requests(&server).await, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_ingest_only_grows_the_store() {
    let server = mock_api().await;
    let base = TempDir::new().expect("should create temp dir");
    write_notes(&base);
    let config = test_config(&base, &server);
    let ingestor =
        Ingestor::with_client(config.clone(), client(&config)).expect("ingestor should build");

    let first = ingestor.run().await.expect("first ingest");
    let second = ingestor.run().await.expect("second ingest");

    assert_eq!(first.chunks, second.chunks);
    assert_eq!(first.stored, 3);
    assert_eq!(second.stored, 6);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_data_directory_fails_without_api_calls() {
    let server = mock_api().await;
    let base = TempDir::new().expect("should create temp dir");
    fs::create_dir_all(base.path().join("data")).expect("create data dir");
    let config = test_config(&base, &server);

    let result = Ingestor::with_client(config.clone(), client(&config))
        .expect("ingestor should build")
        .run()
        .await;

    let error = result.expect_err("empty directory should fail");
    assert!(matches!(error, RagError::NoDocuments { .. }));
    assert!(error.to_string().contains("Add notes and try again"));
    assert!(!config.vector_database_path().exists());
    assert!(
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_survives_api_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"message": "The server is overloaded"}
        })))
        .mount(&server)
        .await;

    let base = TempDir::new().expect("should create temp dir");
    let config = test_config(&base, &server);
    let store = LanceVectorStore::open(&config.vector_database_path())
        .await
        .expect("store should open");

    let chat_client = client(&config);
    let retriever = Retriever::new(chat_client.clone(), store, 1);
    let chain = ConversationalRetrievalChain::new(chat_client, retriever);

    let mut lines = BufReader::new("first\nsecond\nquit\n".as_bytes()).lines();
    let mut out = Vec::new();
    let session = run_chat_loop(&chain, &mut lines, &mut out)
        .await
        .expect("chat loop should finish");
    let output = String::from_utf8(out).expect("utf8 output");

    assert!(session.is_empty());
    assert_eq!(output.matches("[Error]").count(), 2);
    assert!(output.contains("The server is overloaded"));
    assert!(output.contains(GOODBYE));
}
