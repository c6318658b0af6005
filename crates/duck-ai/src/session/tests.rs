use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::client::{ChatReply, ChatTransport, ReplyBody};
use crate::conversation::ChatPayload;
use crate::streaming::text_lines;
use crate::token_log::Token;
use crate::{DuckError, Message, ModelType, Role};

enum Scripted {
    Reply {
        status: u16,
        token: Option<&'static str>,
        body: String,
    },
    Fail(DuckError),
}

#[derive(Default)]
struct ScriptedTransport {
    handshakes: Mutex<VecDeque<Result<Token, DuckError>>>,
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<(ChatPayload, Token, bool)>>,
    handshake_count: AtomicUsize,
}

impl ScriptedTransport {
    fn new() -> Self {
        Self::default()
    }

    fn handshake(&self, token: &str) -> &Self {
        self.handshakes
            .lock()
            .unwrap()
            .push_back(Ok(Token::new(token)));
        self
    }

    fn reply(&self, status: u16, token: &'static str, body: impl Into<String>) -> &Self {
        self.replies.lock().unwrap().push_back(Scripted::Reply {
            status,
            token: Some(token),
            body: body.into(),
        });
        self
    }

    /// A successful reply that does not rotate the token.
    fn reply_unrotated(&self, status: u16, body: impl Into<String>) -> &Self {
        self.replies.lock().unwrap().push_back(Scripted::Reply {
            status,
            token: None,
            body: body.into(),
        });
        self
    }

    fn fail(&self, error: DuckError) -> &Self {
        self.replies.lock().unwrap().push_back(Scripted::Fail(error));
        self
    }

    fn requests(&self) -> Vec<(ChatPayload, Token, bool)> {
        self.requests.lock().unwrap().clone()
    }

    fn handshake_count(&self) -> usize {
        self.handshake_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn fetch_token(&self) -> Result<Token, DuckError> {
        self.handshake_count.fetch_add(1, Ordering::SeqCst);
        self.handshakes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DuckError::TransportError("no handshake scripted".into())))
    }

    async fn submit(
        &self,
        payload: &ChatPayload,
        token: &Token,
        stream: bool,
    ) -> Result<ChatReply, DuckError> {
        self.requests
            .lock()
            .unwrap()
            .push((payload.clone(), token.clone(), stream));
        let scripted = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted chat request");
        match scripted {
            Scripted::Fail(e) => Err(e),
            Scripted::Reply {
                status,
                token,
                body,
            } => Ok(ChatReply {
                status,
                token: token.map(Token::new),
                body: if stream {
                    ReplyBody::Stream(text_lines(&body))
                } else {
                    ReplyBody::Batch(body)
                },
            }),
        }
    }
}

fn events(fragments: &[&str]) -> String {
    let mut body: String = fragments
        .iter()
        .map(|f| format!("data: {}\n\n", serde_json::json!({ "message": f })))
        .collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn session(transport: &Arc<ScriptedTransport>) -> Session {
    Session::new(transport.clone(), ModelType::Mistral)
}

fn tokens(session: &Session) -> Vec<&str> {
    session.tokens().live().iter().map(Token::as_str).collect()
}

fn contents(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.content.as_str()).collect()
}

/// A session with `answers.len()` completed pairs: prompts `q1..`, answers
/// as given, tokens `t0..tN`.
async fn seeded(answers: &[&str]) -> (Arc<ScriptedTransport>, Session) {
    const TOKENS: [&str; 4] = ["t1", "t2", "t3", "t4"];
    let transport = Arc::new(ScriptedTransport::new());
    transport.handshake("t0");
    for (i, &answer) in answers.iter().enumerate() {
        transport.reply(200, TOKENS[i], events(&[answer]));
    }
    let mut session = session(&transport);
    for i in 0..answers.len() {
        session.ask(format!("q{}", i + 1)).await.unwrap();
    }
    (transport, session)
}

#[tokio::test]
async fn ask_handshakes_then_records_answer_and_token() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .handshake("t0")
        .reply(200, "t1", events(&["Hel", "lo"]));
    let mut session = session(&transport);

    let answer = session.ask("hi").await.unwrap();

    assert_eq!(answer, "Hello");
    assert_eq!(session.messages(), &[Message::user("hi"), Message::assistant("Hello")]);
    assert_eq!(tokens(&session), ["t0", "t1"]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let (payload, token, stream) = &requests[0];
    assert_eq!(token.as_str(), "t0");
    assert!(!stream);
    assert_eq!(payload.model, ModelType::Mistral.id());
    assert_eq!(payload.messages, vec![Message::user("hi")]);
}

#[tokio::test]
async fn each_turn_replays_transcript_with_latest_token() {
    let (transport, mut session) = seeded(&["one"]).await;
    transport.reply(200, "t2", events(&["two"]));

    session.ask("q2").await.unwrap();

    let requests = transport.requests();
    let (payload, token, _) = &requests[1];
    assert_eq!(token.as_str(), "t1");
    assert_eq!(contents(&payload.messages), ["q1", "one", "q2"]);
    assert_eq!(session.turn_count(), 2);
    assert_eq!(transport.handshake_count(), 1);
}

#[tokio::test]
async fn failed_ask_leaves_transcript_untouched() {
    let (transport, mut session) = seeded(&["one"]).await;
    transport.fail(DuckError::TransportError("reset".into()));

    let err = session.ask("q2").await.unwrap_err();

    assert!(matches!(err, DuckError::TransportError(_)));
    assert_eq!(contents(session.messages()), ["q1", "one"]);
    assert_eq!(tokens(&session), ["t0", "t1"]);
}

#[tokio::test]
async fn failed_handshake_leaves_session_empty() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut session = session(&transport);

    assert!(session.ask("hi").await.is_err());
    assert!(session.messages().is_empty());
    assert!(!session.has_token());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn conversation_limit_is_raised_without_mutation() {
    let body = "data: {\"message\":\"par\"}\n\n\
                data: {\"action\":\"error\",\"status\":429,\"type\":\"ERR_CONVERSATION_LIMIT\"}\n\n";
    let (transport, mut session) = seeded(&["one"]).await;
    transport.reply(429, "t2", body);

    let err = session.ask("q2").await.unwrap_err();

    assert!(matches!(err, DuckError::ConversationLimitExceeded(_)));
    assert_eq!(contents(session.messages()), ["q1", "one"]);
    // The rotated token is kept in place of the one it replaced.
    assert_eq!(tokens(&session), ["t0", "t2"]);
}

#[tokio::test]
async fn bare_http_errors_are_classified_by_status() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .handshake("t0")
        .reply(429, "t1", "Too Many Requests")
        .reply(500, "t2", "upstream exploded");
    let mut session = session(&transport);

    assert!(matches!(
        session.ask("a").await,
        Err(DuckError::RateLimited(body)) if body == "Too Many Requests"
    ));
    assert!(matches!(
        session.ask("b").await,
        Err(DuckError::ProtocolError(msg)) if msg == "HTTP 500: upstream exploded"
    ));
    assert!(session.messages().is_empty());
    assert_eq!(transport.requests()[1].1.as_str(), "t1");
}

#[tokio::test]
async fn malformed_body_is_reported_with_raw_text() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .handshake("t0")
        .reply(200, "t1", "<html>captcha</html>");
    let mut session = session(&transport);

    match session.ask("hi").await {
        Err(DuckError::MalformedResponse { body, .. }) => assert_eq!(body, "<html>captcha</html>"),
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
    assert!(session.messages().is_empty());
}

#[tokio::test]
async fn retry_zero_on_single_turn_starts_over() {
    let (transport, mut session) = seeded(&["one"]).await;
    transport
        .handshake("fresh")
        .reply(200, "t1b", events(&["again"]));

    let answer = session.retry(0).await.unwrap();

    assert_eq!(answer, "again");
    assert_eq!(transport.handshake_count(), 2);
    let requests = transport.requests();
    let (payload, token, _) = requests.last().unwrap();
    assert_eq!(token.as_str(), "fresh");
    assert_eq!(payload.messages, vec![Message::user("q1")]);
    assert_eq!(contents(session.messages()), ["q1", "again"]);
    assert_eq!(tokens(&session), ["fresh", "t1b"]);
}

#[tokio::test]
async fn failed_refresh_on_retry_zero_changes_nothing() {
    let (transport, mut session) = seeded(&["one", "two"]).await;

    assert!(session.retry(0).await.is_err());
    assert_eq!(transport.handshake_count(), 2);
    assert_eq!(contents(session.messages()), ["q1", "one", "q2", "two"]);
    assert_eq!(tokens(&session), ["t0", "t1", "t2"]);
}

#[tokio::test]
async fn retry_rewinds_tokens_with_transcript() {
    let (transport, mut session) = seeded(&["one", "two", "three"]).await;
    transport.reply(200, "t2b", events(&["TWO"]));

    let answer = session.retry(2).await.unwrap();

    assert_eq!(answer, "TWO");
    let requests = transport.requests();
    let (payload, token, _) = requests.last().unwrap();
    assert_eq!(token.as_str(), "t1");
    assert_eq!(contents(&payload.messages), ["q1", "one", "q2"]);
    assert_eq!(contents(session.messages()), ["q1", "one", "q2", "TWO"]);
    assert_eq!(tokens(&session), ["t0", "t1", "t2b"]);
    assert_eq!(transport.handshake_count(), 1);
}

#[tokio::test]
async fn unrotated_reply_keeps_turns_and_tokens_aligned() {
    let (transport, mut session) = seeded(&["one"]).await;
    transport
        .reply_unrotated(200, events(&["two"]))
        .reply(200, "t2b", events(&["TWO"]));

    session.ask("q2").await.unwrap();
    assert_eq!(tokens(&session), ["t0", "t1", "t1"]);

    session.retry(2).await.unwrap();

    let requests = transport.requests();
    let (payload, token, _) = requests.last().unwrap();
    assert_eq!(token.as_str(), "t1");
    assert_eq!(contents(&payload.messages), ["q1", "one", "q2"]);
    assert_eq!(contents(session.messages()), ["q1", "one", "q2", "TWO"]);
    assert_eq!(tokens(&session), ["t0", "t1", "t2b"]);
}

#[tokio::test]
async fn retry_clamps_out_of_range_index() {
    let (transport, mut session) = seeded(&["one", "two"]).await;
    transport.reply(200, "t2b", events(&["TWO"]));

    session.retry(99).await.unwrap();

    let requests = transport.requests();
    let (payload, token, _) = requests.last().unwrap();
    assert_eq!(token.as_str(), "t1");
    assert_eq!(contents(&payload.messages), ["q1", "one", "q2"]);
    assert_eq!(contents(session.messages()), ["q1", "one", "q2", "TWO"]);
}

#[tokio::test]
async fn retry_on_empty_transcript_is_a_no_op() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut session = session(&transport);

    assert_eq!(session.retry(3).await.unwrap(), "");
    assert_eq!(transport.handshake_count(), 0);
    assert!(transport.requests().is_empty());

    let stream = session.retry_streaming(0).await.unwrap();
    assert!(stream.is_finished());
    assert_eq!(stream.collect().await.unwrap(), "");
    assert!(session.messages().is_empty());
}

#[tokio::test]
async fn failed_retry_keeps_the_rewind() {
    let (transport, mut session) = seeded(&["one", "two"]).await;
    transport.fail(DuckError::TransportError("reset".into()));

    assert!(session.retry(2).await.is_err());
    assert_eq!(contents(session.messages()), ["q1", "one"]);
    assert_eq!(tokens(&session), ["t0", "t1"]);
}

#[tokio::test]
async fn streaming_yields_fragments_then_records_answer() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .handshake("t0")
        .reply(200, "t1", events(&["a", "b"]));
    let mut session = session(&transport);

    let mut stream = session.ask_streaming("hi").await.unwrap();
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next_chunk().await.unwrap() {
        chunks.push(chunk);
    }
    assert!(stream.is_finished());
    assert_eq!(stream.answer(), "ab");
    drop(stream);

    assert_eq!(chunks, ["a", "b"]);
    assert_eq!(session.messages(), &[Message::user("hi"), Message::assistant("ab")]);
    assert_eq!(tokens(&session), ["t0", "t1"]);
    assert!(transport.requests()[0].2, "streaming requests ask for a stream");
}

#[tokio::test]
async fn dropped_stream_discards_partial_answer() {
    let (transport, mut session) = seeded(&["one"]).await;
    transport.reply(200, "t2", events(&["x", "y"]));

    {
        let mut stream = session.ask_streaming("q2").await.unwrap();
        assert_eq!(stream.next_chunk().await.unwrap().as_deref(), Some("x"));
    }

    assert_eq!(contents(session.messages()), ["q1", "one"]);
    assert_eq!(tokens(&session), ["t0", "t2"]);
}

#[tokio::test]
async fn stream_error_record_rolls_back() {
    let body = "data: {\"message\":\"x\"}\n\n\
                data: {\"action\":\"error\",\"status\":429,\"type\":\"ERR_BN_LIMIT\"}\n\n";
    let transport = Arc::new(ScriptedTransport::new());
    transport.handshake("t0").reply(200, "t1", body);
    let mut session = session(&transport);

    let err = session
        .ask_streaming("hi")
        .await
        .unwrap()
        .collect()
        .await
        .unwrap_err();

    assert!(matches!(err, DuckError::RateLimited(kind) if kind == "ERR_BN_LIMIT"));
    assert!(session.messages().is_empty());
}

#[tokio::test]
async fn limit_sentinel_sets_flag_and_retry_clears_it() {
    let body = "data: {\"message\":\"last\"}\n\ndata: [LIMIT_CONVERSATION]\n\n";
    let (transport, mut session) = seeded(&["one"]).await;
    transport
        .reply(200, "t2", body)
        .reply(200, "t1b", events(&["redo"]));

    let answer = session.ask_streaming("q2").await.unwrap().collect().await.unwrap();
    assert_eq!(answer, "last");
    assert!(session.limit_reached());
    assert_eq!(session.conversation().last_answer(), Some("last"));

    session.retry(1).await.unwrap();
    assert!(!session.limit_reached());
    assert_eq!(contents(session.messages()), ["q1", "redo"]);
}

#[tokio::test]
async fn non_stream_reply_to_streaming_request_is_one_chunk() {
    struct BatchOnly(ScriptedTransport);

    #[async_trait]
    impl ChatTransport for BatchOnly {
        async fn fetch_token(&self) -> Result<Token, DuckError> {
            self.0.fetch_token().await
        }

        async fn submit(
            &self,
            payload: &ChatPayload,
            token: &Token,
            _stream: bool,
        ) -> Result<ChatReply, DuckError> {
            self.0.submit(payload, token, false).await
        }
    }

    let scripted = ScriptedTransport::new();
    scripted
        .handshake("t0")
        .reply(200, "t1", events(&["whole", " answer"]));
    let mut session = Session::new(Arc::new(BatchOnly(scripted)), ModelType::Claude);

    let mut stream = session.ask_streaming("hi").await.unwrap();
    assert_eq!(
        stream.next_chunk().await.unwrap().as_deref(),
        Some("whole answer")
    );
    assert_eq!(stream.next_chunk().await.unwrap(), None);
    drop(stream);

    assert_eq!(session.conversation().last_answer(), Some("whole answer"));
}

#[tokio::test]
async fn record_round_trip() {
    let (transport, session) = seeded(&["one", "two"]).await;

    let json = session.serialize().unwrap();
    let restored = Session::deserialize(&json, transport).unwrap();

    assert_eq!(restored.model(), session.model());
    assert_eq!(restored.messages(), session.messages());
    assert_eq!(tokens(&restored), ["t0", "t1", "t2"]);
    assert_eq!(restored.to_record(), session.to_record());
}

#[tokio::test]
async fn restored_session_continues_with_last_token() {
    let json = r#"{
        "model": "Claude",
        "messages": [
            {"role": "user", "content": "q1"},
            {"role": "assistant", "content": "one"}
        ],
        "vqd": "legacy"
    }"#;
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply(200, "t2", events(&["two"]));
    let mut session = Session::deserialize(json, transport.clone()).unwrap();

    assert_eq!(session.model(), ModelType::Claude);
    assert_eq!(tokens(&session), ["legacy"]);

    session.ask("q2").await.unwrap();
    assert_eq!(transport.requests()[0].1.as_str(), "legacy");
    assert_eq!(transport.handshake_count(), 0);
}

#[tokio::test]
async fn restored_short_token_log_lines_up_with_latest_turn() {
    let json = r#"{
        "model": "Claude",
        "messages": [
            {"role": "user", "content": "q1"},
            {"role": "assistant", "content": "one"},
            {"role": "user", "content": "q2"},
            {"role": "assistant", "content": "two"}
        ],
        "vqd": "legacy"
    }"#;
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .reply(200, "t3", events(&["three"]))
        .reply(200, "t3b", events(&["THREE"]))
        .handshake("fresh")
        .reply(200, "f1", events(&["ONE"]));
    let mut session = Session::deserialize(json, transport.clone()).unwrap();
    assert_eq!(session.tokens().offset(), 2);

    session.ask("q3").await.unwrap();
    assert_eq!(tokens(&session), ["legacy", "t3"]);

    // The restored token validated the third prompt.
    assert_eq!(session.retry(3).await.unwrap(), "THREE");
    let requests = transport.requests();
    let (payload, token, _) = &requests[1];
    assert_eq!(token.as_str(), "legacy");
    assert_eq!(contents(&payload.messages), ["q1", "one", "q2", "two", "q3"]);
    assert_eq!(tokens(&session), ["legacy", "t3b"]);
    assert_eq!(transport.handshake_count(), 0);

    // Nothing validates the second prompt any more.
    assert_eq!(session.retry(2).await.unwrap(), "ONE");
    let requests = transport.requests();
    let (payload, token, _) = &requests[2];
    assert_eq!(token.as_str(), "fresh");
    assert_eq!(contents(&payload.messages), ["q1"]);
    assert_eq!(contents(session.messages()), ["q1", "ONE"]);
    assert_eq!(tokens(&session), ["fresh", "f1"]);
    assert_eq!(transport.handshake_count(), 1);
}

/// Hands out tokens but never answers a chat request.
struct Stalled;

#[async_trait]
impl ChatTransport for Stalled {
    async fn fetch_token(&self) -> Result<Token, DuckError> {
        Ok(Token::new("t0"))
    }

    async fn submit(
        &self,
        _payload: &ChatPayload,
        _token: &Token,
        _stream: bool,
    ) -> Result<ChatReply, DuckError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn cancelled_ask_leaves_transcript_untouched() {
    let mut session = Session::new(Arc::new(Stalled), ModelType::Mistral);
    session.refresh_token().await.unwrap();

    let ask = tokio::time::timeout(Duration::from_millis(20), session.ask("hello"));
    assert!(ask.await.is_err());
    assert!(session.conversation().is_empty());

    let ask = tokio::time::timeout(Duration::from_millis(20), session.ask_streaming("hello"));
    assert!(ask.await.is_err());
    assert!(session.conversation().is_empty());
    assert_eq!(tokens(&session), ["t0"]);
}

#[test]
fn record_rejects_broken_transcripts() {
    let transport: Arc<dyn ChatTransport> = Arc::new(ScriptedTransport::new());

    let json = r#"{"model":"o3-mini","messages":[{"role":"assistant","content":"x"}],"tokens":[]}"#;
    assert!(matches!(
        Session::deserialize(json, transport.clone()),
        Err(DuckError::TurnOrder(_))
    ));

    let json = r#"{"model":"o3-mini","messages":[{"role":"user","content":"x"}],"tokens":[]}"#;
    assert!(matches!(
        Session::deserialize(json, transport.clone()),
        Err(DuckError::Persistence(_))
    ));

    assert!(matches!(
        Session::deserialize("{not json", transport),
        Err(DuckError::Persistence(_))
    ));
}

#[test]
fn record_drops_surplus_tokens() {
    let record = SessionRecord {
        model: ModelType::Llama,
        messages: vec![Message::user("q"), Message::assistant("a")],
        tokens: ["t0", "t1", "t2", "t3"].into_iter().map(Token::new).collect(),
    };
    let session = Session::from_record(Arc::new(ScriptedTransport::new()), record).unwrap();
    assert_eq!(tokens(&session), ["t0", "t1"]);
    assert_eq!(session.messages()[1].role, Role::Assistant);
}
