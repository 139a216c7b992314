//! generation api seam.
//!
//! handlers only see `GenerativeClient`; `LlmClient` is the real thing backed by
//! the `llm` crate, tests substitute a scripted fake.

use async_trait::async_trait;
use bevy::prelude::*;
use futures_lite::stream::{self, Stream, StreamExt};
use std::pin::Pin;

use crate::error::ProviderError;
use crate::tool::{FunctionDeclaration, RawToolCall};
use crate::{
    ChatMessage, ChatProvider, ChatResponse, FunctionBuilder, LLMBackend, LLMBuilder, LLMProvider,
    ParamBuilder, StreamChoice, StreamDelta, StreamResponse, ToolCall,
};

/// one request, one user action.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub tools: Vec<FunctionDeclaration>,
    pub streaming: bool,
}

impl GenerationRequest {
    pub fn streaming(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: None,
            tools: Vec::new(),
            streaming: true,
        }
    }

    pub fn once(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self { streaming: false, ..Self::streaming(model, prompt) }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn tool(mut self, declaration: FunctionDeclaration) -> Self {
        self.tools.push(declaration);
        self
    }

    pub fn tools_enabled(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// a slice of a streamed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseChunk {
    pub text: Option<String>,
    pub tool_calls: Vec<RawToolCall>,
}

impl ResponseChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), tool_calls: Vec::new() }
    }

    pub fn call(call: RawToolCall) -> Self {
        Self { text: None, tool_calls: vec![call] }
    }
}

/// single pass, arrival order, ends when the provider closes the stream.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ResponseChunk, ProviderError>> + Send>>;

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn stream_generate(&self, request: &GenerationRequest) -> Result<ChunkStream, ProviderError>;

    /// resolves with the complete text; no partial delivery.
    async fn generate_once(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

/// `GenerativeClient` over the `llm` crate's google backend.
///
/// a provider is built per request so model, temperature and tools always
/// match the request.
#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into() }
    }

    fn provider(&self, request: &GenerationRequest) -> Result<Box<dyn LLMProvider>, ProviderError> {
        let mut b = LLMBuilder::new()
            .backend(LLMBackend::Google)
            .api_key(self.api_key.clone())
            .model(request.model.clone())
            .stream(request.streaming);
        if let Some(t) = request.temperature {
            b = b.temperature(t);
        }
        for decl in &request.tools {
            b = b.function(function_builder(decl));
        }
        b.build().map_err(ProviderError::from)
    }
}

fn function_builder(decl: &FunctionDeclaration) -> FunctionBuilder {
    let mut f = FunctionBuilder::new(decl.name).description(decl.description);
    for p in &decl.params {
        f = f.param(ParamBuilder::new(p.name).type_of(p.kind).description(p.description));
    }
    f.required(decl.required())
}

fn messages_for(request: &GenerationRequest) -> Vec<ChatMessage> {
    vec![ChatMessage::user().content(request.prompt.clone()).build()]
}

fn push_calls(chunk: &mut ResponseChunk, calls: Vec<ToolCall>) {
    for call in calls {
        match RawToolCall::from_llm(&call) {
            Some(raw) => chunk.tool_calls.push(raw),
            None => warn!(target: "bevy_travel_llm", "unreadable tool call: {:?}", call),
        }
    }
}

fn chunk_from_stream(resp: StreamResponse) -> ResponseChunk {
    let StreamResponse { choices, .. } = resp;
    let mut chunk = ResponseChunk::default();
    for StreamChoice { delta: StreamDelta { content, tool_calls } } in choices {
        if let Some(txt) = content
            && !txt.is_empty() {
                chunk.text.get_or_insert_with(String::new).push_str(&txt);
        }
        push_calls(&mut chunk, tool_calls.unwrap_or_default());
    }
    chunk
}

/// the one-shot fallback reply as a single chunk.
fn chunk_from_reply(text: Option<String>, tool_calls: Option<Vec<ToolCall>>) -> ResponseChunk {
    let mut chunk = ResponseChunk { text: text.filter(|t| !t.is_empty()), tool_calls: Vec::new() };
    push_calls(&mut chunk, tool_calls.unwrap_or_default());
    chunk
}

#[async_trait]
impl GenerativeClient for LlmClient {
    async fn stream_generate(&self, request: &GenerationRequest) -> Result<ChunkStream, ProviderError> {
        let provider = self.provider(request)?;
        let messages = messages_for(request);
        info!(target: "bevy_travel_llm",
            "stream_generate: model={} tools={} prompt_len={}",
            request.model, request.tools.len(), request.prompt.len()
        );

        match provider.chat_stream_struct(&messages).await {
            Ok(s) => Ok(Box::pin(s.map(|item| item.map(chunk_from_stream).map_err(ProviderError::from)))),
            Err(err) => {
                warn!(target: "bevy_travel_llm",
                    "structured streaming failed: {err}. falling back to one-shot chat_with_tools()"
                );
                let resp = provider
                    .chat_with_tools(&messages, provider.tools())
                    .await
                    .map_err(ProviderError::from)?;
                let chunk = chunk_from_reply(resp.text(), resp.tool_calls());
                Ok(Box::pin(stream::once(Ok(chunk))))
            }
        }
    }

    async fn generate_once(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let provider = self.provider(request)?;
        info!(target: "bevy_travel_llm",
            "generate_once: model={} prompt_len={}", request.model, request.prompt.len()
        );
        let resp = provider.chat(&messages_for(request)).await.map_err(ProviderError::from)?;
        let text = resp.text().unwrap_or_default();
        debug!(target: "bevy_travel_llm", "generate_once completed: final_len={}", text.len());
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    /// replays a fixed stream / reply and records every request.
    pub(crate) struct ScriptedClient {
        pub chunks: Vec<Result<ResponseChunk, ProviderError>>,
        pub reply: Result<String, ProviderError>,
        pub requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedClient {
        pub fn new() -> Self {
            Self { chunks: Vec::new(), reply: Ok(String::new()), requests: Mutex::new(Vec::new()) }
        }

        pub fn with_chunks(mut self, chunks: Vec<ResponseChunk>) -> Self {
            self.chunks = chunks.into_iter().map(Ok).collect();
            self
        }

        pub fn with_stream_error(mut self, err: ProviderError) -> Self {
            self.chunks.push(Err(err));
            self
        }

        pub fn with_reply(mut self, reply: Result<String, ProviderError>) -> Self {
            self.reply = reply;
            self
        }

        pub fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn streaming_requests(&self) -> Vec<GenerationRequest> {
            self.requests().into_iter().filter(|r| r.streaming).collect()
        }
    }

    #[async_trait]
    impl GenerativeClient for ScriptedClient {
        async fn stream_generate(&self, request: &GenerationRequest) -> Result<ChunkStream, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(Box::pin(stream::iter(self.chunks.clone())))
        }

        async fn generate_once(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{RECOMMEND_PLACE, recommend_place_declaration};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn google_call(arguments: &str) -> ToolCall {
        serde_json::from_value(json!({
            "id": "call_1",
            "type": "function",
            "function": { "name": "recommendPlace", "arguments": arguments }
        }))
        .unwrap()
    }

    fn delta(content: Option<&str>, tool_calls: Option<Vec<ToolCall>>) -> StreamChoice {
        StreamChoice { delta: StreamDelta { content: content.map(str::to_string), tool_calls } }
    }

    #[test]
    fn request_builders() {
        let r = GenerationRequest::streaming("m", "p").temperature(2.0).tool(recommend_place_declaration());
        assert!(r.streaming);
        assert!(r.tools_enabled());
        assert_eq!(r.temperature, Some(2.0));

        let once = GenerationRequest::once("m", "p");
        assert!(!once.streaming);
        assert!(!once.tools_enabled());
        assert_eq!(once.temperature, None);
    }

    #[test]
    fn stream_chunk_joins_text_and_reads_calls() {
        let call = google_call(r#"{"location":"Socotra, Yemen","caption":"Dragon blood trees."}"#);
        let resp = StreamResponse {
            choices: vec![
                delta(Some("Pack "), None),
                delta(Some(""), None),
                delta(Some("light."), Some(vec![call])),
            ],
            usage: None,
        };

        let chunk = chunk_from_stream(resp);
        assert_eq!(chunk.text.as_deref(), Some("Pack light."));
        assert_eq!(chunk.tool_calls.len(), 1);
        assert_eq!(chunk.tool_calls[0].name, RECOMMEND_PLACE);
        assert_eq!(chunk.tool_calls[0].args["location"], "Socotra, Yemen");
    }

    #[test]
    fn stream_chunk_without_content_has_no_text() {
        let resp = StreamResponse { choices: vec![delta(Some(""), None), delta(None, None)], usage: None };
        assert_eq!(chunk_from_stream(resp), ResponseChunk::default());
    }

    #[test]
    fn fallback_reply_becomes_one_chunk() {
        let call = google_call(r#"{"location":"Lofoten, Norway","caption":"Fish racks."}"#);
        let chunk = chunk_from_reply(Some(String::new()), Some(vec![call]));
        assert_eq!(chunk.text, None);
        assert_eq!(chunk.tool_calls.len(), 1);
        assert_eq!(chunk.tool_calls[0].name, RECOMMEND_PLACE);
        assert_eq!(chunk.tool_calls[0].args["caption"], "Fish racks.");

        let chunk = chunk_from_reply(Some("no tools today".into()), None);
        assert_eq!(chunk, ResponseChunk::text("no tools today"));
    }
}
