//! MCP server implementation.

use super::args::{
    self, AutoCollectArgs, BatchExtractArgs, CollectChannelArgs, CollectPlaylistArgs,
    ExtractDetailsArgs, GetCollectedArgs, GetDetailsArgs, NoArgs, ProcessUnprocessedArgs,
};
use super::protocol::*;
use super::tools::{self, get_tools, is_exposed};
use crate::config::{Settings, ToolProfile};
use crate::enricher::ExtractionOutcome;
use crate::error::{HarvestError, Result};
use crate::pipeline::Pipeline;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "yt-harvest";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for yt-harvest.
pub struct McpServer {
    pipeline: Pipeline,
    profile: ToolProfile,
}

impl McpServer {
    /// Create a server backed by the configured database and yt-dlp.
    pub fn new(settings: Settings, profile: ToolProfile) -> Result<Self> {
        Ok(Self::with_pipeline(Pipeline::new(settings)?, profile))
    }

    /// Create a server around an existing pipeline.
    pub fn with_pipeline(pipeline: Pipeline, profile: ToolProfile) -> Self {
        Self { pipeline, profile }
    }

    /// Run the MCP server on stdin/stdout until stdin closes.
    pub async fn run(self) -> anyhow::Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();

        info!(profile = %self.profile, "yt-harvest MCP server starting");
        self.serve(stdin, stdout).await
    }

    /// Serve newline-delimited JSON-RPC until `reader` reaches EOF, then
    /// close the database.
    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    warn!("Failed to parse request: {}", e);
                    Some(JsonRpcResponse::error(None, PARSE_ERROR, "Parse error"))
                }
            };

            if let Some(response) = response {
                let mut out = serde_json::to_vec(&response)?;
                out.push(b'\n');
                writer.write_all(&out).await?;
                writer.flush().await?;
            }
        }

        info!("Input closed, shutting down");
        self.pipeline.close()?;
        Ok(())
    }

    /// Handle a single JSON-RPC message. Notifications get no response.
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!("Notification: {}", request.method);
            return None;
        }

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                "Only JSON-RPC 2.0 is supported",
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", request.method),
            ),
        };

        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };

        respond(id, &result)
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: get_tools(self.profile),
        };
        respond(id, &result)
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params.map(serde_json::from_value::<ToolCallParams>) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, &format!("Invalid params: {}", e))
            }
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let result = match self.call_tool(&params.name, params.arguments).await {
            Ok(value) => ToolCallResult::json(value),
            Err(e) => {
                warn!(tool = %params.name, kind = e.kind(), "Tool failed: {}", e);
                ToolCallResult::error(&e)
            }
        };

        respond(id, &result)
    }

    #[instrument(skip(self, arguments))]
    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<Value> {
        if !is_exposed(self.profile, name) {
            return Err(HarvestError::InvalidInput(format!("Unknown tool: {}", name)));
        }

        let limits = &self.pipeline.settings().server;

        match name {
            tools::COLLECT_CHANNEL => {
                let args: CollectChannelArgs = args::parse(arguments)?;
                let result = self
                    .pipeline
                    .collector()
                    .collect_from_channel(&args.channel_url)
                    .await?;
                to_value(&result)
            }
            tools::COLLECT_PLAYLIST => {
                let args: CollectPlaylistArgs = args::parse(arguments)?;
                let result = self
                    .pipeline
                    .collector()
                    .collect_from_playlist(&args.playlist_url)
                    .await?;
                to_value(&result)
            }
            tools::AUTO_COLLECT => {
                let args: AutoCollectArgs = args::parse(arguments)?;
                let result = self.pipeline.collector().auto_collect(&args.url).await?;
                to_value(&result)
            }
            tools::GET_COLLECTED => {
                let args: GetCollectedArgs = args::parse(arguments)?;
                let videos = self
                    .pipeline
                    .store()
                    .list_urls(&args.into_filter(limits.collected_limit))?;
                Ok(json!({ "count": videos.len(), "videos": videos }))
            }
            tools::EXTRACT_DETAILS => {
                let args: ExtractDetailsArgs = args::parse(arguments)?;
                let stored = self
                    .pipeline
                    .enricher()
                    .extract_details(&args.video_url)
                    .await?;
                to_value(&stored)
            }
            tools::BATCH_EXTRACT => {
                let args: BatchExtractArgs = args::parse(arguments)?;
                let outcomes = self.pipeline.enricher().batch_extract(&args.video_urls).await;
                Ok(summarize(&outcomes))
            }
            tools::PROCESS_UNPROCESSED => {
                let args: ProcessUnprocessedArgs = args::parse(arguments)?;
                let limit = args.limit.unwrap_or(limits.process_limit);
                let outcomes = self
                    .pipeline
                    .enricher()
                    .process_unprocessed(Some(limit))
                    .await?;
                Ok(summarize(&outcomes))
            }
            tools::GET_DETAILS => {
                let args: GetDetailsArgs = args::parse(arguments)?;
                let videos = self
                    .pipeline
                    .store()
                    .list_details(&args.into_filter(limits.details_limit)?)?;
                Ok(json!({ "count": videos.len(), "videos": videos }))
            }
            tools::CONFERENCE_STATISTICS => {
                let _: NoArgs = args::parse(arguments)?;
                let stats = self.pipeline.store().conference_statistics()?;
                to_value(&stats)
            }
            _ => Err(HarvestError::InvalidInput(format!("Unknown tool: {}", name))),
        }
    }
}

fn respond<T: Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, -32603, &format!("Internal error: {}", e)),
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Per-URL outcomes of a batch, plus totals.
fn summarize(outcomes: &[ExtractionOutcome]) -> Value {
    let results: Vec<Value> = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(stored) => json!({
                "url": outcome.url,
                "success": true,
                "details": stored,
            }),
            Err(e) => json!({
                "url": outcome.url,
                "success": false,
                "error": { "kind": e.kind(), "message": e.to_string() },
            }),
        })
        .collect();

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();

    json!({
        "total": outcomes.len(),
        "succeeded": succeeded,
        "failed": outcomes.len() - succeeded,
        "results": results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ListedVideo, MemorySource, VideoMetadata};
    use crate::store::Store;
    use std::sync::Arc;

    const PLAYLIST: &str = "https://www.youtube.com/playlist?list=PLpycon2024";
    const VIDEO: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa";

    fn server(profile: ToolProfile) -> McpServer {
        let source = MemorySource::new()
            .with_playlist(PLAYLIST, vec![Ok(ListedVideo::new(VIDEO, "Keynote"))])
            .with_video(VideoMetadata {
                id: "aaaaaaaaaaa".to_string(),
                title: "PyCon KR 2024 키노트".to_string(),
                view_count: Some(42),
                ..Default::default()
            });
        let mut settings = Settings::default();
        settings.extractor.retry_delay_ms = 0;

        let store = Arc::new(Store::open_in_memory().unwrap());
        let pipeline = Pipeline::with_components(settings, store, Arc::new(source));
        McpServer::with_pipeline(pipeline, profile)
    }

    async fn exchange(server: McpServer, messages: &[Value]) -> Vec<Value> {
        let input: String = messages
            .iter()
            .map(|m| format!("{}\n", m))
            .collect();
        let mut output = Vec::new();

        server.serve(input.as_bytes(), &mut output).await.unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn call(id: i64, name: &str, arguments: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        })
    }

    #[tokio::test]
    async fn test_initialize_and_notification() {
        let responses = exchange(
            server(ToolProfile::All),
            &[
                json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
                json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}),
            ],
        )
        .await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(responses[1]["id"], 2);
    }

    #[tokio::test]
    async fn test_tools_list_follows_profile() {
        for (profile, expected) in [
            (ToolProfile::Collector, 4),
            (ToolProfile::Details, 5),
            (ToolProfile::All, 9),
        ] {
            let responses = exchange(
                server(profile),
                &[json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})],
            )
            .await;
            let tools = responses[0]["result"]["tools"].as_array().unwrap();
            assert_eq!(tools.len(), expected, "profile {}", profile);
        }
    }

    #[tokio::test]
    async fn test_collect_then_extract() {
        let responses = exchange(
            server(ToolProfile::All),
            &[
                call(1, tools::AUTO_COLLECT, json!({"url": PLAYLIST})),
                call(2, tools::PROCESS_UNPROCESSED, json!({})),
                call(3, tools::GET_DETAILS, json!({"conference_year": 2024})),
                call(4, tools::CONFERENCE_STATISTICS, json!({})),
            ],
        )
        .await;

        let collected = &responses[0]["result"]["structuredContent"];
        assert_eq!(collected["inserted"], 1);
        assert_eq!(collected["source_type"], "playlist");

        let processed = &responses[1]["result"]["structuredContent"];
        assert_eq!(processed["succeeded"], 1);

        let details = &responses[2]["result"]["structuredContent"];
        assert_eq!(details["count"], 1);
        assert_eq!(details["videos"][0]["conference_name"], "PyCon KR");

        let stats = &responses[3]["result"]["structuredContent"];
        assert_eq!(stats["overall"]["total_videos"], 1);
    }

    #[tokio::test]
    async fn test_tool_errors_are_results() {
        let responses = exchange(
            server(ToolProfile::Collector),
            &[
                call(1, tools::COLLECT_CHANNEL, json!({"channel_url": ""})),
                call(2, tools::EXTRACT_DETAILS, json!({"video_url": VIDEO})),
                call(3, tools::GET_COLLECTED, json!({"limit": 0})),
            ],
        )
        .await;

        for response in &responses {
            assert!(response.get("error").is_none());
            assert_eq!(response["result"]["isError"], true);
        }
        assert_eq!(
            responses[0]["result"]["structuredContent"]["error"]["kind"],
            "invalid_input"
        );
    }

    #[tokio::test]
    async fn test_batch_reports_each_url() {
        let responses = exchange(
            server(ToolProfile::All),
            &[
                call(1, tools::COLLECT_PLAYLIST, json!({"playlist_url": PLAYLIST})),
                call(2, tools::BATCH_EXTRACT, json!({"video_urls": [VIDEO, "not a url"]})),
            ],
        )
        .await;

        let batch = &responses[1]["result"]["structuredContent"];
        assert_eq!(batch["succeeded"], 1);
        assert_eq!(batch["failed"], 1);
        assert_eq!(batch["results"][1]["error"]["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let input = "this is not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"resources/list\"}\n";
        let mut output = Vec::new();
        server(ToolProfile::All)
            .serve(input.as_bytes(), &mut output)
            .await
            .unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[1]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(responses[1]["id"], 7);
    }
}
