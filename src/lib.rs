//! bevy_travel_llm: a small bevy app layer that turns travel prompts into maps.
//!
//! - presets stream a `recommendPlace` tool call; the first one found puts a
//!   place map and a narrated caption on screen.
//! - the directions form asks for a one-sentence drive-time estimate and shows
//!   a directions map for the same pair.
//! - never blocks the main thread: on native request futures run on a tiny
//!   tokio runtime; on wasm on bevy's async pool, which yields to the browser.
//! - results come back through a bounded inbox and are applied in `Update`,
//!   only if they belong to the newest request.
//!
//! api docs for the underlying client types: https://docs.rs/llm

use bevy::prelude::*;
use bevy::tasks::AsyncComputeTaskPool;
use flume::{Sender, TryRecvError};
use std::sync::Arc;

pub mod client;
pub mod config;
#[cfg(target_arch = "wasm32")]
pub mod dom;
pub mod error;
pub mod handler;
pub mod map;
pub mod prompt;
pub mod session;
pub mod surface;
pub mod tool;
pub mod ui;

/// re-export the llm types the client is built on.
pub use llm::{
    LLMProvider, ToolCall,
    builder::{FunctionBuilder, LLMBackend, LLMBuilder, ParamBuilder},
    chat::{ChatMessage, ChatProvider, ChatResponse, StreamChoice, StreamDelta, StreamResponse},
    error::LLMError,
};

pub use client::{ChunkStream, GenerationRequest, GenerativeClient, LlmClient, ResponseChunk};
pub use config::{ConfigError, TravelConfig};
pub use error::{ProviderError, TravelError};
pub use handler::{DirectionsHandler, FailurePolicy, RecommendationHandler};
pub use map::{MapRenderer, directions_map_url, place_map_url};
pub use session::{Inbox, InboxMsg, RequestGate, RequestKind, RequestToken, SurfaceWriter};
pub use surface::{DisplaySurfaces, SurfaceOp, TextSurface, TextSurfaceId};
pub use tool::{RawToolCall, RecommendPlace, ToolInvocation};
pub use ui::{
    ColorScheme, DirectionsForm, DirectionsSubmitted, PRESETS, Preset, PresetPressed, Presets, Theme,
    TravelUiPlugin,
};

use session::push_inbox;

/// composition root: both handlers, wired to one injected client.
#[derive(Resource, Clone)]
pub struct TravelServices {
    pub recommendation: RecommendationHandler,
    pub directions: DirectionsHandler,
}

impl TravelServices {
    pub fn new(client: Arc<dyn GenerativeClient>, config: &TravelConfig) -> Self {
        let maps = MapRenderer::new(config.api_key.clone());
        Self {
            recommendation: RecommendationHandler::new(
                client.clone(),
                maps.clone(),
                config.model.clone(),
                config.temperature,
            ),
            directions: DirectionsHandler::new(client, maps, config.model.clone()),
        }
    }

    /// production wiring over the `llm` google backend.
    pub fn from_config(config: &TravelConfig) -> Self {
        Self::new(Arc::new(LlmClient::new(config.api_key.clone())), config)
    }

    pub fn with_recommendation_policy(mut self, policy: FailurePolicy) -> Self {
        self.recommendation.policy = policy;
        self
    }

    pub fn with_directions_policy(mut self, policy: FailurePolicy) -> Self {
        self.directions.policy = policy;
        self
    }
}

/// on native we keep a tiny tokio runtime to drive request futures.
/// we spawn onto this rt from compute tasks so neither the main thread
/// nor bevy's compute pools block.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Resource, Clone)]
pub struct TokioRt(pub Arc<tokio::runtime::Runtime>);

#[cfg(not(target_arch = "wasm32"))]
impl Default for TokioRt {
    fn default() -> Self {
        info!(target: "bevy_travel_llm", "TravelPlugin: initializing Tokio multi-thread runtime (native)");
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("tokio runtime");
        Self(Arc::new(rt))
    }
}

/// system ordering so front-ends can run after surfaces are updated
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum TravelSet {
    /// request events are turned into tasks here
    Spawn,
    /// inbox is applied to `DisplaySurfaces` here
    Drain,
}

#[derive(Event, Debug, Clone)]
pub struct RecommendRequested {
    pub prompt: String,
}

#[derive(Event, Debug, Clone)]
pub struct DirectionsRequested {
    pub origin: String,
    pub destination: String,
}

#[derive(Event, Debug, Clone)]
pub struct RequestStarted {
    pub kind: RequestKind,
    pub token: u64,
}

#[derive(Event, Debug, Clone)]
pub struct RequestFinished {
    pub kind: RequestKind,
    pub token: u64,
}

#[derive(Event, Debug, Clone)]
pub struct RequestFailed {
    pub kind: RequestKind,
    pub token: u64,
    pub error: String,
}

/// bevy plugin: wires systems, events, resources.
/// requires a `TravelServices` resource before the first `Update`.
/// on native, also inserts a tiny tokio runtime resource by default.
pub struct TravelPlugin;

impl Plugin for TravelPlugin {
    fn build(&self, app: &mut App) {
        info!(target: "bevy_travel_llm", "TravelPlugin: build()");
        app.init_resource::<Inbox>()
            .init_resource::<RequestGate>()
            .init_resource::<DisplaySurfaces>()
            .add_event::<RecommendRequested>()
            .add_event::<DirectionsRequested>()
            .add_event::<RequestStarted>()
            .add_event::<RequestFinished>()
            .add_event::<RequestFailed>()
            .configure_sets(Update, (TravelSet::Spawn, TravelSet::Drain).chain())
            .add_systems(Update, (spawn_recommendations, spawn_directions).in_set(TravelSet::Spawn))
            .add_systems(Update, drain_inbox.in_set(TravelSet::Drain));

        #[cfg(not(target_arch = "wasm32"))]
        if app.world().get_resource::<TokioRt>().is_none() {
            app.insert_resource(TokioRt::default());
        }
    }
}

/// runs one handler future off the main schedule and reports how it ended.
fn spawn_request<F>(
    kind: RequestKind,
    token: u64,
    tx: Sender<InboxMsg>,
    #[cfg(not(target_arch = "wasm32"))] rt: &TokioRt,
    fut: F,
) where
    F: Future<Output = Result<(), TravelError>> + Send + 'static,
{
    let run = async move {
        // logged once, by whoever reads `RequestFailed`
        let error = fut.await.err().map(|err| err.to_string());
        push_inbox(&tx, InboxMsg::Finished { token, kind, error });
    };

    #[cfg(not(target_arch = "wasm32"))]
    let rt = rt.0.clone();

    AsyncComputeTaskPool::get()
        .spawn(async move {
            #[cfg(target_arch = "wasm32")]
            {
                // wasm path: just await directly (no tokio).
                run.await;
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                // native: hand off to tokio so bevy pools stay free.
                let _ = rt.spawn(run).await;
            }
        })
        .detach();
}

fn spawn_recommendations(
    mut ev: EventReader<RecommendRequested>,
    services: Res<TravelServices>,
    gate: Res<RequestGate>,
    inbox: Res<Inbox>,
    mut ev_start: EventWriter<RequestStarted>,
    #[cfg(not(target_arch = "wasm32"))] rt: Res<TokioRt>,
) {
    for RecommendRequested { prompt } in ev.read() {
        let token = gate.issue();
        let id = token.id();
        info!(target: "bevy_travel_llm", "recommendation {} -> '{}' (len={})", id, prompt, prompt.len());
        ev_start.write(RequestStarted { kind: RequestKind::Recommendation, token: id });

        let out = SurfaceWriter::new(token, inbox.tx.clone());
        let handler = services.recommendation.clone();
        let prompt = prompt.clone();
        let fut = async move { handler.handle(&prompt, &out).await };
        #[cfg(not(target_arch = "wasm32"))]
        spawn_request(RequestKind::Recommendation, id, inbox.tx.clone(), &rt, fut);
        #[cfg(target_arch = "wasm32")]
        spawn_request(RequestKind::Recommendation, id, inbox.tx.clone(), fut);
    }
}

fn spawn_directions(
    mut ev: EventReader<DirectionsRequested>,
    services: Res<TravelServices>,
    gate: Res<RequestGate>,
    inbox: Res<Inbox>,
    mut ev_start: EventWriter<RequestStarted>,
    #[cfg(not(target_arch = "wasm32"))] rt: Res<TokioRt>,
) {
    for DirectionsRequested { origin, destination } in ev.read() {
        if origin.trim().is_empty() || destination.trim().is_empty() {
            // leave the current request (and the page) alone
            debug!(target: "bevy_travel_llm", "directions request ignored: empty origin or destination");
            continue;
        }
        let token = gate.issue();
        let id = token.id();
        info!(target: "bevy_travel_llm", "directions {} -> '{}' to '{}'", id, origin, destination);
        ev_start.write(RequestStarted { kind: RequestKind::Directions, token: id });

        let out = SurfaceWriter::new(token, inbox.tx.clone());
        let handler = services.directions.clone();
        let (origin, destination) = (origin.clone(), destination.clone());
        let fut = async move { handler.handle(&origin, &destination, &out).await };
        #[cfg(not(target_arch = "wasm32"))]
        spawn_request(RequestKind::Directions, id, inbox.tx.clone(), &rt, fut);
        #[cfg(target_arch = "wasm32")]
        spawn_request(RequestKind::Directions, id, inbox.tx.clone(), fut);
    }
}

/// drains the inbox into `DisplaySurfaces` and emits lifecycle events.
fn drain_inbox(
    inbox: Res<Inbox>,
    gate: Res<RequestGate>,
    mut surfaces: ResMut<DisplaySurfaces>,
    mut ev_done: EventWriter<RequestFinished>,
    mut ev_err: EventWriter<RequestFailed>,
) {
    // drain up to a cap per frame to avoid long frames on bursty streams
    const MAX_PER_FRAME: usize = 512;
    let current = gate.current();
    for _ in 0..MAX_PER_FRAME {
        let msg = match inbox.rx.try_recv() {
            Ok(m) => m,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        };
        match msg {
            InboxMsg::Surface { token, op } if token == current => surfaces.apply(op),
            InboxMsg::Surface { token, op } => {
                trace!(target: "bevy_travel_llm", "drain: stale op from {} (current {}): {:?}", token, current, op);
            }
            InboxMsg::Finished { token, kind, error: None } => {
                debug!(target: "bevy_travel_llm", "{:?} request {} finished", kind, token);
                ev_done.write(RequestFinished { kind, token });
            }
            InboxMsg::Finished { token, kind, error: Some(error) } => {
                ev_err.write(RequestFailed { kind, token, error });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::ScriptedClient;
    use crate::prompt::{SYSTEM_INSTRUCTIONS, compose};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn app_with(client: Arc<ScriptedClient>) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        let config = TravelConfig::new("KEY").with_model("test-model");
        app.insert_resource(TravelServices::new(client, &config));
        app.insert_resource(config);
        app.add_plugins((TravelPlugin, TravelUiPlugin));
        app
    }

    /// pumps frames until `done` holds (requests finish on other threads).
    fn update_until(app: &mut App, done: impl Fn(&mut App) -> bool) -> bool {
        for _ in 0..500 {
            app.update();
            if done(app) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn drain_applies_only_current_token() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_event::<RequestFinished>();
        app.add_event::<RequestFailed>();
        app.insert_resource(Inbox::default());
        app.insert_resource(RequestGate::default());
        app.insert_resource(DisplaySurfaces::default());
        app.add_systems(Update, super::drain_inbox);

        {
            let gate = app.world().resource::<RequestGate>().clone();
            let tx = app.world().resource::<Inbox>().tx.clone();
            let old = gate.issue();
            let new = gate.issue();
            tx.send(InboxMsg::Surface {
                token: old.id(),
                op: SurfaceOp::SetText(TextSurfaceId::Caption, "stale".into()),
            })
            .unwrap();
            tx.send(InboxMsg::Surface {
                token: new.id(),
                op: SurfaceOp::SetText(TextSurfaceId::Directions, "fresh".into()),
            })
            .unwrap();
            tx.send(InboxMsg::Finished { token: new.id(), kind: RequestKind::Directions, error: None })
                .unwrap();
            tx.send(InboxMsg::Finished {
                token: old.id(),
                kind: RequestKind::Recommendation,
                error: Some("boom".into()),
            })
            .unwrap();
        }

        app.update();

        let surfaces = app.world().resource::<DisplaySurfaces>();
        assert_eq!(surfaces.caption.text, "");
        assert_eq!(surfaces.directions.text, "fresh");
        {
            let mut ev = app.world_mut().resource_mut::<Events<RequestFinished>>();
            let done: Vec<_> = ev.drain().collect();
            assert_eq!(done.len(), 1);
            assert_eq!(done[0].kind, RequestKind::Directions);
        }
        {
            let mut ev = app.world_mut().resource_mut::<Events<RequestFailed>>();
            let errs: Vec<_> = ev.drain().collect();
            assert_eq!(errs.len(), 1);
            assert_eq!(errs[0].error, "boom");
        }
    }

    #[test]
    fn startup_requests_default_directions() {
        let client = Arc::new(ScriptedClient::new().with_reply(Ok("About 50 minutes by car.".into())));
        let mut app = app_with(client.clone());

        let finished = update_until(&mut app, |app| {
            let s = app.world().resource::<DisplaySurfaces>();
            s.directions.text == "About 50 minutes by car." && s.map.src.is_some()
        });
        assert!(finished, "directions never landed");

        let reqs = client.requests();
        assert_eq!(reqs.len(), 1);
        assert!(!reqs[0].streaming);
        assert!(reqs[0].prompt.contains(ui::DEFAULT_ORIGIN));
        assert!(reqs[0].prompt.contains(ui::DEFAULT_DESTINATION));

        let surfaces = app.world().resource::<DisplaySurfaces>();
        assert!(surfaces.directions.visible);
        assert!(surfaces.map.src.as_deref().unwrap_or_default().contains("/directions?"));
        assert_eq!(app.world().resource::<Theme>().0, ColorScheme::Dark);
    }

    #[test]
    fn preset_press_streams_once_and_shows_place() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_reply(Ok("About 50 minutes by car.".into()))
                .with_chunks(vec![ResponseChunk::call(RawToolCall::new(
                    "recommendPlace",
                    json!({"location": "Socotra, Yemen", "caption": "Dragon blood trees."}),
                ))]),
        );
        let mut app = app_with(client.clone());
        // let the startup directions request settle first
        assert!(update_until(&mut app, |app| {
            app.world().resource::<DisplaySurfaces>().directions.text == "About 50 minutes by car."
        }));

        app.world_mut().send_event(PresetPressed(0));
        let shown = update_until(&mut app, |app| app.world().resource::<DisplaySurfaces>().caption.visible);
        assert!(shown, "caption never shown");

        let streams = client.streaming_requests();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].prompt, compose(SYSTEM_INSTRUCTIONS, PRESETS[0].prompt));

        let surfaces = app.world().resource::<DisplaySurfaces>();
        assert_eq!(surfaces.caption.text, "Dragon blood trees.");
        assert!(!surfaces.directions.visible);
        assert!(surfaces.map.src.as_deref().unwrap_or_default().contains("q=Socotra%2C%20Yemen"));
    }

    #[test]
    fn empty_form_submission_sends_nothing() {
        let client = Arc::new(ScriptedClient::new().with_reply(Ok("ok".into())));
        let mut app = app_with(client.clone());
        assert!(update_until(&mut app, |app| {
            let s = app.world().resource::<DisplaySurfaces>();
            s.directions.text == "ok" && s.map.src.is_some()
        }));
        let before = app.world().resource::<DisplaySurfaces>().clone();

        app.world_mut().resource_mut::<DirectionsForm>().destination.clear();
        app.world_mut().send_event(DirectionsSubmitted);
        for _ in 0..5 {
            app.update();
        }

        assert_eq!(client.requests().len(), 1);
        assert_eq!(app.world().resource::<DisplaySurfaces>(), &before);
    }

    #[derive(Resource, Default)]
    struct SeenFailures(Vec<RequestFailed>);

    fn record_failures(mut ev: EventReader<RequestFailed>, mut seen: ResMut<SeenFailures>) {
        seen.0.extend(ev.read().cloned());
    }

    #[test]
    fn propagated_failure_is_reported_once() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_reply(Ok("ok".into()))
                .with_stream_error(ProviderError::Quota("HTTP 429".into())),
        );
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        let config = TravelConfig::new("KEY");
        app.insert_resource(
            TravelServices::new(client, &config).with_recommendation_policy(FailurePolicy::Propagate),
        );
        app.insert_resource(config);
        app.add_plugins((TravelPlugin, TravelUiPlugin));
        app.init_resource::<SeenFailures>();
        app.add_systems(Update, record_failures.after(TravelSet::Drain));

        app.world_mut().send_event(PresetPressed(0));
        assert!(update_until(&mut app, |app| !app.world().resource::<SeenFailures>().0.is_empty()));
        for _ in 0..5 {
            app.update();
        }

        let seen = &app.world().resource::<SeenFailures>().0;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, RequestKind::Recommendation);
        assert!(seen[0].error.contains("HTTP 429"), "error: {}", seen[0].error);
    }
}
