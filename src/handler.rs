//! the two request flows: streamed recommendation and one-shot directions.

use bevy::prelude::*;
use futures_lite::StreamExt;
use std::sync::Arc;

use crate::client::{GenerationRequest, GenerativeClient};
use crate::error::TravelError;
use crate::map::MapRenderer;
use crate::prompt::{SYSTEM_INSTRUCTIONS, compose, directions_question};
use crate::session::SurfaceWriter;
use crate::surface::TextSurfaceId;
use crate::tool::{RecommendPlace, ToolInvocation, recommend_place_declaration};

pub const CALCULATING: &str = "Calculating...";
pub const DIRECTIONS_FAILED: &str = "Could not estimate the travel time right now.";
pub const RECOMMENDATION_FAILED: &str = "Could not find a place right now.";

/// what a handler does with its own failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// log it; surfaces keep their last state.
    #[default]
    LogAndSwallow,
    /// log it and put a short failure line on the handler's text surface.
    ReportOnSurface,
    /// hand it to the caller.
    Propagate,
}

impl FailurePolicy {
    fn settle(
        self,
        err: TravelError,
        surface: TextSurfaceId,
        message: &str,
        out: &SurfaceWriter,
    ) -> Result<(), TravelError> {
        match self {
            Self::Propagate => Err(err),
            Self::LogAndSwallow => {
                error!(target: "bevy_travel_llm", "{:?} request failed: {}", surface, err);
                Ok(())
            }
            Self::ReportOnSurface => {
                error!(target: "bevy_travel_llm", "{:?} request failed: {}", surface, err);
                out.set_text(surface, message);
                out.show(surface);
                Ok(())
            }
        }
    }
}

#[derive(Clone)]
pub struct RecommendationHandler {
    client: Arc<dyn GenerativeClient>,
    maps: MapRenderer,
    model: String,
    temperature: f32,
    pub policy: FailurePolicy,
}

impl RecommendationHandler {
    pub fn new(
        client: Arc<dyn GenerativeClient>,
        maps: MapRenderer,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self { client, maps, model: model.into(), temperature, policy: FailurePolicy::LogAndSwallow }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn handle(&self, prompt: &str, out: &SurfaceWriter) -> Result<(), TravelError> {
        match self.run(prompt, out).await {
            Ok(()) => Ok(()),
            Err(err) => self.policy.settle(err, TextSurfaceId::Caption, RECOMMENDATION_FAILED, out),
        }
    }

    async fn run(&self, prompt: &str, out: &SurfaceWriter) -> Result<(), TravelError> {
        let request = GenerationRequest::streaming(&self.model, compose(SYSTEM_INSTRUCTIONS, prompt))
            .temperature(self.temperature)
            .tool(recommend_place_declaration());
        let mut stream = self.client.stream_generate(&request).await?;

        let mut first_chunk = true;
        let mut rendered: Option<RecommendPlace> = None;
        let mut chunks = 0usize;

        while let Some(item) = stream.next().await {
            if !out.is_current() {
                debug!(target: "bevy_travel_llm",
                    "recommendation {} superseded after {} chunk(s); stop reading", out.token().id(), chunks
                );
                return Ok(());
            }
            let chunk = item?;
            chunks += 1;

            if first_chunk {
                // switch the page into recommendation mode
                out.hide(TextSurfaceId::Directions);
                out.clear(TextSurfaceId::Caption);
                out.hide(TextSurfaceId::Caption);
                first_chunk = false;
            }

            for call in &chunk.tool_calls {
                let invocation = match ToolInvocation::try_from(call) {
                    Ok(inv) => inv,
                    Err(TravelError::UnknownTool(name)) => {
                        warn!(target: "bevy_travel_llm", "ignoring call to unknown tool '{}'", name);
                        continue;
                    }
                    Err(err) => return Err(err),
                };
                let tool = invocation.name();
                let ToolInvocation::RecommendPlace(place) = invocation;
                if let Some(shown) = &rendered {
                    debug!(target: "bevy_travel_llm",
                        "already showing '{}'; ignoring later {} pick '{}'", shown.location, tool, place.location
                    );
                    continue;
                }
                info!(target: "bevy_travel_llm", "{} -> '{}'", tool, place.location);
                self.maps.render_place(&place.location, out);
                out.set_text(TextSurfaceId::Caption, place.caption.clone());
                out.show(TextSurfaceId::Caption);
                rendered = Some(place);
            }
        }

        if rendered.is_none() {
            info!(target: "bevy_travel_llm", "stream ended after {} chunk(s) without a place", chunks);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct DirectionsHandler {
    client: Arc<dyn GenerativeClient>,
    maps: MapRenderer,
    model: String,
    pub policy: FailurePolicy,
}

impl DirectionsHandler {
    pub fn new(client: Arc<dyn GenerativeClient>, maps: MapRenderer, model: impl Into<String>) -> Self {
        Self { client, maps, model: model.into(), policy: FailurePolicy::ReportOnSurface }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// no-op (no request, no writes) when either end is blank.
    pub async fn handle(
        &self,
        origin: &str,
        destination: &str,
        out: &SurfaceWriter,
    ) -> Result<(), TravelError> {
        if origin.trim().is_empty() || destination.trim().is_empty() {
            debug!(target: "bevy_travel_llm", "directions skipped: origin or destination empty");
            return Ok(());
        }

        out.hide(TextSurfaceId::Caption);
        out.set_text(TextSurfaceId::Directions, CALCULATING);
        out.show(TextSurfaceId::Directions);

        let request = GenerationRequest::once(&self.model, directions_question(origin, destination));
        match self.client.generate_once(&request).await {
            Ok(text) => {
                info!(target: "bevy_travel_llm",
                    "directions '{}' -> '{}': {} chars", origin, destination, text.len()
                );
                out.set_text(TextSurfaceId::Directions, text);
                self.maps.render_directions(origin, destination, out);
                Ok(())
            }
            Err(err) => self.policy.settle(err.into(), TextSurfaceId::Directions, DIRECTIONS_FAILED, out),
        }
    }
}
