//! page wiring: theme, presets, the directions form and the first request.
//!
//! front-ends (the dom module on wasm, bevy_ui in the native example) only
//! send `PresetPressed` / `DirectionsSubmitted` and read `DisplaySurfaces`.

use bevy::prelude::*;

use crate::config::TravelConfig;
use crate::{DirectionsRequested, RecommendRequested, RequestFailed, TravelSet};

pub const DEFAULT_ORIGIN: &str = "Mountain View, CA";
pub const DEFAULT_DESTINATION: &str = "San Francisco, CA";

/// a one-click canned prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        label: "Hidden island",
        prompt: "Recommend a remote island most people have never heard of.",
    },
    Preset {
        label: "Mountain silence",
        prompt: "I want a mountain village where I can hike for a week without crowds.",
    },
    Preset {
        label: "Street food",
        prompt: "Send me to a city whose street food is better than its restaurants.",
    },
    Preset {
        label: "Ancient ruins",
        prompt: "Find me ruins as impressive as the famous ones, minus the tour buses.",
    },
    Preset {
        label: "Strange landscapes",
        prompt: "Show me a landscape that looks like it belongs on another planet.",
    },
    Preset {
        label: "Winter light",
        prompt: "Where should I go to see the northern lights somewhere unexpected?",
    },
];

#[derive(Resource, Debug, Clone)]
pub struct Presets(pub Vec<Preset>);

impl Default for Presets {
    fn default() -> Self {
        Self(PRESETS.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScheme {
    Light,
    #[default]
    Dark,
}

impl ColorScheme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// value for the page's theme attribute; `None` keeps the default stylesheet.
    pub fn theme_attr(self) -> Option<&'static str> {
        match self {
            Self::Light => Some("light"),
            Self::Dark => None,
        }
    }
}

/// detected once at startup.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Theme(pub ColorScheme);

#[cfg(target_arch = "wasm32")]
fn ambient_color_scheme() -> ColorScheme {
    let light = web_sys::window()
        .and_then(|w| w.match_media("(prefers-color-scheme: light)").ok().flatten())
        .is_some_and(|mql| mql.matches());
    if light { ColorScheme::Light } else { ColorScheme::Dark }
}

#[cfg(not(target_arch = "wasm32"))]
fn ambient_color_scheme() -> ColorScheme {
    ColorScheme::default()
}

pub fn detect_color_scheme(config: Option<&TravelConfig>) -> ColorScheme {
    config.and_then(|c| c.color_scheme).unwrap_or_else(ambient_color_scheme)
}

/// the two text inputs of the directions form.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct DirectionsForm {
    pub origin: String,
    pub destination: String,
}

impl Default for DirectionsForm {
    fn default() -> Self {
        Self { origin: DEFAULT_ORIGIN.to_string(), destination: DEFAULT_DESTINATION.to_string() }
    }
}

#[derive(Event, Debug, Clone, Copy)]
pub struct PresetPressed(pub usize);

/// submit the form with its current values.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct DirectionsSubmitted;

/// ui systems run before requests are spawned.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub struct UiDispatch;

pub struct TravelUiPlugin;

impl Plugin for TravelUiPlugin {
    fn build(&self, app: &mut App) {
        info!(target: "bevy_travel_llm", "TravelUiPlugin: build()");
        app.init_resource::<Presets>()
            .init_resource::<DirectionsForm>()
            .add_event::<PresetPressed>()
            .add_event::<DirectionsSubmitted>()
            .add_systems(Startup, setup_page)
            .configure_sets(Update, UiDispatch.before(TravelSet::Spawn))
            .add_systems(Update, (dispatch_presets, dispatch_directions).in_set(UiDispatch))
            .add_systems(Update, log_request_failures.after(TravelSet::Drain));
    }
}

/// theme + first directions request, so the page isn't empty on load.
fn setup_page(
    mut commands: Commands,
    config: Option<Res<TravelConfig>>,
    form: Res<DirectionsForm>,
    mut ev_directions: EventWriter<DirectionsRequested>,
) {
    let scheme = detect_color_scheme(config.as_deref());
    info!(target: "bevy_travel_llm", "setup_page: color scheme {:?}", scheme);
    commands.insert_resource(Theme(scheme));

    ev_directions.write(DirectionsRequested {
        origin: form.origin.clone(),
        destination: form.destination.clone(),
    });
}

fn dispatch_presets(
    mut ev: EventReader<PresetPressed>,
    presets: Res<Presets>,
    mut ev_recommend: EventWriter<RecommendRequested>,
) {
    for PresetPressed(index) in ev.read() {
        match presets.0.get(*index) {
            Some(preset) => {
                info!(target: "bevy_travel_llm", "preset '{}' pressed", preset.label);
                ev_recommend.write(RecommendRequested { prompt: preset.prompt.to_string() });
            }
            None => warn!(target: "bevy_travel_llm", "no preset at index {}", index),
        }
    }
}

fn dispatch_directions(
    mut ev: EventReader<DirectionsSubmitted>,
    form: Res<DirectionsForm>,
    mut ev_directions: EventWriter<DirectionsRequested>,
) {
    for _ in ev.read() {
        ev_directions.write(DirectionsRequested {
            origin: form.origin.clone(),
            destination: form.destination.clone(),
        });
    }
}

/// failures are for developers only; the page keeps its last good state.
fn log_request_failures(mut ev: EventReader<RequestFailed>) {
    for RequestFailed { kind, token, error } in ev.read() {
        error!(target: "bevy_travel_llm", "{:?} request {} failed: {}", kind, token, error);
    }
}
