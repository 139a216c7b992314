//! browser front-end: mirrors `DisplaySurfaces` into the page and turns
//! clicks into ui events.
//!
//! expects the element ids below (see `web/index.html`). dom callbacks can't
//! reach the world, so they push into a channel drained once per frame.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use flume::{Receiver, Sender};
use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlInputElement};

use crate::ui::{DirectionsForm, DirectionsSubmitted, PresetPressed, Presets, Theme};
use crate::{DisplaySurfaces, TextSurface, TextSurfaceId, TravelConfig, TravelPlugin, TravelServices, TravelSet, TravelUiPlugin};

pub const CAPTION_ID: &str = "caption";
pub const DIRECTIONS_ID: &str = "directions-result";
pub const MAP_FRAME_ID: &str = "map-frame";
pub const PRESETS_ID: &str = "preset-buttons";
pub const ORIGIN_ID: &str = "origin-input";
pub const DESTINATION_ID: &str = "destination-input";
pub const SUBMIT_ID: &str = "directions-submit";

#[derive(Error, Debug)]
pub enum DomError {
    #[error("no browser window/document")]
    NoWindow,
    #[error("missing element #{0}")]
    MissingElement(&'static str),
    #[error("dom call failed: {0}")]
    Js(String),
}

impl From<JsValue> for DomError {
    fn from(v: JsValue) -> Self {
        Self::Js(format!("{v:?}"))
    }
}

enum DomMsg {
    Preset(usize),
    Submit { origin: String, destination: String },
}

#[derive(Resource, Clone)]
struct DomInbox {
    tx: Sender<DomMsg>,
    rx: Receiver<DomMsg>,
}

impl Default for DomInbox {
    fn default() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }
}

fn document() -> Result<Document, DomError> {
    web_sys::window().and_then(|w| w.document()).ok_or(DomError::NoWindow)
}

fn element(doc: &Document, id: &'static str) -> Result<Element, DomError> {
    doc.get_element_by_id(id).ok_or(DomError::MissingElement(id))
}

fn input(doc: &Document, id: &'static str) -> Result<HtmlInputElement, DomError> {
    element(doc, id)?
        .dyn_into::<HtmlInputElement>()
        .map_err(|_| DomError::Js(format!("#{id} is not an <input>")))
}

pub struct DomPlugin;

impl Plugin for DomPlugin {
    fn build(&self, app: &mut App) {
        info!(target: "bevy_travel_llm", "DomPlugin: build()");
        app.init_resource::<DomInbox>()
            // after setup_page has inserted the theme
            .add_systems(PostStartup, mount)
            .add_systems(Update, drain_dom_inbox.before(TravelSet::Spawn))
            .add_systems(Update, sync_surfaces.after(TravelSet::Drain));
    }
}

fn mount(theme: Res<Theme>, presets: Res<Presets>, form: Res<DirectionsForm>, inbox: Res<DomInbox>) {
    if let Err(err) = try_mount(&theme, &presets, &form, &inbox.tx) {
        error!(target: "bevy_travel_llm", "dom mount failed: {}", err);
    }
}

fn try_mount(
    theme: &Theme,
    presets: &Presets,
    form: &DirectionsForm,
    tx: &Sender<DomMsg>,
) -> Result<(), DomError> {
    let doc = document()?;

    if let (Some(root), Some(attr)) = (doc.document_element(), theme.0.theme_attr()) {
        root.set_attribute("data-theme", attr)?;
    }

    let container = element(&doc, PRESETS_ID)?;
    for (index, preset) in presets.0.iter().enumerate() {
        let button = doc.create_element("button")?;
        button.set_text_content(Some(preset.label));
        let tx = tx.clone();
        let on_click = Closure::<dyn FnMut()>::new(move || {
            let _ = tx.send(DomMsg::Preset(index));
        });
        button.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        // lives as long as the page
        on_click.forget();
        container.append_child(&button)?;
    }

    input(&doc, ORIGIN_ID)?.set_value(&form.origin);
    input(&doc, DESTINATION_ID)?.set_value(&form.destination);

    let submit = element(&doc, SUBMIT_ID)?;
    let tx = tx.clone();
    let on_submit = Closure::<dyn FnMut()>::new(move || {
        let read = || -> Result<DomMsg, DomError> {
            let doc = document()?;
            Ok(DomMsg::Submit {
                origin: input(&doc, ORIGIN_ID)?.value(),
                destination: input(&doc, DESTINATION_ID)?.value(),
            })
        };
        match read() {
            Ok(msg) => {
                let _ = tx.send(msg);
            }
            Err(err) => error!(target: "bevy_travel_llm", "reading directions form: {}", err),
        }
    });
    submit.add_event_listener_with_callback("click", on_submit.as_ref().unchecked_ref())?;
    on_submit.forget();

    info!(target: "bevy_travel_llm", "dom mounted: {} preset button(s)", presets.0.len());
    Ok(())
}

fn drain_dom_inbox(
    inbox: Res<DomInbox>,
    mut form: ResMut<DirectionsForm>,
    mut ev_preset: EventWriter<PresetPressed>,
    mut ev_submit: EventWriter<DirectionsSubmitted>,
) {
    for msg in inbox.rx.try_iter() {
        match msg {
            DomMsg::Preset(index) => {
                ev_preset.write(PresetPressed(index));
            }
            DomMsg::Submit { origin, destination } => {
                form.origin = origin;
                form.destination = destination;
                ev_submit.write(DirectionsSubmitted);
            }
        }
    }
}

fn write_text(doc: &Document, id: &'static str, surface: &TextSurface) -> Result<(), DomError> {
    let el = element(doc, id)?;
    el.set_text_content(Some(&surface.text));
    if surface.visible {
        el.remove_attribute("hidden")?;
    } else {
        el.set_attribute("hidden", "")?;
    }
    Ok(())
}

fn sync_surfaces(surfaces: Res<DisplaySurfaces>) {
    if !surfaces.is_changed() {
        return;
    }
    let sync = || -> Result<(), DomError> {
        let doc = document()?;
        for (id, el) in [(TextSurfaceId::Caption, CAPTION_ID), (TextSurfaceId::Directions, DIRECTIONS_ID)] {
            write_text(&doc, el, surfaces.text(id))?;
        }
        if let Some(src) = &surfaces.map.src {
            let frame = element(&doc, MAP_FRAME_ID)?;
            // assigning the same src reloads the frame
            if frame.get_attribute("src").as_deref() != Some(src.as_str()) {
                frame.set_attribute("src", src)?;
            }
        }
        Ok(())
    };
    if let Err(err) = sync() {
        error!(target: "bevy_travel_llm", "dom sync failed: {}", err);
    }
}

/// wasm entry point; call from the page once the module is loaded.
#[wasm_bindgen]
pub fn web_main() {
    console_error_panic_hook::set_once();

    let mut app = App::new();
    app.add_plugins(MinimalPlugins).add_plugins(LogPlugin::default());

    let config = match TravelConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(target: "bevy_travel_llm", "cannot start: {}", err);
            return;
        }
    };

    app.insert_resource(TravelServices::from_config(&config))
        .insert_resource(config)
        .add_plugins((TravelPlugin, TravelUiPlugin, DomPlugin))
        .run();
}
