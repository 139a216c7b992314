//! embeddable map urls.
//!
//! nothing here touches the network: the front-end assigns the url to its map
//! frame and the browser fetches it. unknown places render as a provider-side
//! "not found" map, not an error.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::session::SurfaceWriter;
use crate::surface::SurfaceOp;

pub const EMBED_BASE: &str = "https://www.google.com/maps/embed/v1";

/// same set as javascript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

pub fn place_map_url(api_key: &str, location: &str) -> String {
    format!("{EMBED_BASE}/place?key={}&q={}", encode(api_key), encode(location))
}

pub fn directions_map_url(api_key: &str, origin: &str, destination: &str) -> String {
    format!(
        "{EMBED_BASE}/directions?key={}&origin={}&destination={}",
        encode(api_key),
        encode(origin),
        encode(destination)
    )
}

/// the url with its `key` parameter dropped, for logs and plain-text displays.
pub fn without_key(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let rest: Vec<&str> = query.split('&').filter(|kv| !kv.starts_with("key=")).collect();
    if rest.is_empty() { base.to_string() } else { format!("{base}?{}", rest.join("&")) }
}

/// builds map urls with the maps key and pushes them to the map frame.
#[derive(Clone)]
pub struct MapRenderer {
    api_key: String,
}

impl MapRenderer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into() }
    }

    pub fn render_place(&self, location: &str, out: &SurfaceWriter) {
        out.send(SurfaceOp::SetMapSource(place_map_url(&self.api_key, location)));
    }

    pub fn render_directions(&self, origin: &str, destination: &str, out: &SurfaceWriter) {
        out.send(SurfaceOp::SetMapSource(directions_map_url(&self.api_key, origin, destination)));
    }
}
