//! runtime configuration.
//!
//! env:
//!   GEMINI_API_KEY       (required; read at compile time on wasm)
//!   TRAVEL_MODEL         (default gemini-2.5-flash)
//!   TRAVEL_TEMPERATURE   (default 2.0)
//!   TRAVEL_COLOR_SCHEME  (light | dark, native only)

use bevy::prelude::*;
use thiserror::Error;

use crate::ui::ColorScheme;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "TRAVEL_MODEL";
pub const TEMPERATURE_VAR: &str = "TRAVEL_TEMPERATURE";
pub const COLOR_SCHEME_VAR: &str = "TRAVEL_COLOR_SCHEME";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// high on purpose: we want surprising places, not the same three capitals.
pub const DEFAULT_TEMPERATURE: f32 = 2.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required variable {var}")]
    MissingApiKey { var: &'static str },
    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Resource, Clone)]
pub struct TravelConfig {
    /// shared by the generation api and the maps embed api.
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    /// explicit theme; `None` means detect.
    pub color_scheme: Option<ColorScheme>,
}

impl std::fmt::Debug for TravelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TravelConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("color_scheme", &self.color_scheme)
            .finish()
    }
}

impl TravelConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            color_scheme: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_color_scheme(mut self, scheme: ColorScheme) -> Self {
        self.color_scheme = Some(scheme);
        self
    }

    /// native: process environment.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// wasm: values baked in at build time.
    #[cfg(target_arch = "wasm32")]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| {
            let value = match var {
                API_KEY_VAR => option_env!("GEMINI_API_KEY"),
                MODEL_VAR => option_env!("TRAVEL_MODEL"),
                TEMPERATURE_VAR => option_env!("TRAVEL_TEMPERATURE"),
                _ => None,
            };
            value.map(str::to_string)
        })
    }

    /// builds a config from any `var -> value` source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(API_KEY_VAR)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey { var: API_KEY_VAR })?;

        let mut cfg = Self::new(api_key);

        if let Some(model) = lookup(MODEL_VAR).filter(|m| !m.trim().is_empty()) {
            cfg.model = model.trim().to_string();
        }

        if let Some(raw) = lookup(TEMPERATURE_VAR) {
            cfg.temperature = raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|t| t.is_finite() && *t >= 0.0)
                .ok_or_else(|| ConfigError::InvalidValue { var: TEMPERATURE_VAR, value: raw.clone() })?;
        }

        if let Some(raw) = lookup(COLOR_SCHEME_VAR) {
            let scheme = ColorScheme::parse(&raw)
                .ok_or_else(|| ConfigError::InvalidValue { var: COLOR_SCHEME_VAR, value: raw.clone() })?;
            cfg.color_scheme = Some(scheme);
        }

        info!(target: "bevy_travel_llm",
            "config: model='{}', temperature={}, key_present=true, color_scheme={:?}",
            cfg.model, cfg.temperature, cfg.color_scheme
        );
        Ok(cfg)
    }
}
