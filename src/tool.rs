//! tool (function-call) declarations and typed invocations.
//!
//! the provider hands back `{name, args}` with an untyped argument map. we only
//! act on names we know, and only after the arguments deserialize into the
//! matching record.

use serde::Deserialize;
use serde_json::Value;

use crate::ToolCall;
use crate::error::TravelError;

pub const RECOMMEND_PLACE: &str = "recommendPlace";

/// a function the model may call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamDeclaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDeclaration {
    pub name: &'static str,
    /// json-schema type name
    pub kind: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl FunctionDeclaration {
    pub fn required(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.to_string())
            .collect()
    }
}

pub fn recommend_place_declaration() -> FunctionDeclaration {
    FunctionDeclaration {
        name: RECOMMEND_PLACE,
        description: "Show the user a place on a map together with a short narrated caption.",
        params: vec![
            ParamDeclaration {
                name: "location",
                kind: "string",
                description: "Place name, specific enough for a map search, e.g. 'Socotra, Yemen'.",
                required: true,
            },
            ParamDeclaration {
                name: "caption",
                kind: "string",
                description: "Two or three narrated sentences about why the place is worth visiting.",
                required: true,
            },
        ],
    }
}

/// a function call as the provider reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawToolCall {
    pub name: String,
    pub args: Value,
}

impl RawToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self { name: name.into(), args }
    }

    /// providers disagree on the shape (`function.arguments` vs `arguments`,
    /// json-in-a-string vs object), so go through json instead of fields.
    pub fn from_llm(call: &ToolCall) -> Option<Self> {
        let v = serde_json::to_value(call).ok()?;
        let func = v.get("function").unwrap_or(&v);
        let name = func.get("name").and_then(Value::as_str)?.to_string();
        let args = match func.get("arguments").or_else(|| func.get("args")) {
            Some(Value::String(s)) if s.trim().is_empty() => Value::Object(Default::default()),
            Some(Value::String(s)) => serde_json::from_str::<Value>(s).unwrap_or(Value::Null),
            Some(other) => other.clone(),
            None => Value::Null,
        };
        Some(Self { name, args })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecommendPlace {
    pub location: String,
    pub caption: String,
}

/// the calls this app knows how to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    RecommendPlace(RecommendPlace),
}

impl ToolInvocation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RecommendPlace(_) => RECOMMEND_PLACE,
        }
    }
}

impl TryFrom<&RawToolCall> for ToolInvocation {
    type Error = TravelError;

    fn try_from(call: &RawToolCall) -> Result<Self, Self::Error> {
        match call.name.as_str() {
            RECOMMEND_PLACE => serde_json::from_value::<RecommendPlace>(call.args.clone())
                .map(Self::RecommendPlace)
                .map_err(|e| TravelError::MalformedToolInvocation {
                    function: RECOMMEND_PLACE.to_string(),
                    reason: e.to_string(),
                }),
            other => Err(TravelError::UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn recommend_place_parses() {
        let raw = RawToolCall::new(
            RECOMMEND_PLACE,
            json!({"location": "Socotra, Yemen", "caption": "dragon blood trees"}),
        );
        let inv = ToolInvocation::try_from(&raw).unwrap();
        assert_eq!(
            inv,
            ToolInvocation::RecommendPlace(RecommendPlace {
                location: "Socotra, Yemen".into(),
                caption: "dragon blood trees".into(),
            })
        );
        assert_eq!(inv.name(), "recommendPlace");
    }

    #[test]
    fn missing_field_is_malformed() {
        let raw = RawToolCall::new(RECOMMEND_PLACE, json!({"location": "Socotra, Yemen"}));
        match ToolInvocation::try_from(&raw) {
            Err(TravelError::MalformedToolInvocation { function, reason }) => {
                assert_eq!(function, RECOMMEND_PLACE);
                assert!(reason.contains("caption"), "reason: {reason}");
            }
            other => panic!("expected malformed invocation, got {other:?}"),
        }
    }

    #[test]
    fn non_string_field_is_malformed() {
        let raw = RawToolCall::new(RECOMMEND_PLACE, json!({"location": 12, "caption": "x"}));
        assert!(matches!(
            ToolInvocation::try_from(&raw),
            Err(TravelError::MalformedToolInvocation { .. })
        ));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let raw = RawToolCall::new("bookFlight", json!({}));
        assert_eq!(
            ToolInvocation::try_from(&raw),
            Err(TravelError::UnknownTool("bookFlight".into()))
        );
    }

    #[test]
    fn declaration_requires_both_fields() {
        let decl = recommend_place_declaration();
        assert_eq!(decl.name, RECOMMEND_PLACE);
        assert_eq!(decl.required(), vec!["location".to_string(), "caption".to_string()]);
    }

    #[test]
    fn llm_tool_call_with_string_arguments() {
        let call: ToolCall = serde_json::from_value(json!({
            "id": "call_1",
            "type": "function",
            "function": {
                "name": "recommendPlace",
                "arguments": "{\"location\":\"Lofoten, Norway\",\"caption\":\"fish racks\"}"
            }
        }))
        .unwrap();
        let raw = RawToolCall::from_llm(&call).unwrap();
        assert_eq!(raw.name, RECOMMEND_PLACE);
        assert_eq!(raw.args["location"], "Lofoten, Norway");
    }
}
