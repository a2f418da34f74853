//! Schema description of a pass's configurable surface.
//!
//! A schema lists mutually exclusive methods, the parameters each method
//! reads, and per-parameter type, range, default and visibility. UIs are
//! generated from it instead of being hand-written per pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::dynamic::{DynamicParameters, ParamValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Boolean,
    Integer,
    Number,
    String,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    Slider,
    Dropdown,
    Checkbox,
    Textfield,
    Number,
}

/// One clause of a visibility predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    OneOf(Vec<ParamValue>),
    Equals(ParamValue),
}

impl Condition {
    fn matches(&self, actual: &ParamValue) -> bool {
        match self {
            Condition::Equals(expected) => values_equal(expected, actual),
            Condition::OneOf(options) => options.iter().any(|o| values_equal(o, actual)),
        }
    }
}

fn values_equal(a: &ParamValue, b: &ParamValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// AND of per-parameter equality/membership clauses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisibilityPredicate(pub BTreeMap<String, Condition>);

impl VisibilityPredicate {
    /// Pure: same bag in, same answer out. `method` resolves to the selected method id;
    /// names the bag leaves out take their value from `defaults`.
    pub fn evaluate(&self, params: &DynamicParameters, defaults: &BTreeMap<String, ParamValue>) -> bool {
        self.0.iter().all(|(name, condition)| {
            let actual = match params.values.get(name) {
                Some(v) => v.clone(),
                None if name == "method" => ParamValue::from(params.method.clone()),
                None => defaults.get(name).cloned().unwrap_or(ParamValue::Unset),
            };
            condition.matches(&actual)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VapourSynthConfig {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterUiConfig {
    pub label: Option<String>,
    pub description: Option<String>,
    pub widget: Option<WidgetType>,
    pub precision: Option<i32>,
    pub hidden: Option<bool>,
    pub visible_when: Option<VisibilityPredicate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default = "unset")]
    pub default: ParamValue,
    /// May be absent, meaning "leave the tool's own default in place".
    #[serde(default)]
    pub optional: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub options: Option<Vec<String>>,
    pub vapoursynth: Option<VapourSynthConfig>,
    pub ui: Option<ParameterUiConfig>,
}

fn unset() -> ParamValue {
    ParamValue::Unset
}

impl ParameterDefinition {
    fn in_range(&self, v: f64) -> bool {
        self.min.map_or(true, |min| v >= min) && self.max.map_or(true, |max| v <= max)
    }

    pub fn is_valid_value(&self, value: &ParamValue) -> bool {
        match (self.param_type, value) {
            (_, ParamValue::Unset) => self.optional,
            (ParameterType::Boolean, ParamValue::Bool(_)) => true,
            (ParameterType::Integer, ParamValue::Int(i)) => self.in_range(*i as f64),
            (ParameterType::Number, v) => v.as_f64().map_or(false, |f| self.in_range(f)),
            (ParameterType::String, ParamValue::Str(_)) => true,
            (ParameterType::Enum, ParamValue::Str(s)) => {
                self.options.as_ref().map_or(true, |opts| opts.contains(s))
            }
            _ => false,
        }
    }

    pub fn is_visible(&self, params: &DynamicParameters, defaults: &BTreeMap<String, ParamValue>) -> bool {
        let Some(ui) = &self.ui else {
            return true;
        };
        if ui.hidden.unwrap_or(false) {
            return false;
        }
        ui.visible_when
            .as_ref()
            .map_or(true, |predicate| predicate.evaluate(params, defaults))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDefinition {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// VapourSynth function the worker calls, e.g. `haf.DeHalo_alpha`.
    pub function: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSchema {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub methods: Vec<MethodDefinition>,
    pub parameters: BTreeMap<String, ParameterDefinition>,
    pub presets: Option<BTreeMap<String, BTreeMap<String, ParamValue>>>,
}

impl FilterSchema {
    pub fn default_method(&self) -> Option<&MethodDefinition> {
        self.methods.first()
    }

    pub fn get_method(&self, id: &str) -> Option<&MethodDefinition> {
        self.methods.iter().find(|m| m.id == id)
    }

    pub fn get_defaults(&self) -> BTreeMap<String, ParamValue> {
        self.parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.default.clone()))
            .collect()
    }

    /// A fresh bag holding every default and the first method.
    pub fn default_parameters(&self, enabled: bool) -> DynamicParameters {
        DynamicParameters {
            filter_id: self.id.clone(),
            enabled,
            method: self.default_method().map(|m| m.id.clone()),
            values: self.get_defaults(),
        }
    }

    /// Lists every problem with the bag; empty means valid.
    pub fn validate(&self, params: &DynamicParameters) -> Vec<String> {
        let mut errors = Vec::new();

        if params.filter_id != self.id {
            errors.push(format!("Filter id mismatch: {} != {}", params.filter_id, self.id));
        }

        if let Some(method) = &params.method {
            if self.get_method(method).is_none() {
                errors.push(format!("Unknown method: {}", method));
            }
        }

        for (key, value) in &params.values {
            match self.parameters.get(key) {
                Some(definition) => {
                    if !definition.is_valid_value(value) {
                        errors.push(format!("Invalid value for {}: {:?}", key, value));
                    }
                }
                None => errors.push(format!("Unknown parameter: {}", key)),
            }
        }

        errors
    }

    /// Parameters the selected method reads whose predicates currently hold.
    pub fn visible_parameters(&self, params: &DynamicParameters) -> Vec<&str> {
        let method = params
            .method
            .as_deref()
            .and_then(|id| self.get_method(id))
            .or_else(|| self.default_method());
        let defaults = self.get_defaults();

        self.parameters
            .iter()
            .filter(|(name, _)| method.map_or(true, |m| m.parameters.iter().any(|p| p == *name)))
            .filter(|(_, definition)| definition.is_visible(params, &defaults))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Overlays a named preset onto the bag. Returns false if the preset does not exist.
    pub fn apply_preset(&self, preset: &str, params: &mut DynamicParameters) -> bool {
        let Some(values) = self.presets.as_ref().and_then(|p| p.get(preset)) else {
            return false;
        };
        for (name, value) in values {
            if name == "method" {
                if let ParamValue::Str(id) = value {
                    params.method = Some(id.clone());
                }
            } else {
                params.values.insert(name.clone(), value.clone());
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEHALO_SCHEMA: &str = r#"{
        "id": "dehalo",
        "version": "1.0.0",
        "name": "Dehalo",
        "category": "cleanup",
        "order": 30,
        "methods": [
            {"id": "DeHalo_alpha", "name": "DeHalo alpha", "function": "haf.DeHalo_alpha",
             "parameters": ["rx", "ry", "darkStr", "brightStr"]},
            {"id": "YAHR", "name": "YAHR", "function": "haf.YAHR",
             "parameters": ["yahrBlur", "yahrDepth"]}
        ],
        "parameters": {
            "rx": {"type": "number", "default": 2.0, "min": 1.0, "max": 3.0},
            "ry": {"type": "number", "default": 2.0, "min": 1.0, "max": 3.0},
            "darkStr": {"type": "number", "default": 1.0,
                        "ui": {"visibleWhen": {"brightStr": [0.5, 1.0]}}},
            "brightStr": {"type": "number", "default": 1.0},
            "yahrBlur": {"type": "integer", "default": 2},
            "yahrDepth": {"type": "integer", "default": 32, "optional": true,
                          "ui": {"visibleWhen": {"method": "YAHR"}}}
        },
        "presets": {
            "strong": {"method": "YAHR", "yahrDepth": 48}
        }
    }"#;

    fn schema() -> FilterSchema {
        serde_json::from_str(DEHALO_SCHEMA).unwrap()
    }

    #[test]
    fn test_defaults_use_first_method() {
        let params = schema().default_parameters(true);
        assert_eq!(params.method.as_deref(), Some("DeHalo_alpha"));
        assert_eq!(params.values.get("yahrBlur"), Some(&ParamValue::Int(2)));
    }

    #[test]
    fn test_validate_reports_unknown_and_out_of_range() {
        let schema = schema();
        let mut params = schema.default_parameters(true);
        params.set("rx", 5.0);
        params.set("haloSize", 3);

        let errors = schema.validate(&params);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("Unknown parameter: haloSize")));
    }

    #[test]
    fn test_optional_parameter_may_be_unset() {
        let schema = schema();
        let mut params = schema.default_parameters(true);
        params.set("yahrDepth", ParamValue::Unset);
        assert!(schema.validate(&params).is_empty());

        params.set("yahrBlur", ParamValue::Unset);
        assert_eq!(schema.validate(&params).len(), 1);
    }

    #[test]
    fn test_visibility_is_pure_and_order_independent() {
        let schema = schema();
        let mut params = schema.default_parameters(true);
        params.set("brightStr", 0.5);

        let first = schema.visible_parameters(&params);
        let second = schema.visible_parameters(&params);
        assert_eq!(first, second);
        assert!(first.contains(&"darkStr"));

        params.set("brightStr", 2);
        assert!(!schema.visible_parameters(&params).contains(&"darkStr"));
    }

    #[test]
    fn test_method_scopes_visible_parameters() {
        let schema = schema();
        let mut params = schema.default_parameters(true);
        assert!(!schema.visible_parameters(&params).contains(&"yahrDepth"));

        assert!(schema.apply_preset("strong", &mut params));
        assert_eq!(params.method.as_deref(), Some("YAHR"));
        assert_eq!(schema.visible_parameters(&params), vec!["yahrBlur", "yahrDepth"]);
        assert!(!schema.apply_preset("missing", &mut params));
    }

    #[test]
    fn test_int_matches_float_condition() {
        let predicate: VisibilityPredicate =
            serde_json::from_str(r#"{"range": 15.0, "mode": ["a", "b"]}"#).unwrap();
        let params = DynamicParameters {
            filter_id: "deband".to_string(),
            enabled: true,
            method: None,
            values: BTreeMap::from([
                ("range".to_string(), ParamValue::Int(15)),
                ("mode".to_string(), ParamValue::Str("b".to_string())),
            ]),
        };
        assert!(predicate.evaluate(&params, &BTreeMap::new()));
    }

    #[test]
    fn test_missing_values_resolve_to_defaults() {
        let schema = schema();
        let mut params = schema.default_parameters(true);
        params.values.remove("brightStr");

        // brightStr defaults to 1.0, which satisfies darkStr's predicate
        assert!(schema.visible_parameters(&params).contains(&"darkStr"));

        let predicate = VisibilityPredicate(BTreeMap::from([(
            "brightStr".to_string(),
            Condition::Equals(ParamValue::Float(1.0)),
        )]));
        assert!(!predicate.evaluate(&params, &BTreeMap::new()));
        assert!(predicate.evaluate(&params, &schema.get_defaults()));
    }
}
