// Filter schema and pass parameter commands
use crate::error::{Error, Result};
use crate::models::{DynamicParameters, FilterSchema, PassKind, RestorationPipeline};
use crate::AppState;

/// Schemas ordered for display.
pub fn list_filters(state: &AppState) -> Vec<FilterSchema> {
    state.filters().ordered_filters().into_iter().cloned().collect()
}

pub fn get_filter(state: &AppState, id: &str) -> Option<FilterSchema> {
    state.filters().get(id).cloned()
}

pub fn get_pass_parameters(pipeline: &RestorationPipeline, pass: PassKind) -> DynamicParameters {
    pipeline.to_dynamic_parameters(pass)
}

/// Writes an edited bag back into a copy of the pipeline. The bag is checked against its
/// schema first when one is loaded.
pub fn apply_pass_parameters(
    state: &AppState,
    pipeline: &RestorationPipeline,
    params: &DynamicParameters,
) -> Result<RestorationPipeline> {
    let pass = PassKind::from_filter_id(&params.filter_id)
        .ok_or_else(|| Error::InvalidArgument(format!("Unknown filter: {}", params.filter_id)))?;

    if let Some(schema) = state.filters().get(&params.filter_id) {
        let errors = schema.validate(params);
        if !errors.is_empty() {
            return Err(Error::schema_mismatch(pass.filter_id(), "values", errors.join("; ")));
        }
    }

    pipeline.from_dynamic_parameters(pass, params)
}

/// Returns false when the schema has no preset by that name.
pub fn apply_preset(state: &AppState, params: &mut DynamicParameters, preset: &str) -> Result<bool> {
    let schema = state
        .filters()
        .get(&params.filter_id)
        .ok_or_else(|| Error::InvalidArgument(format!("No schema for filter: {}", params.filter_id)))?;
    Ok(schema.apply_preset(preset, params))
}

/// Names of the parameters a UI should show for the bag's current values.
pub fn visible_parameters(state: &AppState, params: &DynamicParameters) -> Vec<String> {
    match state.filters().get(&params.filter_id) {
        Some(schema) => schema
            .visible_parameters(params)
            .into_iter()
            .map(str::to_string)
            .collect(),
        None => params.values.keys().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParamValue, Settings};
    use crate::test_support::{missing_installer, state_with};
    use std::path::Path;

    const DEHALO_SCHEMA: &str = r#"{
        "id": "dehalo",
        "version": "1.0.0",
        "name": "Dehalo",
        "order": 30,
        "methods": [
            {"id": "DeHalo_alpha", "name": "DeHalo alpha", "function": "haf.DeHalo_alpha",
             "parameters": ["rx", "ry"]},
            {"id": "YAHR", "name": "YAHR", "function": "haf.YAHR", "parameters": ["yahrDepth"]}
        ],
        "parameters": {
            "rx": {"type": "number", "default": 2.0, "min": 1.0, "max": 3.0},
            "ry": {"type": "number", "default": 2.0, "min": 1.0, "max": 3.0},
            "yahrDepth": {"type": "integer", "default": 32}
        },
        "presets": {"strong": {"method": "YAHR", "yahrDepth": 48}}
    }"#;

    const DEBLOCK_SCHEMA: &str = r#"{
        "id": "deblock", "version": "1.0.0", "name": "Deblock", "order": 40,
        "parameters": {"quant1": {"type": "integer", "default": 24}}
    }"#;

    fn state(dir: &Path) -> AppState {
        let filters = dir.join("filters");
        std::fs::create_dir_all(&filters).unwrap();
        std::fs::write(filters.join("dehalo.json"), DEHALO_SCHEMA).unwrap();
        std::fs::write(filters.join("deblock.json"), DEBLOCK_SCHEMA).unwrap();
        state_with(dir, Settings::default(), missing_installer(dir))
    }

    #[tokio::test]
    async fn test_filters_listed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let ids: Vec<String> = list_filters(&state).into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["dehalo".to_string(), "deblock".to_string()]);
        assert!(get_filter(&state, "sharpen").is_none());
    }

    #[tokio::test]
    async fn test_valid_edit_updates_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let pipeline = RestorationPipeline::default();

        let params = DynamicParameters::new(PassKind::Dehalo, true, Some("DeHalo_alpha")).with("rx", 2.5);
        let updated = apply_pass_parameters(&state, &pipeline, &params).unwrap();

        assert!(updated.dehalo.enabled);
        assert_eq!(updated.dehalo.rx, 2.5);
        assert_eq!(pipeline.dehalo.rx, 2.0);
    }

    #[tokio::test]
    async fn test_out_of_range_edit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let params = DynamicParameters::new(PassKind::Dehalo, true, None).with("rx", 7.0);
        let result = apply_pass_parameters(&state, &RestorationPipeline::default(), &params);
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    }

    #[tokio::test]
    async fn test_preset_and_visibility() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let mut params = DynamicParameters::new(PassKind::Dehalo, true, Some("DeHalo_alpha"));
        assert!(apply_preset(&state, &mut params, "strong").unwrap());
        assert_eq!(params.method.as_deref(), Some("YAHR"));
        assert_eq!(params.get("yahrDepth"), Some(&ParamValue::Int(48)));
        assert_eq!(visible_parameters(&state, &params), vec!["yahrDepth".to_string()]);

        assert!(!apply_preset(&state, &mut params, "gentle").unwrap());
    }

    #[test]
    fn test_pass_parameters_roundtrip_through_pipeline() {
        let mut pipeline = RestorationPipeline::default();
        pipeline.dehalo.rx = 2.75;

        let params = get_pass_parameters(&pipeline, PassKind::Dehalo);
        assert_eq!(params.filter_id, "dehalo");
        assert_eq!(params.get("rx"), Some(&ParamValue::Float(2.75)));
    }
}
