//! Fail-closed schema validation for model-extracted case records.
//! Runs between `extract_json_object()` and `CaseRegistry` construction;
//! a single bad field rejects the whole extraction.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::parser::JsonMap;
use super::{FatalConfigError, ValidationError, Violation};
use crate::models::{CaseRecord, CaseRegistry};

/// Fields every extracted case must carry.
pub const REQUIRED_KEYS: &[&str] = &[
    "case_name",
    "solver",
    "turbulence_model",
    "other_physical_model",
    "case_specific_description",
];

/// Identifier syntax for case names.
pub const IDENTIFIER_PATTERN: &str = r"^[A-Za-z0-9_]+$";

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(IDENTIFIER_PATTERN).unwrap());

/// Allowed values checked by the validator. Built once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSchema {
    solvers: Vec<String>,
    turbulence_models: Vec<String>,
}

impl CaseSchema {
    /// Build a schema, rejecting empty lists, blank or whitespace-bearing
    /// entries, and duplicates.
    pub fn new(
        solvers: &[String],
        turbulence_models: &[String],
    ) -> Result<Self, FatalConfigError> {
        Ok(Self {
            solvers: check_allowed_list("solver", solvers)?,
            turbulence_models: check_allowed_list("turbulence model", turbulence_models)?,
        })
    }

    pub fn solvers(&self) -> &[String] {
        &self.solvers
    }

    pub fn turbulence_models(&self) -> &[String] {
        &self.turbulence_models
    }

    pub fn allows_solver(&self, solver: &str) -> bool {
        self.solvers.iter().any(|s| s == solver)
    }

    pub fn allows_turbulence_model(&self, model: &str) -> bool {
        self.turbulence_models.iter().any(|m| m == model)
    }
}

fn check_allowed_list(
    list: &'static str,
    entries: &[String],
) -> Result<Vec<String>, FatalConfigError> {
    if entries.is_empty() {
        return Err(FatalConfigError::EmptyList(list));
    }

    let mut seen = HashSet::new();
    for entry in entries {
        if entry.trim().is_empty() {
            return Err(FatalConfigError::MalformedEntry {
                list,
                entry: entry.clone(),
                reason: "blank entry",
            });
        }
        if entry.chars().any(char::is_whitespace) {
            return Err(FatalConfigError::MalformedEntry {
                list,
                entry: entry.clone(),
                reason: "contains whitespace",
            });
        }
        if !seen.insert(entry.as_str()) {
            return Err(FatalConfigError::DuplicateEntry {
                list,
                entry: entry.clone(),
            });
        }
    }

    Ok(entries.to_vec())
}

/// Check whether a string is a valid case identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Validate one case object.
///
/// Checks, in order: required keys present, `case_name` syntax, `solver`
/// allowed, `turbulence_model` allowed. Returns every violation found.
pub fn validate_case(
    case_label: &str,
    candidate: &Value,
    schema: &CaseSchema,
) -> Result<CaseRecord, Vec<Violation>> {
    let empty = JsonMap::new();
    let fields = candidate.as_object().unwrap_or(&empty);
    let mut violations = Vec::new();

    let violation = |field: &str, reason: String| Violation {
        case_label: Some(case_label.to_string()),
        field: field.to_string(),
        reason,
    };

    // 1. Required keys
    for key in REQUIRED_KEYS {
        if !fields.contains_key(*key) {
            violations.push(violation(key, "missing required field".into()));
        }
    }

    // 2. Identifier syntax
    let case_name = fields.get("case_name");
    if let Some(value) = case_name {
        match value.as_str() {
            Some(name) if is_valid_identifier(name) => {}
            _ => violations.push(violation(
                "case_name",
                format!("{} does not match {IDENTIFIER_PATTERN}", describe(value)),
            )),
        }
    }

    // 3. Solver
    let solver = fields.get("solver");
    if let Some(value) = solver {
        if !value.as_str().is_some_and(|s| schema.allows_solver(s)) {
            violations.push(violation(
                "solver",
                format!("{} is not an allowed solver", describe(value)),
            ));
        }
    }

    // 4. Turbulence model
    let turbulence_model = fields.get("turbulence_model");
    if let Some(value) = turbulence_model {
        if !value.as_str().is_some_and(|m| schema.allows_turbulence_model(m)) {
            violations.push(violation(
                "turbulence_model",
                format!("{} is not an allowed turbulence model", describe(value)),
            ));
        }
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    // All four checks passed, so the three strings are present.
    let text = |value: Option<&Value>| value.and_then(Value::as_str).unwrap_or_default().to_string();

    Ok(CaseRecord {
        case_id: text(case_name),
        source_label: case_label.to_string(),
        solver: text(solver),
        turbulence_model: text(turbulence_model),
        other_physical_model: fields.get("other_physical_model").and_then(optional_text),
        distinguishing_description: fields
            .get("case_specific_description")
            .and_then(optional_text)
            .unwrap_or_default(),
    })
}

/// Validate every case of an extracted object and build the registry.
///
/// Rejects the whole object if any case fails, if two cases share a
/// `case_name`, or if there are no cases at all. Order follows the object.
pub fn validate_registry(
    extracted: &JsonMap,
    schema: &CaseSchema,
) -> Result<CaseRegistry, ValidationError> {
    if extracted.is_empty() {
        return Err(ValidationError {
            violations: vec![Violation {
                case_label: None,
                field: "cases".into(),
                reason: "extracted object contains no cases".into(),
            }],
        });
    }

    let mut records: Vec<CaseRecord> = Vec::with_capacity(extracted.len());
    let mut violations = Vec::new();

    for (label, candidate) in extracted {
        match validate_case(label, candidate, schema) {
            Ok(record) => {
                if let Some(first) = records.iter().find(|r| r.case_id == record.case_id) {
                    violations.push(Violation {
                        case_label: Some(label.clone()),
                        field: "case_name".into(),
                        reason: format!(
                            "duplicate case_name \"{}\" (already used by {})",
                            record.case_id, first.source_label
                        ),
                    });
                } else {
                    records.push(record);
                }
            }
            Err(mut found) => violations.append(&mut found),
        }
    }

    if !violations.is_empty() {
        tracing::warn!(
            violation_count = violations.len(),
            case_count = extracted.len(),
            "Extracted cases rejected by schema"
        );
        return Err(ValidationError { violations });
    }

    Ok(CaseRegistry::from_validated(records))
}

/// Re-check an existing registry against a schema before dispatch.
pub fn revalidate_registry(
    registry: &CaseRegistry,
    schema: &CaseSchema,
) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    let mut seen = HashSet::new();

    for record in registry {
        let label = Some(record.source_label.clone());
        if !is_valid_identifier(&record.case_id) || !seen.insert(record.case_id.as_str()) {
            violations.push(Violation {
                case_label: label.clone(),
                field: "case_name".into(),
                reason: format!("\"{}\" is not a unique valid identifier", record.case_id),
            });
        }
        if !schema.allows_solver(&record.solver) {
            violations.push(Violation {
                case_label: label.clone(),
                field: "solver".into(),
                reason: format!("\"{}\" is not an allowed solver", record.solver),
            });
        }
        if !schema.allows_turbulence_model(&record.turbulence_model) {
            violations.push(Violation {
                case_label: label,
                field: "turbulence_model".into(),
                reason: format!(
                    "\"{}\" is not an allowed turbulence model",
                    record.turbulence_model
                ),
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

fn optional_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => format!("non-string value {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::parser::extract_json_object;
    use serde_json::json;

    fn schema() -> CaseSchema {
        CaseSchema::new(
            &["simpleFoam".into(), "rhoCentralFoam".into()],
            &["kOmegaSST".into(), "SpalartAllmaras".into()],
        )
        .unwrap()
    }

    fn valid_case(name: &str) -> Value {
        json!({
            "case_name": name,
            "solver": "simpleFoam",
            "turbulence_model": "kOmegaSST",
            "other_physical_model": "none",
            "case_specific_description": "AoA=10"
        })
    }

    #[test]
    fn accepts_scenario_a_record() {
        let text = r#"Here is the result: {"Case_1":{"case_name":"case_1","solver":"simpleFoam","turbulence_model":"kOmegaSST","other_physical_model":"none","case_specific_description":"AoA=10"}} Thanks."#;
        let extracted = extract_json_object(text).unwrap();
        let registry = validate_registry(&extracted, &schema()).unwrap();

        assert_eq!(registry.len(), 1);
        let record = registry.get("case_1").unwrap();
        assert_eq!(record.source_label, "Case_1");
        assert_eq!(record.solver, "simpleFoam");
        assert_eq!(record.other_physical_model.as_deref(), Some("none"));
        assert_eq!(record.distinguishing_description, "AoA=10");
    }

    #[test]
    fn hyphenated_case_name_is_rejected() {
        let violations = validate_case("Case_1", &valid_case("case-1"), &schema()).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "case_name");
        assert_eq!(violations[0].case_label.as_deref(), Some("Case_1"));
    }

    #[test]
    fn unsupported_solver_is_rejected() {
        let mut case = valid_case("wing");
        case["solver"] = json!("fluentSolver");
        let violations = validate_case("Case_1", &case, &schema()).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "solver");
        assert!(violations[0].reason.contains("fluentSolver"));
    }

    #[test]
    fn unsupported_turbulence_model_is_rejected() {
        let mut case = valid_case("wing");
        case["turbulence_model"] = json!("kEpsilon");
        let violations = validate_case("Case_1", &case, &schema()).unwrap_err();
        assert_eq!(violations[0].field, "turbulence_model");
    }

    #[test]
    fn missing_keys_are_itemized_in_order() {
        let case = json!({"case_name": "wing", "solver": "simpleFoam"});
        let violations = validate_case("Case_1", &case, &schema()).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["turbulence_model", "other_physical_model", "case_specific_description"]
        );
    }

    #[test]
    fn several_violations_all_reported() {
        let case = json!({
            "case_name": "bad name",
            "solver": "nope",
            "turbulence_model": "nope",
            "other_physical_model": null,
            "case_specific_description": "x"
        });
        let violations = validate_case("Case_9", &case, &schema()).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["case_name", "solver", "turbulence_model"]);
    }

    #[test]
    fn non_string_solver_is_rejected() {
        let mut case = valid_case("wing");
        case["solver"] = json!(42);
        let violations = validate_case("Case_1", &case, &schema()).unwrap_err();
        assert_eq!(violations[0].field, "solver");
        assert!(violations[0].reason.contains("non-string"));
    }

    #[test]
    fn non_object_case_is_missing_every_key() {
        let violations = validate_case("Case_1", &json!("simpleFoam"), &schema()).unwrap_err();
        assert_eq!(violations.len(), REQUIRED_KEYS.len());
    }

    #[test]
    fn null_other_model_becomes_none() {
        let mut case = valid_case("wing");
        case["other_physical_model"] = json!(null);
        let record = validate_case("Case_1", &case, &schema()).unwrap();
        assert!(record.other_physical_model.is_none());
    }

    #[test]
    fn extra_keys_are_ignored() {
        let mut case = valid_case("wing");
        case["mesh_hint"] = json!("fine");
        assert!(validate_case("Case_1", &case, &schema()).is_ok());
    }

    #[test]
    fn one_bad_case_rejects_whole_registry() {
        let mut extracted = JsonMap::new();
        extracted.insert("Case_1".into(), valid_case("wing_a"));
        extracted.insert("Case_2".into(), valid_case("wing-b"));
        let err = validate_registry(&extracted, &schema()).unwrap_err();
        assert_eq!(err.fields(), vec!["case_name"]);
        assert_eq!(err.violations[0].case_label.as_deref(), Some("Case_2"));
    }

    #[test]
    fn duplicate_case_names_rejected() {
        let mut extracted = JsonMap::new();
        extracted.insert("Case_1".into(), valid_case("wing"));
        extracted.insert("Case_2".into(), valid_case("wing"));
        let err = validate_registry(&extracted, &schema()).unwrap_err();
        assert!(err.names_field("case_name"));
        assert!(err.violations[0].reason.contains("Case_1"));
    }

    #[test]
    fn empty_object_rejected() {
        let err = validate_registry(&JsonMap::new(), &schema()).unwrap_err();
        assert_eq!(err.fields(), vec!["cases"]);
    }

    #[test]
    fn registry_order_follows_extracted_object() {
        let extracted = extract_json_object(
            r#"{"Case_2": {"case_name": "second", "solver": "simpleFoam", "turbulence_model": "kOmegaSST", "other_physical_model": null, "case_specific_description": "b"},
                "Case_1": {"case_name": "first", "solver": "rhoCentralFoam", "turbulence_model": "SpalartAllmaras", "other_physical_model": null, "case_specific_description": "a"}}"#,
        )
        .unwrap();
        let registry = validate_registry(&extracted, &schema()).unwrap();
        assert_eq!(registry.case_ids(), vec!["second", "first"]);
    }

    #[test]
    fn validation_error_display_lists_fields() {
        let err = ValidationError {
            violations: vec![Violation {
                case_label: Some("Case_1".into()),
                field: "case_name".into(),
                reason: "bad".into(),
            }],
        };
        assert_eq!(err.to_string(), "Case validation failed: Case_1.case_name: bad");
    }

    #[test]
    fn revalidate_catches_schema_change() {
        let mut extracted = JsonMap::new();
        extracted.insert("Case_1".into(), valid_case("wing"));
        let registry = validate_registry(&extracted, &schema()).unwrap();

        let narrower = CaseSchema::new(&["pimpleFoam".into()], &["kOmegaSST".into()]).unwrap();
        let err = revalidate_registry(&registry, &narrower).unwrap_err();
        assert_eq!(err.fields(), vec!["solver"]);
        assert!(revalidate_registry(&registry, &schema()).is_ok());
    }

    #[test]
    fn schema_rejects_malformed_lists() {
        assert_eq!(
            CaseSchema::new(&[], &["kOmegaSST".into()]),
            Err(FatalConfigError::EmptyList("solver"))
        );
        assert!(matches!(
            CaseSchema::new(&["simple Foam".into()], &["kOmegaSST".into()]),
            Err(FatalConfigError::MalformedEntry { .. })
        ));
        assert!(matches!(
            CaseSchema::new(&["simpleFoam".into()], &["  ".into()]),
            Err(FatalConfigError::MalformedEntry { .. })
        ));
        assert!(matches!(
            CaseSchema::new(&["simpleFoam".into(), "simpleFoam".into()], &["kOmegaSST".into()]),
            Err(FatalConfigError::DuplicateEntry { .. })
        ));
    }

    #[test]
    fn identifier_syntax() {
        assert!(is_valid_identifier("Case_1"));
        assert!(is_valid_identifier("naca0012_aoa10"));
        assert!(!is_valid_identifier("case-1"));
        assert!(!is_valid_identifier("case 1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("case@1"));
    }
}
