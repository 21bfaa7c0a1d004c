use serde::{Deserialize, Serialize};

/// A validated simulation case, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Validated `case_name`; matches `^[A-Za-z0-9_]+$`.
    pub case_id: String,
    /// Top-level key the model used for this case (e.g. `Case_1`).
    pub source_label: String,
    pub solver: String,
    pub turbulence_model: String,
    pub other_physical_model: Option<String>,
    pub distinguishing_description: String,
}

/// Ordered, duplicate-free set of validated cases.
///
/// Only the schema validator builds a non-empty registry, so holding one
/// means every record passed validation. Sessions replace it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaseRegistry {
    records: Vec<CaseRecord>,
}

impl CaseRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Caller guarantees records are validated and case ids are unique.
    pub(crate) fn from_validated(records: Vec<CaseRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, case_id: &str) -> Option<&CaseRecord> {
        self.records.iter().find(|r| r.case_id == case_id)
    }

    pub fn contains(&self, case_id: &str) -> bool {
        self.get(case_id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CaseRecord> {
        self.records.iter()
    }

    pub fn case_ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.case_id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Markdown summary: one heading per case, its fields as a bullet list.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&format!("# {}\n", record.source_label));
            out.push_str(&format!("- case_name: {}\n", record.case_id));
            out.push_str(&format!("- solver: {}\n", record.solver));
            out.push_str(&format!("- turbulence_model: {}\n", record.turbulence_model));
            out.push_str(&format!(
                "- other_physical_model: {}\n",
                record.other_physical_model.as_deref().unwrap_or("none")
            ));
            out.push_str(&format!(
                "- case_specific_description: {}\n\n",
                record.distinguishing_description
            ));
        }
        out.trim_end().to_string()
    }
}

impl<'a> IntoIterator for &'a CaseRegistry {
    type Item = &'a CaseRecord;
    type IntoIter = std::slice::Iter<'a, CaseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for CaseRegistry {
    type Item = CaseRecord;
    type IntoIter = std::vec::IntoIter<CaseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, label: &str) -> CaseRecord {
        CaseRecord {
            case_id: id.into(),
            source_label: label.into(),
            solver: "simpleFoam".into(),
            turbulence_model: "kOmegaSST".into(),
            other_physical_model: None,
            distinguishing_description: "AoA=10".into(),
        }
    }

    #[test]
    fn registry_keeps_insertion_order() {
        let registry = CaseRegistry::from_validated(vec![
            record("wing_b", "Case_1"),
            record("wing_a", "Case_2"),
        ]);
        assert_eq!(registry.case_ids(), vec!["wing_b", "wing_a"]);
    }

    #[test]
    fn lookup_by_case_id() {
        let registry = CaseRegistry::from_validated(vec![record("wing_a", "Case_1")]);
        assert!(registry.contains("wing_a"));
        assert_eq!(registry.get("wing_a").unwrap().source_label, "Case_1");
        assert!(registry.get("Case_1").is_none());
    }

    #[test]
    fn markdown_has_heading_per_case() {
        let registry = CaseRegistry::from_validated(vec![
            record("wing_a", "Case_1"),
            record("wing_b", "Case_2"),
        ]);
        let md = registry.to_markdown();
        assert!(md.starts_with("# Case_1"));
        assert!(md.contains("# Case_2"));
        assert!(md.contains("- other_physical_model: none"));
        assert!(md.contains("- solver: simpleFoam"));
    }

    #[test]
    fn empty_registry() {
        let registry = CaseRegistry::empty();
        assert!(registry.is_empty());
        assert_eq!(registry.to_markdown(), "");
    }
}
