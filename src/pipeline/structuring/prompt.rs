use super::validation::{CaseSchema, IDENTIFIER_PATTERN};

pub const SESSION_SYSTEM_PROMPT: &str = r#"
You are an intelligent assistant capable of:
1. Maintaining politeness and professionalism
2. Remembering the context of the conversation
3. Processing and analyzing content from documents uploaded by users
4. Answering user questions while keeping the conversation coherent

Please always respond in a clear, accurate, and helpful manner.
"#;

/// Posted by the session once the enumeration reply arrives.
pub const CHOOSE_CASE_MESSAGE: &str = "Please choose the case you want to simulate and the OpenFOAM solver you want to use.\n\
Your answer shall be like one of the following:\n\
- I want to simulate the case with AoA = 10 degree and the SpalartAllmaras model.\n\
- I want to simulate Case_1 using rhoCentralFoam and the SpalartAllmaras model.\n\
- I want to simulate the case with AoA = 10 degree and the kOmegaSST model.\n\n\
You must choose only one case.";

/// Build the prompt that asks the model to list every distinct case.
pub fn build_enumeration_prompt(document_text: &str) -> String {
    format!(
        r#"The attached document contains several CFD cases, and I would like to run one or several of the cases by myself later. Please read the document and list all distinct CFD cases with a characteristic description. Give each case a tag as Case_X (such as Case_1, Case_2).

- Count each unique combination of parameters that results in a separate simulation run as one CFD case. These parameters include but are not limited to the geometry, boundary conditions, flow parameters (Re/Mach/AoA/velocity), physical model, or solver.
- If there are multiple runs of the same parameters for statistical analysis or convergence studies, count these as one case, unless the document specifies them as distinct due to different goals or conditions.
- If any case is simulated using OpenFOAM, identify the solver or find a proper solver to run the case. Show the solver name when describing the case.

The document is as follows:
<document>
{document_text}
</document>"#
    )
}

/// Build the prompt that maps the operator's answer onto an enumerated case.
pub fn build_selection_prompt(case_descriptions: &str, operator_text: &str) -> String {
    format!(
        r#"Task: the user wants to simulate a CFD case with the following characteristics. Identify the CFD case from the case descriptions extracted from the document.
- Characteristics: {operator_text}
- Case descriptions: {case_descriptions}
Your response shall only include the answer without any thinking content."#
    )
}

/// Build the strict structured-extraction prompt.
pub fn build_structuring_prompt(operator_text: &str, schema: &CaseSchema) -> String {
    let solvers = schema.solvers().join(", ");
    let models = schema.turbulence_models().join(", ");

    format!(
        r#"Understand the user's answer and describe the case details of the user's requirement.

The user's answer is: {operator_text}

Please generate JSON content according to these requirements:

1. Strictly follow this example format containing ONLY JSON content:
{{
    "Case_1": {{
        "case_name": "<case_name>",
        "solver": "<solver_name>",
        "turbulence_model": "<model_name>",
        "other_physical_model": "<model_name>",
        "case_specific_description": "<a sentence that describes the case setup with detailed parameters that differentiate this case from the other cases in the document>"
    }}
}}

2. Absolutely AVOID any non-JSON elements including but not limited to:
- Markdown code block markers (```json or ```)
- Extra comments or explanations
- Unnecessary empty lines or indentation
- Any text outside the JSON structure

3. Critical syntax requirements:
- Maintain strict JSON syntax compliance
- Enclose all keys in double quotes
- Use double quotes for string values
- Ensure no trailing comma after the last property

4. case_name must match {IDENTIFIER_PATTERN}: only letters, digits, or underscores. Special characters (e.g. -, @, #, spaces) are not permitted.

5. The solver must be one of the following: {solvers}.
The turbulence_model must be one of the following: {models}."#
    )
}

/// Assistant notice recorded after mesh boundaries are received.
pub fn build_mesh_notice(boundary_names: &[String]) -> String {
    format!(
        "You have uploaded a mesh with boundary names: {}.\nThe cases are prepared and will run one after another.",
        boundary_names.join(", ")
    )
}

/// Assistant message summarizing the accepted cases.
pub fn build_case_summary(registry_markdown: &str) -> String {
    format!("You chose to simulate the cases with the following setups:\n{registry_markdown}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> CaseSchema {
        CaseSchema::new(
            &["simpleFoam".into(), "pimpleFoam".into()],
            &["kOmegaSST".into()],
        )
        .unwrap()
    }

    #[test]
    fn enumeration_prompt_embeds_document() {
        let prompt = build_enumeration_prompt("NACA0012 at Re=6e6");
        assert!(prompt.contains("<document>\nNACA0012 at Re=6e6\n</document>"));
        assert!(prompt.contains("Case_X"));
    }

    #[test]
    fn selection_prompt_embeds_both_inputs() {
        let prompt = build_selection_prompt("Case_1: AoA=0\nCase_2: AoA=10", "the 10 degree one");
        assert!(prompt.contains("Case_2: AoA=10"));
        assert!(prompt.contains("the 10 degree one"));
    }

    #[test]
    fn structuring_prompt_lists_allowed_values() {
        let prompt = build_structuring_prompt("Case_1 with kOmegaSST", &schema());
        assert!(prompt.contains("simpleFoam, pimpleFoam"));
        assert!(prompt.contains("one of the following: kOmegaSST."));
        assert!(prompt.contains(IDENTIFIER_PATTERN));
        assert!(prompt.contains("\"case_specific_description\""));
    }

    #[test]
    fn mesh_notice_lists_boundaries() {
        let notice = build_mesh_notice(&["inlet".into(), "outlet".into(), "wall".into()]);
        assert!(notice.contains("inlet, outlet, wall"));
    }
}
