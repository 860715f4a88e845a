//! Judge prompts for fact checking and criteria evaluation.
//!
//! Every prompt pins the exact JSON shape the judge must return; the shapes
//! are validated in `judge::shapes`. User content builders mirror the
//! layouts the prompts describe.

// =============================================================================
// Fact checking
// =============================================================================

pub const CLAIM_EXTRACTION: &str = r#"You extract atomic factual claims from a chatbot response. A claim is a single verifiable assertion; split compound statements, drop greetings, hedges and questions. Rephrase each claim so it is understandable without the surrounding text.

Output only a valid JSON object of the form:
{"claims": ["<claim>", "<claim>", ...]}"#;

pub const CLAIM_CHECK: &str = r#"You verify whether a claim is supported by a reference document. The claim is verified only if the document states or directly implies it; absence of evidence means unverified.

You receive:
Claim: <the claim>
Relevant info: <the document>

Output only a valid JSON object of the form:
{"result": true} or {"result": false}"#;

pub const CLAIM_CHECK_COT: &str = r#"You verify whether a claim is supported by a reference document. The claim is verified only if the document states or directly implies it; absence of evidence means unverified. Reason step by step before concluding.

You receive:
Claim: <the claim>
Relevant info: <the document>

Output only a valid JSON object of the form:
{"thoughts": ["<reasoning step>", ...], "result": true|false}"#;

// =============================================================================
// Criteria evaluation
// =============================================================================

pub const CRITERIA_CHECK: &str = r#"You check whether a chatbot response satisfies a free-text criterion. Judge only what the text shows; do not assume facts not present.

You receive:
Criteria: <the criterion>
Text to check criteria against: <the response>

Output only a valid JSON object of the form:
{"result": true} or {"result": false}"#;

pub const CRITERIA_CHECK_COT: &str = r#"You check whether a chatbot response satisfies a free-text criterion. Judge only what the text shows; do not assume facts not present. Reason step by step before concluding.

You receive:
Criteria: <the criterion>
Text to check criteria against: <the response>

Output only a valid JSON object of the form:
{"thoughts": ["<reasoning step>", ...], "result": true|false}"#;

pub const CRITERIA_CHECK_WITH_INFO: &str = r#"You check whether a chatbot response satisfies a free-text criterion, using a retrieved document as supplemental ground truth.

You receive:
Criteria: <the criterion>
Text to check criteria against: <the response>
Retrieved related document: <the document>

Output only a valid JSON object of the form:
{"result": true} or {"result": false}"#;

pub const CRITERIA_CHECK_WITH_INFO_COT: &str = r#"You check whether a chatbot response satisfies a free-text criterion, using a retrieved document as supplemental ground truth. Reason step by step before concluding.

You receive:
Criteria: <the criterion>
Text to check criteria against: <the response>
Retrieved related document: <the document>

Output only a valid JSON object of the form:
{"thoughts": ["<reasoning step>", ...], "result": true|false}"#;

pub const QUERY_NEEDED: &str = r#"You decide whether verifying a criterion against a chatbot response needs supplemental information from the knowledge base. If it does, write a short semantic search query; if the response alone is enough, return an empty query.

You receive:
Criteria: <the criterion>
Text to check criteria against: <the response>

Output only a valid JSON object of the form:
{"db_query": "<search query>"} or {"db_query": ""}"#;

pub const QUERY_NEEDED_COT: &str = r#"You decide whether verifying a criterion against a chatbot response needs supplemental information from the knowledge base. If it does, write a short semantic search query; if the response alone is enough, return an empty query. Reason step by step before deciding.

You receive:
Criteria: <the criterion>
Text to check criteria against: <the response>

Output only a valid JSON object of the form:
{"db_query": "<search query or empty>", "thoughts": ["<reasoning step>", ...]}"#;

// =============================================================================
// Prompt selection
// =============================================================================

pub fn claim_check(use_cot: bool) -> &'static str {
    if use_cot {
        CLAIM_CHECK_COT
    } else {
        CLAIM_CHECK
    }
}

pub fn criteria_check(use_cot: bool) -> &'static str {
    if use_cot {
        CRITERIA_CHECK_COT
    } else {
        CRITERIA_CHECK
    }
}

pub fn criteria_check_with_info(use_cot: bool) -> &'static str {
    if use_cot {
        CRITERIA_CHECK_WITH_INFO_COT
    } else {
        CRITERIA_CHECK_WITH_INFO
    }
}

pub fn query_needed(use_cot: bool) -> &'static str {
    if use_cot {
        QUERY_NEEDED_COT
    } else {
        QUERY_NEEDED
    }
}

// =============================================================================
// User content builders
// =============================================================================

pub fn claim_check_content(claim: &str, document: &str) -> String {
    format!("Claim: {claim}\nRelevant info: {document}\n")
}

pub fn criteria_content(criterion: &str, text: &str) -> String {
    format!("Criteria: {criterion}\nText to check criteria against: {text}\n")
}

pub fn criteria_with_info_content(criterion: &str, text: &str, document: &str) -> String {
    format!(
        "Criteria: {criterion}\nText to check criteria against: {text}\nRetrieved related document: {document}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_pick_cot_variants() {
        assert_eq!(claim_check(true), CLAIM_CHECK_COT);
        assert_eq!(claim_check(false), CLAIM_CHECK);
        assert_eq!(query_needed(true), QUERY_NEEDED_COT);
        assert_eq!(criteria_check_with_info(false), CRITERIA_CHECK_WITH_INFO);
    }

    #[test]
    fn content_builders_match_prompt_layout() {
        let c = claim_check_content("the museum opens at 9", "Opening hours: 9-17");
        assert!(c.starts_with("Claim: the museum opens at 9\n"));
        assert!(c.contains("Relevant info: Opening hours: 9-17"));

        let c = criteria_with_info_content("mentions pricing", "It costs $5.", "Tickets: $5");
        assert!(c.contains("Criteria: mentions pricing"));
        assert!(c.contains("Retrieved related document: Tickets: $5"));
    }
}
