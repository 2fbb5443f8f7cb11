//! Structured-output presets
//!
//! A preset is a fixed system instruction and JSON schema layered on top of
//! `generate_json`. Adding one needs no registry or strategy changes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{GenerateRequest, JsonSchema};

/// System instruction plus output schema for one use case
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub system_instruction: &'static str,
    pub schema: JsonSchema,
}

impl Preset {
    pub fn new(name: &'static str, system_instruction: &'static str, schema: Value) -> Self {
        Self {
            name,
            system_instruction,
            schema: JsonSchema::new(schema),
        }
    }

    /// JSON-mode request carrying `input` as the prompt
    pub fn request(&self, provider_id: &str, input: impl Into<String>) -> GenerateRequest {
        GenerateRequest::prompt(provider_id, input)
            .with_system_instruction(self.system_instruction)
            .with_json_schema(self.schema.clone())
    }

    pub fn change_summary() -> Self {
        Self::new(
            "change_summary",
            "You summarize a set of code changes for a reviewer. Reply with a short \
             title, a one-paragraph summary, and one entry per notable change.",
            json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "summary": { "type": "string" },
                    "changes": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["title", "summary", "changes"]
            }),
        )
    }

    pub fn palette_contrast() -> Self {
        Self::new(
            "palette_contrast",
            "You assess the accessibility of a color palette. Score overall contrast \
             from 0 to 100, report the WCAG contrast ratio of each foreground/background \
             pair, and suggest fixes for failing pairs.",
            json!({
                "type": "object",
                "properties": {
                    "score": { "type": "number", "minimum": 0, "maximum": 100 },
                    "pairs": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "foreground": { "type": "string" },
                                "background": { "type": "string" },
                                "ratio": { "type": "number" },
                                "passes": { "type": "boolean" }
                            },
                            "required": ["foreground", "background", "ratio", "passes"]
                        }
                    },
                    "suggestions": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["score", "pairs", "suggestions"]
            }),
        )
    }

    pub fn security_scan() -> Self {
        Self::new(
            "security_scan",
            "You review code for security vulnerabilities. List each finding with its \
             severity. Return an empty list when nothing is found.",
            json!({
                "type": "object",
                "properties": {
                    "vulnerabilities": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "severity": {
                                    "type": "string",
                                    "enum": ["low", "medium", "high", "critical"]
                                },
                                "title": { "type": "string" },
                                "description": { "type": "string" },
                                "location": { "type": "string" },
                                "recommendation": { "type": "string" }
                            },
                            "required": ["severity", "title", "description"]
                        }
                    }
                },
                "required": ["vulnerabilities"]
            }),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub title: String,
    pub summary: String,
    pub changes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastPair {
    pub foreground: String,
    pub background: String,
    pub ratio: f64,
    pub passes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteContrast {
    pub score: f64,
    pub pairs: Vec<ContrastPair>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub vulnerabilities: Vec<Vulnerability>,
}

impl SecurityReport {
    /// Highest severity present, if any
    pub fn max_severity(&self) -> Option<Severity> {
        self.vulnerabilities.iter().map(|v| v.severity).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_compile() {
        for preset in [
            Preset::change_summary(),
            Preset::palette_contrast(),
            Preset::security_scan(),
        ] {
            assert!(preset.schema.check().is_ok(), "{}", preset.name);
        }
    }

    #[test]
    fn test_request_carries_instruction_and_schema() {
        let preset = Preset::change_summary();
        let request = preset.request("mock", "diff --git a b");
        assert_eq!(request.provider_id.as_deref(), Some("mock"));
        assert_eq!(request.system_instruction.as_deref(), Some(preset.system_instruction));
        assert_eq!(request.json_schema, Some(preset.schema));
    }

    #[test]
    fn test_security_schema_matches_type() {
        let value = json!({
            "vulnerabilities": [
                { "severity": "high", "title": "SQL injection", "description": "string concat" },
                { "severity": "low", "title": "Verbose errors", "description": "stack traces",
                  "location": "src/main.rs:10" }
            ]
        });
        assert!(Preset::security_scan().schema.validate(&value).is_ok());

        let report: SecurityReport = serde_json::from_value(value).unwrap();
        assert_eq!(report.max_severity(), Some(Severity::High));
        assert_eq!(report.vulnerabilities[1].location.as_deref(), Some("src/main.rs:10"));
    }

    #[test]
    fn test_palette_score_bounds() {
        let value = json!({ "score": 140, "pairs": [], "suggestions": [] });
        assert!(Preset::palette_contrast().schema.validate(&value).is_err());
    }
}
