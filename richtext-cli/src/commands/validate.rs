//! Structural and field checks for a snapshot

use super::read_snapshot;
use anyhow::{bail, Result};
use doc_model::{AnnotationKind, DocumentTree};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct FieldProblem {
    #[serde(rename = "type")]
    type_tag: &'static str,
    id: String,
    text: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidationSummary {
    abbreviations: usize,
    language_tags: usize,
    problems: Vec<FieldProblem>,
}

fn summarize(tree: &DocumentTree) -> ValidationSummary {
    let mut problems = Vec::new();
    for kind in AnnotationKind::ALL {
        for id in tree.annotations(kind) {
            let Some(annotation) = tree.annotation(id) else {
                continue;
            };
            if let Err(e) = annotation.fields().validate() {
                problems.push(FieldProblem {
                    type_tag: kind.type_tag(),
                    id: annotation.id().to_string(),
                    text: tree.text_content(id),
                    message: e.to_string(),
                });
            }
        }
    }
    ValidationSummary {
        abbreviations: tree.annotations(AnnotationKind::Abbreviation).len(),
        language_tags: tree.annotations(AnnotationKind::LanguageTag).len(),
        problems,
    }
}

/// Fails when the tree is malformed or any annotation has an invalid value
pub fn validate(input: &Path, json: bool) -> Result<()> {
    let tree = read_snapshot(input)?;
    tree.check_invariants()?;
    let summary = summarize(&tree);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Validation complete: {} abbreviations, {} language tags, {} problems",
            summary.abbreviations,
            summary.language_tags,
            summary.problems.len()
        );
        for problem in &summary.problems {
            println!("  [{}] \"{}\": {}", problem.type_tag, problem.text, problem.message);
        }
    }

    if !summary.problems.is_empty() {
        bail!("{} annotation(s) with invalid values", summary.problems.len());
    }
    Ok(())
}
