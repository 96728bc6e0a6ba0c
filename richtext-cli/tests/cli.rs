use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

const SNAPSHOT: &str = r#"{
  "root": {
    "type": "root",
    "children": [
      {
        "type": "paragraph",
        "children": [
          { "type": "text", "text": "Das ist ein " },
          {
            "type": "langTag",
            "id": "lt1",
            "fields": { "lang": "de" },
            "children": [{ "type": "text", "text": "Block" }]
          },
          { "type": "text", "text": ". I love UTF-8." }
        ]
      }
    ]
  }
}"#;

fn richtext() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("richtext").expect("binary builds")
}

fn annotations_of(node: &Value, type_tag: &str, out: &mut Vec<Value>) {
    if node["type"] == type_tag {
        out.push(node.clone());
    }
    if let Some(children) = node["children"].as_array() {
        for child in children {
            annotations_of(child, type_tag, out);
        }
    }
}

#[test]
fn to_html_renders_annotations() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("doc.json");
    fs::write(&input, SNAPSHOT)?;

    richtext()
        .arg("to-html")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"<span lang="de">Block</span>"#))
        .stdout(predicate::str::contains("<p>"));
    Ok(())
}

#[test]
fn from_html_imports_abbreviation() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("doc.html");
    let output = dir.path().join("doc.json");
    fs::write(&input, r#"<p>I love <abbr title="Unicode">UTF-8</abbr> and <span lang="fr">les crêpes</span></p>"#)?;

    richtext()
        .arg("from-html")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let value: Value = serde_json::from_str(&fs::read_to_string(&output)?)?;
    let mut abbrs = Vec::new();
    annotations_of(&value["root"], "abbr", &mut abbrs);
    assert_eq!(abbrs.len(), 1);
    assert_eq!(abbrs[0]["fields"]["title"], "Unicode");
    assert_eq!(abbrs[0]["children"][0]["text"], "UTF-8");

    let mut tags = Vec::new();
    annotations_of(&value["root"], "langTag", &mut tags);
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["fields"]["lang"], "fr");
    Ok(())
}

#[test]
fn annotate_applies_and_removes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("doc.json");
    let tagged = dir.path().join("tagged.json");
    fs::write(&input, SNAPSHOT)?;

    richtext()
        .args(["annotate", "--kind", "abbr", "--find", "UTF-8", "--value", "Unicode Transformation Format"])
        .arg(&input)
        .arg("--output")
        .arg(&tagged)
        .assert()
        .success();

    let value: Value = serde_json::from_str(&fs::read_to_string(&tagged)?)?;
    let mut abbrs = Vec::new();
    annotations_of(&value["root"], "abbr", &mut abbrs);
    assert_eq!(abbrs.len(), 1);
    assert_eq!(abbrs[0]["fields"]["title"], "Unicode Transformation Format");

    let assert = richtext()
        .args(["annotate", "--kind", "langTag", "--find", "Block"])
        .arg(&input)
        .assert()
        .success();
    let value: Value = serde_json::from_str(&String::from_utf8(assert.get_output().stdout.clone())?)?;
    let mut tags = Vec::new();
    annotations_of(&value["root"], "langTag", &mut tags);
    assert!(tags.is_empty());
    Ok(())
}

#[test]
fn annotate_rejects_bad_input() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("doc.json");
    fs::write(&input, SNAPSHOT)?;

    richtext()
        .args(["annotate", "--kind", "langTag", "--find", "Block", "--value", "not a tag"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid lang value"));

    richtext()
        .args(["annotate", "--kind", "link", "--find", "Block"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown annotation type"));

    richtext()
        .args(["annotate", "--kind", "abbr", "--find", "missing", "--value", "x"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    Ok(())
}

#[test]
fn annotate_respects_disabled_kinds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("doc.json");
    fs::write(&input, SNAPSHOT)?;
    fs::write(
        dir.path().join("settings.json"),
        r#"{ "annotations": { "enabled": ["LanguageTag"] } }"#,
    )?;

    richtext()
        .arg("--config-dir")
        .arg(dir.path())
        .args(["annotate", "--kind", "abbr", "--find", "UTF-8", "--value", "Unicode"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("disabled"));
    Ok(())
}

#[test]
fn validate_reports_invalid_values() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let good = dir.path().join("good.json");
    fs::write(&good, SNAPSHOT)?;

    let assert = richtext().arg("validate").arg(&good).arg("--json").assert().success();
    let value: Value = serde_json::from_str(&String::from_utf8(assert.get_output().stdout.clone())?)?;
    assert_eq!(value["language_tags"], 1);
    assert_eq!(value["abbreviations"], 0);

    let bad = dir.path().join("bad.json");
    fs::write(&bad, SNAPSHOT.replace(r#""lang": "de""#, r#""lang": "not a tag""#))?;
    richtext()
        .arg("validate")
        .arg(&bad)
        .assert()
        .failure()
        .stdout(predicate::str::contains("1 problems"));
    Ok(())
}
