//! End-to-end tests for the sdkgen CLI

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn sdkgen(args: &[&str]) -> Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_sdkgen"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .context("Failed to run sdkgen")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[test]
fn test_generate_all_languages() -> Result<()> {
    let out = tempfile::tempdir()?;
    let spec = path_arg(&fixture("petstore.openapi.json"));
    let swagger = path_arg(&fixture("petstore.swagger.json"));
    let output = sdkgen(&[
        "generate",
        "--spec-path",
        &spec,
        "--swagger-path",
        &swagger,
        "--output-dir",
        &path_arg(out.path()),
        "--language",
        "python,typescript",
        "--package-name",
        "petstore",
    ])?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let python = out.path().join("python/1.0");
    let methods = std::fs::read_to_string(python.join("methods.py"))?;
    assert!(methods.contains("class Petstore10Sdk(api_methods.APIMethods):"));
    // csv collection format recovered from the Swagger document
    assert!(methods.contains("tags: Optional[models.DelimSequence[str]] = None"));
    assert!(methods.contains("body: Optional[models.WritePet] = None"));
    assert!(methods.contains(") -> bytes:"));
    assert!(python.join("models.py").exists());
    assert!(!python.join("streams.py").exists());

    let typescript = out.path().join("typescript/1.0");
    let methods = std::fs::read_to_string(typescript.join("methods.ts"))?;
    assert!(methods.contains("request: RequestListPets"));
    let models = std::fs::read_to_string(typescript.join("models.ts"))?;
    assert!(models.contains("export interface RequestListPets"));
    assert!(models.contains("tags?: DelimArray<string> | null"));
    assert!(typescript.join("streams.ts").exists());
    Ok(())
}

#[test]
fn test_unknown_language_fails_before_generating() -> Result<()> {
    let out = tempfile::tempdir()?;
    let spec = path_arg(&fixture("petstore.openapi.json"));
    let output = sdkgen(&[
        "generate",
        "--spec-path",
        &spec,
        "--output-dir",
        &path_arg(out.path()),
        "--language",
        "python,cobol",
    ])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cobol"));
    assert!(!out.path().join("python").exists());
    Ok(())
}

#[test]
fn test_search() -> Result<()> {
    let spec = path_arg(&fixture("petstore.openapi.json"));
    let output = sdkgen(&["search", &spec, "photo"])?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Media"));
    assert!(stdout.contains("pet_photo GET /pets/{pet_id}/photo"));

    let output = sdkgen(&["search", &spec, "(unclosed"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid search expression"));
    Ok(())
}

#[test]
fn test_convert_writes_fixed_document() -> Result<()> {
    let out = tempfile::tempdir()?;
    let fixed = out.path().join("fixed.json");
    let output = sdkgen(&[
        "convert",
        "--openapi",
        &path_arg(&fixture("petstore.openapi.json")),
        "--swagger",
        &path_arg(&fixture("petstore.swagger.json")),
        "--output",
        &path_arg(&fixed),
    ])?;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("2 fixes"));

    let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&fixed)?)?;
    assert_eq!(doc["paths"]["/pets"]["get"]["parameters"][0]["style"], "simple");
    assert_eq!(doc["paths"]["/pets"]["post"]["requestBody"]["required"], false);
    Ok(())
}
