//! Artifact check command
//!
//! Loads every artifact in a model directory, cross-checks their shapes and
//! runs one smoke prediction through each model and through the chain.

use crate::error::CliError;
use crate::output;
use colored::Colorize;
use dpe_predict::encoding::FeatureRecord;
use dpe_predict::serving::{predict_chain, ArtifactSet, ClassifierContext, LoadOptions};
use std::path::Path;

/// Stage result with detailed information
#[derive(Debug)]
struct StageResult {
    name: &'static str,
    passed: bool,
    details: Option<String>,
}

impl StageResult {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            details: Some(details.into()),
        }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            details: Some(details.into()),
        }
    }
}

/// Record used for the smoke predictions.
pub(crate) fn smoke_record() -> FeatureRecord {
    FeatureRecord::new()
        .with("surface_habitable_logement", 70.0)
        .with("hauteur_sous_plafond", 2.5)
        .with("qualite_isolation_murs", "Moyenne")
        .with("nombre_appartement_cat", "Petit Collectif(4 à 9 logements)")
        .with("periode_construction", "1975-1977")
        .with("type_energie_n1", "Gaz naturel")
        .with("type_energie_principale_chauffage", "Gaz naturel")
        .with("logement", "Ancien")
}

/// Run the artifact check
pub(crate) fn run(model_dir: &Path, options: LoadOptions, json: bool) -> Result<(), CliError> {
    if !json {
        output::section("DPE Artifact Check");
        println!("Models: {}\n", model_dir.display().to_string().cyan());
    }

    let results = run_checks(model_dir, options);
    let passed_count = results.iter().filter(|r| r.passed).count();
    let total_count = results.len();

    if json {
        return print_json(&results, model_dir, passed_count, total_count);
    }

    for result in &results {
        let line = format!("{:<22} {}", result.name, result.details.as_deref().unwrap_or("-"));
        if result.passed {
            output::success(&line);
        } else {
            output::fail(&line);
        }
    }

    println!();
    output::kv("Stages passed", format!("{passed_count}/{total_count}"));
    if passed_count == total_count {
        println!("\n{}", "All artifacts usable.".green().bold());
        Ok(())
    } else {
        Err(CliError::ValidationFailed(format!(
            "{}/{} stages failed",
            total_count - passed_count,
            total_count
        )))
    }
}

fn run_checks(model_dir: &Path, options: LoadOptions) -> Vec<StageResult> {
    let mut results = Vec::new();

    if !model_dir.is_dir() {
        results.push(StageResult::fail("Model directory", "not a directory"));
        return results;
    }
    results.push(StageResult::pass("Model directory", model_dir.display().to_string()));

    let artifacts = ArtifactSet::new(model_dir);
    let classifier = match artifacts.load_classifier(options) {
        Ok(ctx) => {
            results.push(StageResult::pass(
                "Classifier artifacts",
                format!(
                    "{} trees, {} classes, {} columns",
                    ctx.model().n_trees(),
                    ctx.model().n_classes(),
                    ctx.schema().len()
                ),
            ));
            Some(ctx)
        }
        Err(e) => {
            results.push(StageResult::fail("Classifier artifacts", e.to_string()));
            None
        }
    };

    let regressor = match artifacts.load_regressor(options) {
        Ok(ctx) => {
            results.push(StageResult::pass(
                "Regressor artifacts",
                format!(
                    "{} standardized + {} passthrough columns",
                    ctx.layout().standardized().len(),
                    ctx.layout().passthrough().len()
                ),
            ));
            Some(ctx)
        }
        Err(e) => {
            results.push(StageResult::fail("Regressor artifacts", e.to_string()));
            None
        }
    };

    if let Some(ctx) = &classifier {
        results.push(classifier_smoke(ctx));
    }
    if let (Some(c), Some(r)) = (&classifier, &regressor) {
        results.push(match predict_chain(c, r, &smoke_record()) {
            Ok(chain) => StageResult::pass(
                "Chain smoke test",
                format!("{} → {}", chain.class, output::format_kwh(chain.displayed_kwh)),
            ),
            Err(e) => StageResult::fail("Chain smoke test", e.to_string()),
        });
    }
    results
}

fn classifier_smoke(ctx: &ClassifierContext) -> StageResult {
    match ctx.predict(&smoke_record()) {
        Ok(pred) => match pred.class() {
            Some(class) => StageResult::pass("Classifier smoke test", format!("class {class}")),
            None => StageResult::fail(
                "Classifier smoke test",
                format!("class index {} outside G..A", pred.class_index),
            ),
        },
        Err(e) => StageResult::fail("Classifier smoke test", e.to_string()),
    }
}

fn print_json(
    results: &[StageResult],
    model_dir: &Path,
    passed_count: usize,
    total_count: usize,
) -> Result<(), CliError> {
    let stages: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "name": r.name,
                "status": if r.passed { "PASS" } else { "FAIL" },
                "details": r.details.as_deref().unwrap_or(""),
            })
        })
        .collect();

    let report = serde_json::json!({
        "model_dir": model_dir.display().to_string(),
        "stages": stages,
        "passed": passed_count,
        "total": total_count,
        "all_passed": passed_count == total_count,
    });
    println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpe_predict::encoding::{RegressorLayout, TrainingSchema};
    use dpe_predict::prelude::*;
    use tempfile::TempDir;

    fn write_artifacts(dir: &Path) {
        let set = ArtifactSet::new(dir);
        let schema = TrainingSchema::new(vec![
            "surface_habitable_logement".to_string(),
            "qualite_isolation_murs".to_string(),
        ])
        .unwrap();
        let x = Matrix::from_vec(4, 2, vec![30.0, 0.0, 40.0, 1.0, 150.0, 3.0, 170.0, 2.0]).unwrap();
        let mut forest = RandomForestClassifier::new(3).with_random_state(3);
        forest.fit(&x, &[1, 1, 5, 5]).unwrap();
        set.save_classifier(&schema, &forest).unwrap();

        let width = RegressorLayout::consumption().width();
        set.save_regressor(
            &SimpleImputer::from_statistics(ImputeStrategy::Mean, vec![2.5, 70.0]),
            &StandardScaler::from_stats(vec![2.5, 70.0], vec![0.4, 30.0]).unwrap(),
            &LinearRegression::from_parts(vec![0.0; width], 9000.0),
        )
        .unwrap();
    }

    #[test]
    fn test_all_stages_pass() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());
        let results = run_checks(dir.path(), LoadOptions::default());
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.passed), "{results:?}");
    }

    #[test]
    fn test_missing_regressor_fails_stage() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());
        std::fs::remove_file(dir.path().join("conso_scaler.json")).unwrap();

        let results = run_checks(dir.path(), LoadOptions::default());
        let failed: Vec<_> = results.iter().filter(|r| !r.passed).map(|r| r.name).collect();
        assert_eq!(failed, vec!["Regressor artifacts"]);
        assert!(run(dir.path(), LoadOptions::default(), false).is_err());
    }

    #[test]
    fn test_missing_dir() {
        let results = run_checks(Path::new("/nonexistent/models"), LoadOptions::default());
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
    }
}
