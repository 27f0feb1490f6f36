//! One-shot prediction from a JSON record file.

use crate::error::{CliError, Result};
use crate::output;
use dpe_predict::encoding::FeatureRecord;
use dpe_predict::serving::{predict_chain, ArtifactSet, ChainPrediction, LoadOptions};
use std::path::Path;

/// Reads a record from `input` (`-` for stdin) and runs the classifier →
/// regressor chain on it.
pub(crate) fn run(model_dir: &Path, input: &Path, options: LoadOptions, json: bool) -> Result<()> {
    if !model_dir.is_dir() {
        return Err(CliError::FileNotFound(model_dir.to_path_buf()));
    }
    let record = read_record(input)?;

    let artifacts = ArtifactSet::new(model_dir);
    let classifier = artifacts
        .load_classifier(options)
        .map_err(|e| CliError::ModelLoadFailed(e.to_string()))?;
    let regressor = artifacts
        .load_regressor(options)
        .map_err(|e| CliError::ModelLoadFailed(e.to_string()))?;

    let prediction = predict_chain(&classifier, &regressor, &record)?;
    if json {
        let text = serde_json::to_string_pretty(&prediction)
            .map_err(|e| CliError::PredictionFailed(e.to_string()))?;
        println!("{text}");
    } else {
        print_human(&prediction);
    }
    Ok(())
}

fn read_record(input: &Path) -> Result<FeatureRecord> {
    let text = if input == Path::new("-") {
        std::io::read_to_string(std::io::stdin())?
    } else {
        if !input.is_file() {
            return Err(CliError::FileNotFound(input.to_path_buf()));
        }
        std::fs::read_to_string(input)?
    };
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| CliError::InvalidInput(format!("{}: {e}", input.display())))?;
    Ok(FeatureRecord::from_json(&value)?)
}

fn print_human(prediction: &ChainPrediction) {
    output::section("DPE Estimate");
    output::kv("Class", output::class_badge(prediction.class));
    output::kv("Class index", prediction.class_index);
    output::kv("Consumption", output::format_kwh(prediction.displayed_kwh));
    output::kv("CO2", format!("{:.1} kg/year", prediction.co2_kg));
    if prediction.displayed_kwh > prediction.consumption_kwh {
        output::warning(&format!(
            "model estimate {:.2} kWh raised to the display floor",
            prediction.consumption_kwh
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_record_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"surface_habitable_logement": 55, "logement": "Neuf"}}"#).unwrap();
        let record = read_record(file.path()).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.number("surface_habitable_logement").unwrap(), Some(55.0));
    }

    #[test]
    fn test_read_record_rejects_non_object() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();
        assert!(matches!(read_record(file.path()), Err(CliError::InvalidInput(_))));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{broken").unwrap();
        assert!(matches!(read_record(file.path()), Err(CliError::InvalidInput(_))));
    }

    #[test]
    fn test_missing_input_file() {
        let err = read_record(Path::new("/nonexistent/record.json")).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }
}
