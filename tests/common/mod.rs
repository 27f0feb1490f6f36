//! Synthetic training data and artifact fixtures shared by integration tests.

#![allow(dead_code)]

use dpe_predict::encoding::{
    AlignMode, EncoderConfig, FeatureEncoder, FeatureRecord, RegressorLayout, TrainingSchema,
    BUILDING_CATEGORIES, CONSTRUCTION_PERIODS, DWELLING_AGES, ENERGY_TYPES, INSULATION_LEVELS,
};
use dpe_predict::prelude::*;
use dpe_predict::serving::ArtifactSet;
use std::path::Path;

/// One synthetic dwelling with its class and annual consumption.
pub struct Sample {
    pub record: FeatureRecord,
    pub class_index: usize,
    pub kwh: f32,
}

/// Deterministic dataset covering every vocabulary label.
pub fn training_samples() -> Vec<Sample> {
    (0..140_usize)
        .map(|i| {
            let surface = 20.0 + ((i * 37) % 180) as f64;
            let height = 2.2 + (i % 5) as f64 * 0.2;
            let insulation = i % 4;
            let period = (i * 3) % 10;
            let logement = if period >= 9 { DWELLING_AGES[0] } else { DWELLING_AGES[1] };

            let class_index = (insulation + period / 3 + usize::from(surface > 100.0)).min(6);
            let kwh = 8000.0 + 40.0 * surface as f32 - 900.0 * class_index as f32 + 300.0 * height as f32;

            let record = FeatureRecord::new()
                .with("surface_habitable_logement", surface)
                .with("hauteur_sous_plafond", height)
                .with("qualite_isolation_murs", INSULATION_LEVELS[insulation])
                .with("nombre_appartement_cat", BUILDING_CATEGORIES[(i / 4) % 4])
                .with("periode_construction", CONSTRUCTION_PERIODS[period])
                .with("type_energie_n1", ENERGY_TYPES[(i / 3) % 7])
                .with("type_energie_principale_chauffage", ENERGY_TYPES[(i / 2) % 7])
                .with("logement", logement);

            Sample {
                record,
                class_index,
                kwh,
            }
        })
        .collect()
}

/// What the dashboard sends for a typical flat.
pub fn dashboard_record() -> FeatureRecord {
    FeatureRecord::new()
        .with("surface_habitable_logement", 65.0)
        .with("hauteur_sous_plafond", 2.5)
        .with("qualite_isolation_murs", "Moyenne")
        .with("nombre_appartement_cat", "Petit Collectif(4 à 9 logements)")
        .with("periode_construction", "1975-1977")
        .with("type_energie_n1", "Gaz naturel ")
        .with("type_energie_principale_chauffage", "Gaz naturel")
        .with("logement", "Ancien")
}

fn classifier_artifacts(samples: &[Sample]) -> (TrainingSchema, RandomForestClassifier) {
    let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();
    let encoded: Vec<_> = samples.iter().map(|s| encoder.encode(&s.record).unwrap()).collect();

    let mut columns: Vec<String> = Vec::new();
    for row in &encoded {
        for (name, _) in row.iter() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }
    let schema = TrainingSchema::new(columns).unwrap();

    let rows: Vec<Vec<f32>> = encoded
        .iter()
        .map(|row| schema.align(row, AlignMode::Lenient).values)
        .collect();
    let x = Matrix::from_rows(&rows).unwrap();
    let y: Vec<usize> = samples.iter().map(|s| s.class_index).collect();

    let mut forest = RandomForestClassifier::new(10).with_random_state(42);
    forest.fit(&x, &y).unwrap();
    (schema, forest)
}

fn regressor_artifacts(samples: &[Sample]) -> (SimpleImputer, StandardScaler, LinearRegression) {
    let encoder = FeatureEncoder::new(EncoderConfig::regressor()).unwrap();
    let layout = RegressorLayout::consumption();
    let n_std = layout.standardized().len();

    let mut standard = Vec::new();
    let mut passthrough = Vec::new();
    for sample in samples {
        let record = sample
            .record
            .clone()
            .with("etiquette_dpe", sample.class_index as i64);
        let aligned = layout
            .align(&encoder.encode(&record).unwrap(), AlignMode::Lenient)
            .unwrap();
        let (s, p) = aligned.values.split_at(n_std);
        standard.push(s.to_vec());
        passthrough.push(p.iter().map(|v| if v.is_nan() { 0.0 } else { *v }).collect::<Vec<_>>());
    }

    let mut imputer = SimpleImputer::new(ImputeStrategy::Mean);
    let imputed = imputer.fit_transform(&Matrix::from_rows(&standard).unwrap()).unwrap();
    let mut scaler = StandardScaler::new();
    let scaled = scaler.fit_transform(&imputed).unwrap();

    let rows: Vec<Vec<f32>> = (0..scaled.n_rows())
        .map(|i| {
            let mut row = scaled.row(i).to_vec();
            row.extend_from_slice(&passthrough[i]);
            row
        })
        .collect();
    let y: Vec<f32> = samples.iter().map(|s| s.kwh).collect();

    let mut model = LinearRegression::new().with_alpha(1.0);
    model.fit(&Matrix::from_rows(&rows).unwrap(), &y).unwrap();
    (imputer, scaler, model)
}

/// Trains both models on [`training_samples`] and writes them to `dir`.
pub fn write_artifacts(dir: &Path) -> ArtifactSet {
    let samples = training_samples();
    let set = ArtifactSet::new(dir);

    let (schema, forest) = classifier_artifacts(&samples);
    set.save_classifier(&schema, &forest).unwrap();

    let (imputer, scaler, model) = regressor_artifacts(&samples);
    set.save_regressor(&imputer, &scaler, &model).unwrap();
    set
}
