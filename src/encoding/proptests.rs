// Property tests for the encode → align pipeline.

use super::*;
use crate::error::DpeError;
use proptest::prelude::*;

fn classifier_schema() -> TrainingSchema {
    let mut columns = vec![
        "surface_habitable_logement".to_string(),
        "hauteur_sous_plafond".to_string(),
        "qualite_isolation_murs".to_string(),
        "nombre_appartement_cat".to_string(),
    ];
    columns.extend(CONSTRUCTION_PERIODS.iter().map(|p| format!("periode_construction_{p}")));
    columns.extend(ENERGY_TYPES.iter().map(|e| format!("type_energie_n1_{e}")));
    columns.push("logement_Neuf".into());
    TrainingSchema::new(columns).unwrap()
}

fn pick(labels: &'static [&'static str]) -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::sample::select(labels).prop_map(String::from))
}

prop_compose! {
    fn known_record()(
        surface in prop::option::of(10.0f64..500.0),
        height in prop::option::of(1.8f64..4.0),
        insulation in pick(&INSULATION_LEVELS),
        category in pick(&BUILDING_CATEGORIES),
        period in pick(&CONSTRUCTION_PERIODS),
        energy_n1 in pick(&ENERGY_TYPES),
        energy_heating in pick(&ENERGY_TYPES),
        logement in pick(&DWELLING_AGES),
    ) -> FeatureRecord {
        let mut record = FeatureRecord::new();
        if let Some(v) = surface { record.insert("surface_habitable_logement", v); }
        if let Some(v) = height { record.insert("hauteur_sous_plafond", v); }
        for (key, value) in [
            ("qualite_isolation_murs", insulation),
            ("nombre_appartement_cat", category),
            ("periode_construction", period),
            ("type_energie_n1", energy_n1),
            ("type_energie_principale_chauffage", energy_heating),
            ("logement", logement),
        ] {
            if let Some(v) = value { record.insert(key, v); }
        }
        record
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_aligned_length_matches_schema(record in known_record()) {
        let schema = classifier_schema();
        let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();
        let encoded = encoder.encode(&record).unwrap();

        for mode in [AlignMode::Lenient, AlignMode::Strict] {
            let aligned = schema.align(&encoded, mode);
            prop_assert_eq!(aligned.values.len(), schema.len());
            prop_assert_eq!(aligned.dropped.len() + (schema.len() - aligned.unmatched), encoded.len());
        }
    }

    #[test]
    fn prop_encoding_is_deterministic(record in known_record()) {
        let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();
        prop_assert_eq!(encoder.encode(&record).unwrap(), encoder.encode(&record).unwrap());
    }

    #[test]
    fn prop_unknown_insulation_is_rejected(
        record in known_record(),
        label in "[a-z]{3,12}",
    ) {
        prop_assume!(!INSULATION_LEVELS.contains(&label.as_str()));
        let record = record.with("qualite_isolation_murs", label.clone());
        let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();

        match encoder.encode(&record) {
            Err(DpeError::UnrecognizedCategory { feature, value }) => {
                prop_assert_eq!(feature, "qualite_isolation_murs");
                prop_assert_eq!(value, label);
            }
            other => prop_assert!(false, "expected UnrecognizedCategory, got {:?}", other),
        }
    }

    #[test]
    fn prop_ordinal_codes_in_range(record in known_record()) {
        let encoder = FeatureEncoder::new(EncoderConfig::regressor()).unwrap();
        let encoded = encoder.encode(&record.with("etiquette_dpe", 0_i64)).unwrap();
        if let Some(code) = encoded.get("periode_construction") {
            prop_assert!((0.0..10.0).contains(&code));
        }
        if let Some(code) = encoded.get("qualite_isolation_murs") {
            prop_assert!((0.0..4.0).contains(&code));
        }
    }
}
