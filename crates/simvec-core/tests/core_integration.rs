#![allow(clippy::unwrap_used, clippy::expect_used)]

use simvec_core::{DeleteOutcome, Document, SimvecError, VectorRecord};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// 1. VectorRecord serialization roundtrip
// ---------------------------------------------------------------------------

#[test]
fn record_serialization_roundtrip() {
    let mut metadata = HashMap::new();
    metadata.insert(
        "source".to_string(),
        serde_json::Value::String("unit".to_string()),
    );
    let record = VectorRecord::new("doc-1", "hello simvec", vec![0.25, -0.5, 1.0])
        .with_metadata(metadata);

    let json = serde_json::to_string(&record).unwrap();
    let back: VectorRecord = serde_json::from_str(&json).unwrap();

    assert_eq!(back.id, "doc-1");
    assert_eq!(back.content, "hello simvec");
    assert_eq!(back.embedding, vec![0.25, -0.5, 1.0]);
    assert_eq!(
        back.metadata.get("source"),
        Some(&serde_json::Value::String("unit".to_string()))
    );
}

// ---------------------------------------------------------------------------
// 2. Record validation failure classes
// ---------------------------------------------------------------------------

#[test]
fn validate_rejects_empty_id() {
    let record = VectorRecord::new("  ", "text", vec![1.0]);
    assert!(matches!(
        record.validate(None),
        Err(SimvecError::InvalidArgument(_))
    ));
}

#[test]
fn validate_rejects_empty_embedding() {
    let record = VectorRecord::new("a", "text", vec![]);
    assert!(matches!(
        record.validate(None),
        Err(SimvecError::InvalidArgument(_))
    ));
}

#[test]
fn validate_rejects_non_finite_components() {
    for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
        let record = VectorRecord::new("a", "text", vec![0.1, bad]);
        let err = record.validate(None).unwrap_err();
        assert!(matches!(err, SimvecError::InvalidArgument(_)), "{err}");
    }
}

#[test]
fn validate_reports_dimension_mismatch_with_both_sizes() {
    let record = VectorRecord::new("a", "text", vec![1.0, 2.0, 3.0]);
    match record.validate(Some(4)) {
        Err(SimvecError::DimensionMismatch { expected, actual }) => {
            assert_eq!(expected, 4);
            assert_eq!(actual, 3);
        }
        other => panic!("expected DimensionMismatch, got {other:?}"),
    }
}

#[test]
fn validate_accepts_well_formed_record() {
    let record = VectorRecord::new("a", "text", vec![0.0, 0.5]);
    assert!(record.validate(Some(2)).is_ok());
}

// ---------------------------------------------------------------------------
// 3. Degenerate vector detection
// ---------------------------------------------------------------------------

#[test]
fn zero_vector_is_degenerate() {
    assert!(VectorRecord::new("z", "t", vec![0.0, 0.0, 0.0]).is_degenerate());
    assert!(!VectorRecord::new("z", "t", vec![0.0, 1e-9, 0.0]).is_degenerate());
}

// ---------------------------------------------------------------------------
// 4. Document builder and JSON shape
// ---------------------------------------------------------------------------

#[test]
fn document_builder_sets_fields() {
    let mut metadata = HashMap::new();
    metadata.insert("lang".to_string(), serde_json::json!("en"));
    let doc = Document::new("some text")
        .with_id("doc-7")
        .with_metadata(metadata);

    assert_eq!(doc.id.as_deref(), Some("doc-7"));
    assert_eq!(doc.content, "some text");
    assert_eq!(doc.metadata.get("lang"), Some(&serde_json::json!("en")));
}

#[test]
fn document_parses_without_id_or_metadata() {
    let doc: Document = serde_json::from_str(r#"{"content":"bare"}"#).unwrap();
    assert!(doc.id.is_none());
    assert!(doc.metadata.is_empty());

    // A store-assigned id should not be forced on the wire either.
    let json = serde_json::to_string(&Document::new("bare")).unwrap();
    assert!(!json.contains("\"id\""));
}

// ---------------------------------------------------------------------------
// 5. DeleteOutcome accounting
// ---------------------------------------------------------------------------

#[test]
fn delete_outcome_completeness() {
    let full = DeleteOutcome {
        requested: 3,
        removed: 3,
    };
    let partial = DeleteOutcome {
        requested: 3,
        removed: 1,
    };
    assert!(full.is_complete());
    assert!(!partial.is_complete());
}
