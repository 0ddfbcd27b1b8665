use proptest::prelude::*;
use serde_json::json;
use user_etl::{serialize, transform, transform_payload, EtlError, RawUserRecord};

fn jane() -> serde_json::Value {
    json!({
        "name": {"first": "Jane", "last": "Doe"},
        "location": {"country": "US"},
        "login": {"username": "jdoe", "password": "p@ss"},
        "email": "j@x.com"
    })
}

#[test]
fn test_reference_record_serializes_exactly() {
    let raw: RawUserRecord = serde_json::from_value(jane()).unwrap();
    let line = serialize(&transform(&raw).unwrap()).unwrap();

    assert_eq!(line, "Jane,Doe,US,jdoe,p@ss,j@x.com");
    assert!(!line.ends_with(','));
    assert!(!line.ends_with('\n'));
}

#[test]
fn test_envelope_with_two_records_drops_second() {
    let mut record_b = jane();
    record_b["name"]["first"] = json!("Zed");
    record_b["login"]["username"] = json!("zed");

    let row = transform_payload(json!({"results": [jane(), record_b]})).unwrap();
    let line = serialize(&row).unwrap();

    assert_eq!(line, "Jane,Doe,US,jdoe,p@ss,j@x.com");
    assert!(!line.contains("Zed"));
    assert!(!line.contains("zed"));
}

#[test]
fn test_empty_results_is_an_error_not_an_empty_row() {
    let result = transform_payload(json!({"results": []}));
    assert!(matches!(result, Err(EtlError::EmptyPayloadError)));
}

#[test]
fn test_every_missing_field_is_reported() {
    let paths = [
        ("name", "first"),
        ("name", "last"),
        ("location", "country"),
        ("login", "username"),
        ("login", "password"),
    ];

    for (parent, child) in paths {
        let mut value = jane();
        value[parent].as_object_mut().unwrap().remove(child);

        let expected = format!("{}.{}", parent, child);
        match transform_payload(value) {
            Err(EtlError::MissingFieldError { field }) => assert_eq!(field, expected),
            other => panic!("expected MissingFieldError for {}, got {:?}", expected, other),
        }
    }

    let mut value = jane();
    value.as_object_mut().unwrap().remove("location");
    assert!(matches!(
        transform_payload(value),
        Err(EtlError::MissingFieldError { field }) if field == "location.country"
    ));
}

#[test]
fn test_transform_twice_gives_same_row() {
    let raw: RawUserRecord = serde_json::from_value(jane()).unwrap();
    let first = transform(&raw).unwrap();
    let second = transform(&raw).unwrap();
    assert_eq!(first, second);
    assert_eq!(serialize(&first).unwrap(), serialize(&second).unwrap());
}

/// 非空白、不含分隔符、引號或換行的欄位值
fn field_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9@._+ -]{0,24}[A-Za-z0-9@._+-]"
}

proptest! {
    /// Property: a well-formed record flattens in column order and splits back unchanged
    #[test]
    fn well_formed_records_flatten_in_column_order(
        first in field_value(),
        last in field_value(),
        country in field_value(),
        username in field_value(),
        password in field_value(),
        email in field_value(),
    ) {
        let raw: RawUserRecord = serde_json::from_value(json!({
            "name": {"first": first, "last": last},
            "location": {"country": country},
            "login": {"username": username, "password": password},
            "email": email
        })).unwrap();

        let row = transform(&raw).unwrap();
        let again = transform(&raw).unwrap();
        prop_assert_eq!(&row, &again);

        let expected = [&first, &last, &country, &username, &password, &email];
        prop_assert_eq!(row.values(), expected.map(|v| v.as_str()));

        let line = serialize(&row).unwrap();
        let columns: Vec<&str> = line.split(',').collect();
        prop_assert_eq!(columns, expected.map(|v| v.as_str()).to_vec());
    }
}
