use crate::domain::model::{FlatUserRow, RawUserRecord, USER_COLUMNS};
use crate::utils::error::{EtlError, Result};
use csv::{QuoteStyle, WriterBuilder};

pub const DELIMITER: u8 = b',';

/// 將一筆使用者記錄攤平成六欄。
///
/// 欄位缺少、為 null 或空字串時回傳 `MissingFieldError`，不做預設值替換。
pub fn transform(raw: &RawUserRecord) -> Result<FlatUserRow> {
    let name = raw.name.as_ref();
    let login = raw.login.as_ref();

    Ok(FlatUserRow {
        firstname: required("name.first", name.and_then(|n| n.first.as_deref()))?,
        lastname: required("name.last", name.and_then(|n| n.last.as_deref()))?,
        country: required(
            "location.country",
            raw.location.as_ref().and_then(|l| l.country.as_deref()),
        )?,
        username: required("login.username", login.and_then(|l| l.username.as_deref()))?,
        password: required("login.password", login.and_then(|l| l.password.as_deref()))?,
        email: required("email", raw.email.as_deref())?,
    })
}

/// 從 API 回應（envelope、陣列或單一物件）取第一筆後轉換
pub fn transform_payload(payload: serde_json::Value) -> Result<FlatUserRow> {
    let record = RawUserRecord::from_payload(payload)?;
    transform(&record)
}

/// 輸出單行逗號分隔，無標頭、無結尾換行。
///
/// 欄位值不做跳脫：含有分隔符的值會原樣寫出，下游 COPY 會因此錯位。
pub fn serialize(row: &FlatUserRow) -> Result<String> {
    for (column, value) in USER_COLUMNS.iter().zip(row.values()) {
        if value
            .bytes()
            .any(|b| b == DELIMITER || b == b'"' || b == b'\n' || b == b'\r')
        {
            tracing::warn!(
                "⚠️ Column '{}' contains a delimiter, quote or newline; written unescaped",
                column
            );
        }
    }

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .delimiter(DELIMITER)
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());
    writer.serialize(row)?;

    let bytes = writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("Failed to flush CSV row: {}", e),
    })?;
    let line = String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("CSV row is not valid UTF-8: {}", e),
    })?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn required(field: &str, value: Option<&str>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(EtlError::MissingFieldError {
            field: field.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jane() -> serde_json::Value {
        json!({
            "name": {"title": "Ms", "first": "Jane", "last": "Doe"},
            "location": {"city": "Austin", "country": "US", "postcode": 73301},
            "login": {"uuid": "7f1c", "username": "jdoe", "password": "p@ss"},
            "email": "j@x.com",
            "phone": "555-0100"
        })
    }

    fn record(value: serde_json::Value) -> RawUserRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_transform_keeps_column_order() {
        let row = transform(&record(jane())).unwrap();

        assert_eq!(row.firstname, "Jane");
        assert_eq!(row.lastname, "Doe");
        assert_eq!(row.country, "US");
        assert_eq!(row.username, "jdoe");
        assert_eq!(row.password, "p@ss");
        assert_eq!(row.email, "j@x.com");
    }

    #[test]
    fn test_serialize_matches_bulk_load_format() {
        let row = transform(&record(jane())).unwrap();
        assert_eq!(serialize(&row).unwrap(), "Jane,Doe,US,jdoe,p@ss,j@x.com");
    }

    #[test]
    fn test_transform_is_idempotent() {
        let raw = record(jane());
        assert_eq!(transform(&raw).unwrap(), transform(&raw).unwrap());
    }

    #[test]
    fn test_transform_reports_each_missing_path() {
        let cases = [
            ("name.first", json!({"name": {"last": "Doe"}})),
            ("name.last", json!({"name": {"first": "Jane"}})),
            ("location.country", json!({"location": {"city": "Austin"}})),
            ("login.username", json!({"login": {"password": "p@ss"}})),
            ("login.password", json!({"login": {"username": "jdoe"}})),
        ];

        for (path, patch) in cases {
            let mut value = jane();
            let key = path.split('.').next().unwrap();
            value[key] = patch[key].clone();

            match transform(&record(value)) {
                Err(EtlError::MissingFieldError { field }) => assert_eq!(field, path),
                other => panic!("expected MissingFieldError for {}, got {:?}", path, other),
            }
        }

        let mut value = jane();
        value.as_object_mut().unwrap().remove("email");
        assert!(matches!(
            transform(&record(value)),
            Err(EtlError::MissingFieldError { field }) if field == "email"
        ));
    }

    #[test]
    fn test_transform_treats_null_and_blank_as_missing() {
        let mut value = jane();
        value["login"] = serde_json::Value::Null;
        assert!(matches!(
            transform(&record(value)),
            Err(EtlError::MissingFieldError { field }) if field == "login.username"
        ));

        let mut value = jane();
        value["email"] = json!("   ");
        assert!(matches!(
            transform(&record(value)),
            Err(EtlError::MissingFieldError { field }) if field == "email"
        ));
    }

    #[test]
    fn test_transform_payload_uses_first_result_only() {
        let mut second = jane();
        second["name"]["first"] = json!("Bob");
        second["email"] = json!("bob@x.com");

        let row = transform_payload(json!({"results": [jane(), second]})).unwrap();
        let line = serialize(&row).unwrap();

        assert_eq!(line, "Jane,Doe,US,jdoe,p@ss,j@x.com");
        assert!(!line.contains("Bob"));
    }

    #[test]
    fn test_transform_payload_empty_results_fails() {
        let err = transform_payload(json!({"results": []})).unwrap_err();
        assert!(matches!(err, EtlError::EmptyPayloadError));
    }

    #[test]
    fn test_serialize_does_not_escape_delimiter() {
        let mut row = transform(&record(jane())).unwrap();
        row.country = "Korea, Republic of".to_string();
        assert_eq!(
            serialize(&row).unwrap(),
            "Jane,Doe,Korea, Republic of,jdoe,p@ss,j@x.com"
        );
    }
}
