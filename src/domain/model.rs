use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 目標資料表的欄位順序，與 [`FlatUserRow`] 欄位一一對應
pub const USER_COLUMNS: [&str; 6] = [
    "firstname",
    "lastname",
    "country",
    "username",
    "password",
    "email",
];

/// 使用者 API 回傳的單筆記錄，只宣告需要的欄位，其餘忽略
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawUserRecord {
    pub name: Option<UserName>,
    pub location: Option<UserLocation>,
    pub login: Option<UserLogin>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserName {
    pub first: Option<String>,
    pub last: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserLogin {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RawUserRecord {
    /// 從解碼後的 API 回應取出第一筆記錄。
    ///
    /// 支援三種形狀：`{"results": [...]}`、頂層陣列、單一物件。
    /// 只有被選中的那一筆會被解碼成型別化記錄，其餘元素直接丟棄。
    pub fn from_payload(payload: Value) -> Result<Self> {
        let record = match payload {
            Value::Object(mut obj) if obj.contains_key("results") => {
                match obj.remove("results") {
                    Some(Value::Array(items)) => first_item(items)?,
                    Some(other) => {
                        return Err(EtlError::ProcessingError {
                            message: format!(
                                "`results` must be a list of records, got {}",
                                json_type_name(&other)
                            ),
                        })
                    }
                    None => return Err(EtlError::EmptyPayloadError),
                }
            }
            Value::Array(items) => first_item(items)?,
            other => other,
        };

        Ok(serde_json::from_value(record)?)
    }
}

fn first_item(items: Vec<Value>) -> Result<Value> {
    let total = items.len();
    let first = items.into_iter().next().ok_or(EtlError::EmptyPayloadError)?;
    if total > 1 {
        tracing::debug!("Payload carried {} records, keeping only the first", total);
    }
    Ok(first)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// 攤平後的一列，欄位順序即 COPY 的欄位順序
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatUserRow {
    pub firstname: String,
    pub lastname: String,
    pub country: String,
    pub username: String,
    pub password: String,
    pub email: String,
}

impl FlatUserRow {
    pub fn values(&self) -> [&str; 6] {
        [
            self.firstname.as_str(),
            self.lastname.as_str(),
            self.country.as_str(),
            self.username.as_str(),
            self.password.as_str(),
            self.email.as_str(),
        ]
    }
}

/// 寫入 Storage 的暫存檔，交給 load 步驟使用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    /// 相對於 Storage 根目錄的檔名
    pub file: String,
    pub path: String,
    pub bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload_envelope_takes_first() {
        let payload = json!({
            "results": [
                {"email": "a@x.com"},
                {"email": "b@x.com"}
            ],
            "info": {"seed": "abc", "results": 2}
        });

        let record = RawUserRecord::from_payload(payload).unwrap();
        assert_eq!(record.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn test_from_payload_ignores_malformed_trailing_records() {
        let payload = json!({"results": [{"email": "a@x.com"}, {"email": 42}]});

        let record = RawUserRecord::from_payload(payload).unwrap();
        assert_eq!(record.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn test_from_payload_bare_array_and_single_object() {
        let from_array = RawUserRecord::from_payload(json!([{"email": "a@x.com"}])).unwrap();
        let from_object = RawUserRecord::from_payload(json!({"email": "a@x.com"})).unwrap();
        assert_eq!(from_array, from_object);
    }

    #[test]
    fn test_from_payload_empty_results() {
        let err = RawUserRecord::from_payload(json!({"results": []})).unwrap_err();
        assert!(matches!(err, EtlError::EmptyPayloadError));

        let err = RawUserRecord::from_payload(json!([])).unwrap_err();
        assert!(matches!(err, EtlError::EmptyPayloadError));
    }

    #[test]
    fn test_from_payload_results_not_a_list() {
        let err =
            RawUserRecord::from_payload(json!({"results": {"email": "a@x.com"}})).unwrap_err();
        assert!(matches!(err, EtlError::ProcessingError { .. }));
    }

    #[test]
    fn test_from_payload_wrong_field_type_is_decode_failure() {
        let err = RawUserRecord::from_payload(json!({"name": {"first": 7}})).unwrap_err();
        assert!(matches!(err, EtlError::SerializationError(_)));
    }

    #[test]
    fn test_row_values_follow_column_order() {
        let row = FlatUserRow {
            firstname: "Jane".to_string(),
            lastname: "Doe".to_string(),
            country: "US".to_string(),
            username: "jdoe".to_string(),
            password: "p@ss".to_string(),
            email: "j@x.com".to_string(),
        };
        assert_eq!(row.values(), ["Jane", "Doe", "US", "jdoe", "p@ss", "j@x.com"]);
        assert_eq!(USER_COLUMNS.len(), row.values().len());
    }
}
