use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome marker carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Uniform response wrapper returned by every endpoint.
///
/// `count` is the number of records carried in `data` (0 on error, 1 for a
/// single record, the list length for collections). `data` is `null` on
/// error. A new envelope is built for each response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Envelope<T> {
    /// Response payload
    pub data: Option<T>,
    /// Human readable message
    pub msg: String,
    /// Number of records in `data`
    pub count: usize,
    /// "ok" or "error"
    pub status: Status,
}

impl<T> Envelope<T> {
    /// A successful response carrying a single record.
    pub fn one(data: T, msg: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            msg: msg.into(),
            count: 1,
            status: Status::Ok,
        }
    }

    /// A failed response. Carries no data.
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            data: None,
            msg: msg.into(),
            count: 0,
            status: Status::Error,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

impl<T> Envelope<Vec<T>> {
    /// A successful response carrying a collection.
    pub fn many(data: Vec<T>, msg: impl Into<String>) -> Self {
        Self {
            count: data.len(),
            data: Some(data),
            msg: msg.into(),
            status: Status::Ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_count_matches_length() {
        let envelope = Envelope::many(vec!["a", "b", "c"], "Found");
        assert_eq!(envelope.count, 3);
        assert!(envelope.is_ok());
    }

    #[test]
    fn test_error_envelope_wire_shape() {
        let envelope: Envelope<String> = Envelope::error("Dish not found");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({"data": null, "msg": "Dish not found", "count": 0, "status": "error"})
        );
    }

    #[test]
    fn test_single_record_wire_shape() {
        let value = serde_json::to_value(Envelope::one(json!({"id": 7}), "ok")).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["status"], "ok");
        assert_eq!(value["data"]["id"], 7);
    }
}
