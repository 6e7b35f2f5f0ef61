//! Serde helpers for local time-of-day values stored as `HH:MM`.

/// `NaiveTime` as `HH:MM`. Accepts `HH:MM:SS` on input since Postgres `time`
/// columns come back with seconds.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, FORMAT))
            .map_err(|_| format!("invalid time of day '{}', expected HH:MM", raw))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        #[serde(with = "super::hhmm")]
        at: NaiveTime,
    }

    #[test]
    fn serializes_without_seconds() {
        let row = Row { at: NaiveTime::from_hms_opt(16, 15, 0).unwrap() };
        assert_eq!(serde_json::to_value(&row).unwrap()["at"], "16:15");
    }

    #[test]
    fn accepts_postgres_time_with_seconds() {
        let row: Row = serde_json::from_str(r#"{"at":"09:05:00"}"#).unwrap();
        assert_eq!(row.at, NaiveTime::from_hms_opt(9, 5, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Row>(r#"{"at":"25:99"}"#).is_err());
    }
}
