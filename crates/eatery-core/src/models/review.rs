use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A user review. Reviews carry no id of their own; they are identified by
/// their position in the restaurant's review list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(deserialize_with = "deserialize_id")]
    pub restaurant_id: i64,
    pub name: String,
    #[serde(deserialize_with = "deserialize_rating")]
    pub rating: u8,
    #[serde(default)]
    pub comments: String,
    #[serde(
        rename = "createdAt",
        default = "Utc::now",
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub created_at: DateTime<Utc>,
    #[serde(
        rename = "updatedAt",
        default = "Utc::now",
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Build a fresh review stamped with the current time.
    pub fn new(restaurant_id: i64, name: &str, rating: i64, comments: &str) -> Self {
        // stored and wire timestamps carry milliseconds only
        let now = Utc::now().trunc_subsecs(3);
        Self {
            restaurant_id,
            name: name.trim().to_string(),
            rating: Self::clamp_rating(rating),
            comments: comments.trim().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Pull a rating into the 1..=5 range.
    pub fn clamp_rating(rating: i64) -> u8 {
        rating.clamp(MIN_RATING as i64, MAX_RATING as i64) as u8
    }

    /// A review needs a reviewer name and some comment text.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.comments.trim().is_empty()
    }

    pub fn stars(&self) -> String {
        let filled = self.rating.min(MAX_RATING) as usize;
        format!(
            "{}{}",
            "★".repeat(filled),
            "☆".repeat(MAX_RATING as usize - filled)
        )
    }
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

// Server-side records use epoch milliseconds, locally created ones ISO-8601.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TimestampVisitor;

    impl<'de> de::Visitor<'de> for TimestampVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("epoch milliseconds or an ISO-8601 timestamp")
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Utc.timestamp_millis_opt(v)
                .single()
                .ok_or_else(|| E::custom(format!("timestamp out of range: {}", v)))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let millis = i64::try_from(v).map_err(E::custom)?;
            de::Visitor::visit_i64(self, millis)
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            de::Visitor::visit_i64(self, v as i64)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            DateTime::parse_from_rfc3339(v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(E::custom)
        }
    }

    deserializer.deserialize_any(TimestampVisitor)
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(IntegerVisitor)
}

fn deserialize_rating<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = deserializer.deserialize_any(IntegerVisitor)?;
    Ok(Review::clamp_rating(raw))
}

// Form fields arrive as strings, server records as numbers.
struct IntegerVisitor;

impl<'de> de::Visitor<'de> for IntegerVisitor {
    type Value = i64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an integer or numeric string")
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        i64::try_from(v).map_err(E::custom)
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(v.round() as i64)
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.trim()
            .parse::<i64>()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}
