use std::fmt;

use serde::{de, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Opening hours keyed by day name, kept in the order the server sent them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperatingHours(Vec<(String, String)>);

impl OperatingHours {
    pub fn get(&self, day: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(d, _)| d == day)
            .map(|(_, hours)| hours.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(d, h)| (d.as_str(), h.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for OperatingHours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (day, hours) in &self.0 {
            map.serialize_entry(day, hours)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OperatingHours {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HoursVisitor;

        impl<'de> de::Visitor<'de> for HoursVisitor {
            type Value = OperatingHours;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of day names to opening hours")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut days = Vec::with_capacity(access.size_hint().unwrap_or(7));
                while let Some((day, hours)) = access.next_entry::<String, String>()? {
                    days.push((day, hours));
                }
                Ok(OperatingHours(days))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(OperatingHours::default())
            }
        }

        deserializer.deserialize_any(HoursVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub cuisine_type: String,
    #[serde(default)]
    pub latlng: LatLng,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photograph: Option<String>,
    #[serde(default)]
    pub operating_hours: OperatingHours,
    #[serde(default, deserialize_with = "deserialize_string_bool")]
    pub is_favorite: bool,
}

impl Restaurant {
    /// Relative link to the restaurant's detail page.
    pub fn page_url(&self) -> String {
        format!("./restaurant.html?id={}", self.id)
    }

    /// Image path for the restaurant, or `None` when it has no photograph.
    pub fn image_url(&self, webp: bool) -> Option<String> {
        self.photograph.as_ref().map(|photo| {
            if webp {
                format!("/img/webp/{}.webp", photo)
            } else {
                format!("/img/{}.jpg", photo)
            }
        })
    }
}

/// Favorite flag change for a single restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteUpdate {
    pub restaurant_id: i64,
    #[serde(rename = "isFavorite")]
    pub is_favorite: bool,
}

impl FavoriteUpdate {
    pub fn new(restaurant_id: i64, is_favorite: bool) -> Self {
        Self {
            restaurant_id,
            is_favorite,
        }
    }
}

// The server stores the flag as whatever the last PUT query string said,
// so "true"/"false" strings show up next to real booleans.
fn deserialize_string_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct BoolVisitor;

    impl<'de> de::Visitor<'de> for BoolVisitor {
        type Value = bool;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a boolean or string 'true'/'false'")
        }

        fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.eq_ignore_ascii_case("true"))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(false)
        }
    }

    deserializer.deserialize_any(BoolVisitor)
}
