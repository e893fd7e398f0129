use serde::{Deserialize, Deserializer, Serialize};

/// Missing keys and explicit `null` both become the type's default.
fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

/// One team's batting turn as reported by CricAPI (`r`/`w`/`o` keys).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InningsScore {
    #[serde(rename = "r", default, deserialize_with = "null_default")]
    pub runs: u32,
    #[serde(rename = "w", default, deserialize_with = "null_default")]
    pub wickets: u32,
    #[serde(rename = "o", default, deserialize_with = "null_default")]
    pub overs: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub inning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(default, deserialize_with = "null_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(rename = "matchType", default, deserialize_with = "null_default")]
    pub match_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_default")]
    pub venue: String,
    #[serde(default, deserialize_with = "null_default")]
    pub date: String,
    #[serde(rename = "dateTimeGMT", default, deserialize_with = "null_default")]
    pub date_time_gmt: String,
    #[serde(default, deserialize_with = "null_default")]
    pub teams: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub score: Vec<InningsScore>,
    #[serde(default, deserialize_with = "null_default")]
    pub series_id: String,
    #[serde(rename = "fantasyEnabled", default, deserialize_with = "null_default")]
    pub fantasy_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    #[serde(default, deserialize_with = "null_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub start_date: String,
    #[serde(default, deserialize_with = "null_default")]
    pub end_date: String,
    #[serde(default, deserialize_with = "null_default")]
    pub odi: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub t20: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub test: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub squads: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub matches: u32,
}
