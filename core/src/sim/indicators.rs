use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const EMBEDDED_INDICATORS: &str = include_str!("../../../config/indicators.json");

/// Historical indicator values: indicator → country → year → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorTable {
    series: BTreeMap<String, BTreeMap<String, BTreeMap<i32, f64>>>,
}

impl IndicatorTable {
    pub fn from_embedded() -> Result<Self> {
        Self::from_json_str("indicators.json", EMBEDDED_INDICATORS)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("ファイルの読み込みに失敗しました: {}", path.display()))?;
        Self::from_json_str(&path.display().to_string(), &content)
    }

    pub fn from_json_str(name: &str, content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .with_context(|| format!("指標データ JSON の解析に失敗しました: {}", name))
    }

    pub fn insert(&mut self, indicator: &str, country: &str, year: i32, value: f64) {
        self.series
            .entry(indicator.to_string())
            .or_default()
            .entry(country.to_string())
            .or_default()
            .insert(year, value);
    }

    pub fn get(&self, indicator: &str, country: &str, year: i32) -> Option<f64> {
        self.series.get(indicator)?.get(country)?.get(&year).copied()
    }

    pub fn latest(&self, indicator: &str, country: &str) -> Option<f64> {
        self.series
            .get(indicator)?
            .get(country)?
            .last_key_value()
            .map(|(_, value)| *value)
    }

    /// Most recent year recorded for any indicator of any country.
    pub fn latest_year(&self) -> Option<i32> {
        self.series
            .values()
            .flat_map(|by_country| by_country.values())
            .filter_map(|by_year| by_year.last_key_value().map(|(year, _)| *year))
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_returns_most_recent_year() {
        let table = IndicatorTable::from_json_str(
            "inline.json",
            r#"{ "gdp_growth": { "Asteria": { "2021": 2.5, "2023": 3.4, "2022": 1.9 } } }"#,
        )
        .unwrap();
        assert_eq!(table.get("gdp_growth", "Asteria", 2022), Some(1.9));
        assert_eq!(table.get("gdp_growth", "Asteria", 2020), None);
        assert_eq!(table.latest("gdp_growth", "Asteria"), Some(3.4));
        assert_eq!(table.latest("gdp_growth", "Borealis"), None);
        assert_eq!(table.latest("literacy_rate", "Asteria"), None);
        assert_eq!(table.latest_year(), Some(2023));
    }

    #[test]
    fn embedded_table_loads() {
        let table = IndicatorTable::from_embedded().expect("embedded indicators");
        assert!(table.latest("gdp_growth", "Asteria").is_some());
        assert_eq!(table.latest_year(), Some(2023));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = IndicatorTable::from_json_str("broken.json", "{ \"gdp_growth\": [").unwrap_err();
        assert!(format!("{}", err).contains("broken.json"));
    }
}
