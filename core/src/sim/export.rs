use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use super::country::CountryState;

#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    year: i32,
    country: &'a str,
    gdp_growth: f64,
    unemployment: f64,
    literacy_rate: f64,
    life_expectancy: f64,
    poverty_rate: f64,
    co2_emissions: f64,
    infant_mortality: f64,
    population: f64,
    tariff_revenue: f64,
    consumer_welfare: f64,
}

impl<'a> From<&'a CountryState> for HistoryRow<'a> {
    fn from(state: &'a CountryState) -> Self {
        Self {
            year: state.year,
            country: &state.country,
            gdp_growth: state.gdp_growth,
            unemployment: state.unemployment,
            literacy_rate: state.literacy_rate,
            life_expectancy: state.life_expectancy,
            poverty_rate: state.poverty_rate,
            co2_emissions: state.co2_emissions,
            infant_mortality: state.infant_mortality,
            population: state.population,
            tariff_revenue: state.tariff_revenue,
            consumer_welfare: state.consumer_welfare,
        }
    }
}

/// Writes one CSV row per recorded state, header first.
pub fn write_history<W: Write>(writer: W, history: &[CountryState]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    if history.is_empty() {
        csv.write_record(HEADER)
            .context("CSV ヘッダーの書き込みに失敗しました")?;
    }
    for state in history {
        csv.serialize(HistoryRow::from(state))
            .with_context(|| format!("{} 年の行を書き込めませんでした", state.year))?;
    }
    csv.flush().context("CSV の書き出しに失敗しました")?;
    Ok(())
}

const HEADER: [&str; 12] = [
    "year",
    "country",
    "gdp_growth",
    "unemployment",
    "literacy_rate",
    "life_expectancy",
    "poverty_rate",
    "co2_emissions",
    "infant_mortality",
    "population",
    "tariff_revenue",
    "consumer_welfare",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_then_one_row_per_state() {
        let mut first = CountryState::new("Asteria", 2023);
        first.gdp_growth = 4.5;
        let mut second = first.clone();
        second.year = 2024;

        let mut buffer = Vec::new();
        write_history(&mut buffer, &[first, second]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER.join(","));
        assert!(lines[1].starts_with("2023,Asteria,4.5,"));
        assert!(lines[2].starts_with("2024,Asteria,"));
    }

    #[test]
    fn empty_history_still_has_header() {
        let mut buffer = Vec::new();
        write_history(&mut buffer, &[]).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().trim_end(), HEADER.join(","));
    }
}
