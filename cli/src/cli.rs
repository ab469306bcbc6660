mod commands;

use std::io::{self, BufRead, Write};

use anyhow::{Context as _, Result, anyhow};
use regionsim_core::{CountryState, Indicator, Simulation, YearReport};

use commands::{CommandRegistry, Context};

pub fn run(simulation: &mut Simulation) -> Result<()> {
    print_intro(simulation);
    let registry = CommandRegistry::default();
    let stdin = io::stdin();

    loop {
        print!("{}年> ", simulation.year());
        io::stdout()
            .flush()
            .context("プロンプトのフラッシュに失敗しました")?;

        let mut line = String::new();
        let bytes = stdin
            .lock()
            .read_line(&mut line)
            .context("入力の読み込みに失敗しました")?;

        if bytes == 0 {
            println!("入力が終了したためシミュレーションを終了します。");
            return Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut ctx = Context::new(simulation);
        if let Err(error) = registry.execute_input(&mut ctx, trimmed) {
            println!("エラー: {error}");
        }
    }
}

fn print_intro(simulation: &Simulation) {
    println!("地域政策シミュレーターへようこそ。");
    println!(
        "{} ヶ国が参加しています。あなたは {} の政策を担当します。",
        simulation.countries().len(),
        simulation.player()
    );
    println!("コマンド例: overview / levers / set tariffs 5 / advance 3 / score");
    println!("help で利用可能なコマンド一覧を表示します。");
}

pub(crate) fn print_help() {
    println!("利用可能なコマンド:");
    println!("  overview              各国の主要指標を表示");
    println!("  inspect <国>          指標と政策の詳細を表示");
    println!("  levers                政策レバーと現在値・予約値を表示");
    println!("  set <レバー> <値>     次の年に適用する政策値を予約");
    println!("  clear                 予約した政策値をすべて取り消す");
    println!("  advance [年数]        シミュレーションを進める (既定 1 年)");
    println!("  spillovers [detail|json]  直近年のスピルオーバーを表示");
    println!("  events                これまでの地域イベントを表示");
    println!("  score                 現在のスコアを表示");
    println!("  export <パス>         自国の年次履歴を CSV で保存");
    println!("  quit                  終了");
}

pub(crate) fn print_overview(simulation: &Simulation) {
    println!(
        "ID | {:<12} | {:>7} | {:>6} | {:>6} | {:>6} | {:>6} | {:>6}",
        "国名", "GDP%", "失業%", "識字%", "寿命", "貧困%", "CO2"
    );
    for (idx, country) in simulation.countries().iter().enumerate() {
        let marker = if country.country == simulation.player() {
            "*"
        } else {
            " "
        };
        println!(
            "{:>2}{}| {:<12} | {:>7.2} | {:>6.2} | {:>6.1} | {:>6.1} | {:>6.1} | {:>6.2}",
            idx + 1,
            marker,
            country.country,
            country.gdp_growth,
            country.unemployment,
            country.literacy_rate,
            country.life_expectancy,
            country.poverty_rate,
            country.co2_emissions
        );
    }
    println!("地域協力指数: {:.1}", simulation.cooperation_index());
}

pub(crate) fn print_country_details(simulation: &Simulation, country: &CountryState) {
    println!("-- {} の状況 ({} 年) --", country.country, country.year);
    for indicator in Indicator::OUTCOMES {
        println!("  {:<18}: {:>12.2}", indicator.key(), country.indicator(indicator));
    }
    println!(
        "  産業構成: 農業 {:.1}% / 製造業 {:.1}% / サービス {:.1}%",
        country.agriculture_gdp_percent,
        country.manufacturing_gdp_percent,
        country.services_gdp_percent
    );
    println!(
        "  関税収入: {:.2} / 消費者厚生: {:.1}",
        country.tariff_revenue, country.consumer_welfare
    );
    println!("政策:");
    for lever in simulation.levers().iter() {
        println!("  {:<22}: {:>6.2}", lever.id, lever.previous(country));
    }
    println!("貿易相手:");
    for (edge, partner) in simulation.trade_graph().edges_touching(&country.country) {
        let arrow = if edge.from == country.country { "->" } else { "<-" };
        println!(
            "  {} {:<12} 取引量 {:>5.1} 関税 {:>4.1}% 協力 {:>5.1}",
            arrow, partner, edge.trade_volume, edge.tariff_rate, edge.cooperation
        );
    }
}

pub(crate) fn print_levers(simulation: &Simulation) -> Result<()> {
    let player = simulation
        .country(simulation.player())
        .ok_or_else(|| anyhow!("担当国が見つかりません: {}", simulation.player()))?;
    println!(
        "{:<22} | {:>7} | {:>7} | {:>13}",
        "レバー", "現在値", "予約値", "範囲"
    );
    for lever in simulation.levers().iter() {
        let pending = simulation
            .pending_decisions()
            .iter()
            .find(|decision| decision.id == lever.id)
            .map(|decision| format!("{:.2}", decision.value))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<22} | {:>7.2} | {:>7} | {:>5.1} - {:>5.1}",
            lever.id,
            lever.previous(player),
            pending,
            lever.min,
            lever.max
        );
    }
    Ok(())
}

pub(crate) fn print_report(report: &YearReport) {
    println!("--- {} 年の結果 ---", report.year);
    for line in &report.lines {
        println!("- {line}");
    }
    println!("--------------------------");
}

pub(crate) fn resolve_country<'a>(
    simulation: &'a Simulation,
    token: &str,
) -> Result<&'a CountryState> {
    simulation.find_country(token).ok_or_else(|| {
        anyhow!(
            "国が見つかりません: {}. 番号または国名を指定してください。",
            token
        )
    })
}

pub(crate) fn parse_number(token: &str, label: &str) -> Result<f64> {
    let value: f64 = token
        .parse()
        .map_err(|_| anyhow!("{}は数値で指定してください: {}", label, token))?;
    if !value.is_finite() {
        return Err(anyhow!("{}が不正です: {}", label, token));
    }
    Ok(value)
}

pub(crate) fn parse_years(token: Option<&str>) -> Result<u32> {
    let Some(token) = token else {
        return Ok(1);
    };
    let years: u32 = token
        .parse()
        .map_err(|_| anyhow!("年数は正の整数で指定してください: {}", token))?;
    if years == 0 || years > 100 {
        return Err(anyhow!("年数は 1 から 100 の範囲で指定してください。"));
    }
    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_years_defaults_to_one() {
        assert_eq!(parse_years(None).unwrap(), 1);
        assert_eq!(parse_years(Some("5")).unwrap(), 5);
        assert!(parse_years(Some("0")).is_err());
        assert!(parse_years(Some("abc")).is_err());
    }

    #[test]
    fn parse_number_rejects_non_finite() {
        assert_eq!(parse_number("12.5", "関税").unwrap(), 12.5);
        assert!(parse_number("NaN", "関税").is_err());
        assert!(parse_number("x", "関税").is_err());
    }
}
