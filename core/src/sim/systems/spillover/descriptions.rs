use super::PolicyCategory;

const DEFAULT_PRODUCT: &str = "主要品目";

struct DescriptionTemplate {
    category: PolicyCategory,
    keyword: Option<&'static str>,
    positive: &'static str,
    negative: &'static str,
}

const TEMPLATES: &[DescriptionTemplate] = &[
    DescriptionTemplate {
        category: PolicyCategory::Agriculture,
        keyword: Some("rice"),
        positive: "{source} のコメ増産で {target} の {product} 調達価格が下がり、家計を下支えします。",
        negative: "{source} の農業支出削減で {target} の {product} 調達が逼迫します。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Agriculture,
        keyword: Some("palm oil"),
        positive: "{source} のパーム油増産が {target} の食品・化学産業の原料調達を安定させます。",
        negative: "{source} のパーム油生産縮小で {target} の食品・化学産業のコストが上昇します。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Agriculture,
        keyword: None,
        positive: "{source} の農業投資が {target} との {product} 取引を拡大させます。",
        negative: "{source} の農業支出削減で {target} との {product} 取引が縮小します。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Energy,
        keyword: Some("crude"),
        positive: "{source} の原油供給拡大で {target} の {product} 調達が安定します。",
        negative: "{source} のエネルギー投資削減で {target} の {product} 供給不安が高まります。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Energy,
        keyword: Some("coal"),
        positive: "{source} の石炭増産で {target} の発電コストが下がりますが、排出も増えます。",
        negative: "{source} の石炭減産で {target} の発電燃料の確保が難しくなります。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Energy,
        keyword: None,
        positive: "{source} のエネルギー政策が {target} の {product} 価格を押し下げます。",
        negative: "{source} のエネルギー政策が {target} の {product} 価格を押し上げます。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Manufacturing,
        keyword: Some("vehicle"),
        positive: "{source} の製造業振興で {target} との自動車サプライチェーンが強化されます。",
        negative: "{source} の製造業支援縮小で {target} の自動車部品需要が落ち込みます。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Manufacturing,
        keyword: None,
        positive: "{source} の製造業振興が {target} との {product} 取引を活発にします。",
        negative: "{source} の製造業支援縮小で {target} との {product} 取引が停滞します。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Technology,
        keyword: Some("semiconductor"),
        positive: "{source} の半導体投資で {target} の電子産業に部材が行き渡ります。",
        negative: "{source} の技術投資削減で {target} の半導体調達が不安定になります。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Technology,
        keyword: None,
        positive: "{source} の技術投資が {target} に {product} を通じて波及します。",
        negative: "{source} の技術投資削減で {target} の {product} 取引が鈍ります。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Infrastructure,
        keyword: None,
        positive: "{source} のインフラ整備が {target} との物流と {product} 取引を改善します。",
        negative: "{source} のインフラ投資削減で {target} との物流が滞ります。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Health,
        keyword: None,
        positive: "{source} の保健支出拡大が {target} の {product} 需要と医療協力を後押しします。",
        negative: "{source} の保健支出削減で {target} との医療協力が弱まります。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Education,
        keyword: None,
        positive: "{source} の教育投資で育った人材が {target} の労働市場にも恩恵をもたらします。",
        negative: "{source} の教育投資削減で {target} が受け入れる技能人材が減少します。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Trade,
        keyword: None,
        positive: "{source} の市場開放が {target} の輸出機会を広げます。",
        negative: "{source} の保護主義的な動きが {target} の輸出を圧迫します。",
    },
    DescriptionTemplate {
        category: PolicyCategory::Environment,
        keyword: None,
        positive: "{source} の環境対策が越境汚染を減らし、{target} の大気を改善します。",
        negative: "{source} の環境対策後退で {target} への越境汚染が増えます。",
    },
];

/// Human-readable line for a detailed spillover. Keyword-specific wording wins over the
/// category default.
pub(super) fn describe(
    category: PolicyCategory,
    keyword: Option<&str>,
    effect: f64,
    source: &str,
    target: &str,
    product: Option<&str>,
) -> String {
    let specific = keyword.and_then(|keyword| {
        TEMPLATES
            .iter()
            .find(|template| template.category == category && template.keyword == Some(keyword))
    });
    let Some(template) = specific.or_else(|| {
        TEMPLATES
            .iter()
            .find(|template| template.category == category && template.keyword.is_none())
    }) else {
        return format!("{} の政策が {} に波及します。", source, target);
    };

    let text = if effect >= 0.0 {
        template.positive
    } else {
        template.negative
    };
    [
        ("{source}", source),
        ("{target}", target),
        ("{product}", product.unwrap_or(DEFAULT_PRODUCT)),
    ]
    .iter()
    .fold(text.to_string(), |message, (token, value)| {
        message.replace(token, value)
    })
}
