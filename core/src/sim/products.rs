use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

const EMBEDDED_PRODUCTS: &str = include_str!("../../../config/trade_products.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductFlow {
    Import,
    Export,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFlowEntry {
    pub importer: String,
    pub exporter: String,
    #[serde(default)]
    pub products: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProductFile {
    #[serde(default)]
    flows: Vec<ProductFlowEntry>,
}

/// Bilateral trade-product catalog keyed by (importer, exporter).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeProductCatalog {
    flows: Vec<ProductFlowEntry>,
}

impl TradeProductCatalog {
    pub fn new(flows: Vec<ProductFlowEntry>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for flow in &flows {
            ensure!(
                flow.importer != flow.exporter,
                "輸入国と輸出国が同一です: {}",
                flow.importer
            );
            ensure!(
                seen.insert((flow.importer.as_str(), flow.exporter.as_str())),
                "品目リストが重複しています: {} <- {}",
                flow.importer,
                flow.exporter
            );
        }
        Ok(Self { flows })
    }

    pub fn from_embedded() -> Result<Self> {
        Self::from_json_str("trade_products.json", EMBEDDED_PRODUCTS)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("ファイルの読み込みに失敗しました: {}", path.display()))?;
        Self::from_json_str(&path.display().to_string(), &content)
    }

    pub fn from_json_str(name: &str, content: &str) -> Result<Self> {
        let file: ProductFile = serde_json::from_str(content)
            .with_context(|| format!("貿易品目 JSON の解析に失敗しました: {}", name))?;
        Self::new(file.flows).with_context(|| format!("貿易品目の定義が不正です: {}", name))
    }

    /// Products `importer` buys from `exporter`. Empty when nothing is recorded.
    pub fn products(&self, importer: &str, exporter: &str) -> &[String] {
        self.flows
            .iter()
            .find(|flow| flow.importer == importer && flow.exporter == exporter)
            .map(|flow| flow.products.as_slice())
            .unwrap_or(&[])
    }

    pub fn partners(&self, country: &str) -> Vec<String> {
        let partners: BTreeSet<&str> = self
            .flows
            .iter()
            .filter_map(|flow| {
                if flow.importer == country {
                    Some(flow.exporter.as_str())
                } else if flow.exporter == country {
                    Some(flow.importer.as_str())
                } else {
                    None
                }
            })
            .collect();
        partners.into_iter().map(str::to_string).collect()
    }

    /// Everything `country` trades with `partner`, seen from `country`.
    /// Imports come first, then exports.
    pub fn traded_with(&self, country: &str, partner: &str) -> Vec<(&str, ProductFlow)> {
        let imports = self
            .products(country, partner)
            .iter()
            .map(|product| (product.as_str(), ProductFlow::Import));
        let exports = self
            .products(partner, country)
            .iter()
            .map(|product| (product.as_str(), ProductFlow::Export));
        imports.chain(exports).collect()
    }
}
