use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeGraphError {
    #[error("自国同士の貿易関係は定義できません: {0}")]
    SelfLoop(String),

    #[error("貿易関係が重複しています: {from} -> {to}")]
    DuplicateEdge { from: String, to: String },

    #[error("貿易関係 {from} -> {to} の {field} が範囲外です: {value}")]
    OutOfRange {
        from: String,
        to: String,
        field: &'static str,
        value: f64,
    },

    #[error("貿易関係に未知の国が含まれています: {0}")]
    UnknownCountry(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("参照データ {0} が読み込まれていません。シミュレーション構築前に読み込んでください。")]
    ReferenceDataNotLoaded(&'static str),

    #[error("国が1つも定義されていません。最低1件の国を用意してください。")]
    EmptyRoster,

    #[error("国が見つかりません: {0}")]
    UnknownCountry(String),

    #[error("未知の政策レバーです: {0}")]
    UnknownLever(String),

    #[error(transparent)]
    TradeGraph(#[from] TradeGraphError),
}
