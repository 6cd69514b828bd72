//! # 信頼度スコアの正規化
//!
//! 検出経路ごとに異なる数値シグナルを共通の[0,1]スケールと段階ラベルに
//! 変換する。欠落・非有限値は0として扱い、決してpanicしない。

use serde::Serialize;

/// 64bit dHashのハミング距離の上限。
/// 距離がこの値以上なら類似度は正確に0になる。
pub const MAX_HAMMING_DISTANCE: f64 = 64.0;

/// テキスト/メタデータ類似度の有意性フロア。
/// この値未満の計算済み類似度は「情報量なし」として扱う。
/// 文書本文がメタデータを文字通り含まないのは正常な結果であり、
/// エラーでも欠落でもない。
const TEXT_SIGNIFICANCE_FLOOR: f64 = 0.10;

/// シグナルの種別。正規化方法と有意性判定を決める。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// 既に0-1スケールで表現された信頼度
    /// （透かしデコード、署名検証、知覚マッチの各経路）
    Proportion,
    /// 知覚ハッシュ間のハミング距離（整数 0-64、小さいほど類似）
    Distance,
    /// OCRテキストとメタデータの類似度（0-1スケール）
    TextSimilarity,
}

/// 信頼度の段階。下限は包含（0.90ちょうどはExcellent）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConfidenceTier {
    /// 正規化値 < 0.40
    VeryWeak,
    /// 0.40以上
    Weak,
    /// 0.60以上
    Moderate,
    /// 0.75以上
    Strong,
    /// 0.90以上
    Excellent,
}

impl ConfidenceTier {
    fn from_value(value: f64) -> Self {
        if value >= 0.90 {
            ConfidenceTier::Excellent
        } else if value >= 0.75 {
            ConfidenceTier::Strong
        } else if value >= 0.60 {
            ConfidenceTier::Moderate
        } else if value >= 0.40 {
            ConfidenceTier::Weak
        } else {
            ConfidenceTier::VeryWeak
        }
    }

    /// 表示用ラベル。
    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTier::Excellent => "Excellent",
            ConfidenceTier::Strong => "Strong",
            ConfidenceTier::Moderate => "Moderate",
            ConfidenceTier::Weak => "Weak",
            ConfidenceTier::VeryWeak => "Very weak",
        }
    }
}

/// 表示上の深刻度。段階とは別の粗いはしごであり、両者のしきい値は
/// 意図的に異なる（互換性のため両方とも正確に再現すること）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 0.75以上
    Success,
    /// 0.50以上
    Warning,
    /// それ未満
    Error,
}

impl Severity {
    fn from_value(value: f64) -> Self {
        if value >= 0.75 {
            Severity::Success
        } else if value >= 0.50 {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

/// 正規化済み信頼度スコア。
///
/// `raw`は正規化前の入力（欠落・非有限値は`None`）、`value`は[0,1]に
/// クランプされた正規化値。`meaningful`が`false`のスコアは「計算されたが
/// 情報量がない」ことを示し、欠落シグナル（`raw == None`）とは区別される。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceScore {
    /// 正規化前の入力値
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<f64>,
    /// [0,1]に正規化された値
    pub value: f64,
    /// 段階ラベル
    pub tier: ConfidenceTier,
    /// 表示上の深刻度
    pub severity: Severity,
    /// シグナルに情報量があるか
    pub meaningful: bool,
}

/// 数値シグナルを正規化済みスコアに変換する。
///
/// - 欠落または非有限の入力は0として扱う
/// - `Distance`は `1 - min(64, max(0, d)) / 64` で反転する
///   （距離0 → 正確に1.0、距離64以上 → 正確に0.0）
/// - それ以外は[0,1]へのクランプのみ
pub fn normalize(raw: Option<f64>, kind: SignalKind) -> ConfidenceScore {
    let sanitized = raw.filter(|v| v.is_finite());

    let value = match (sanitized, kind) {
        (None, _) => 0.0,
        (Some(d), SignalKind::Distance) => {
            1.0 - d.clamp(0.0, MAX_HAMMING_DISTANCE) / MAX_HAMMING_DISTANCE
        }
        (Some(v), _) => v.clamp(0.0, 1.0),
    };

    // 有意性フロアはテキスト類似度の計算済みシグナルにのみ適用する。
    // 欠落シグナルのデフォルト0はここでは「情報量なし」扱いにしない。
    let meaningful = !(kind == SignalKind::TextSimilarity
        && sanitized.is_some()
        && value < TEXT_SIGNIFICANCE_FLOOR);

    ConfidenceScore {
        raw: sanitized,
        value,
        tier: ConfidenceTier::from_value(value),
        severity: Severity::from_value(value),
        meaningful,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// すべての入力で正規化値は[0,1]に収まる
    #[test]
    fn value_always_in_unit_range() {
        for raw in [-10.0, -0.1, 0.0, 0.3, 0.999, 1.0, 5.0, 1e9] {
            let score = normalize(Some(raw), SignalKind::Proportion);
            assert!((0.0..=1.0).contains(&score.value), "raw={raw}");
        }
    }

    /// 欠落・NaN・無限大は0に正規化される
    #[test]
    fn missing_and_non_finite_default_to_zero() {
        assert_eq!(normalize(None, SignalKind::Proportion).value, 0.0);
        assert_eq!(normalize(Some(f64::NAN), SignalKind::Proportion).value, 0.0);
        assert_eq!(
            normalize(Some(f64::INFINITY), SignalKind::Distance).value,
            0.0
        );
        assert!(normalize(Some(f64::NAN), SignalKind::Proportion).raw.is_none());
    }

    /// 距離正規化: 端点と飽和
    #[test]
    fn distance_endpoints_and_saturation() {
        assert_eq!(normalize(Some(0.0), SignalKind::Distance).value, 1.0);
        assert_eq!(normalize(Some(64.0), SignalKind::Distance).value, 0.0);
        assert_eq!(normalize(Some(128.0), SignalKind::Distance).value, 0.0);
        assert_eq!(normalize(Some(-3.0), SignalKind::Distance).value, 1.0);
    }

    /// 距離正規化は距離に対して単調非増加
    #[test]
    fn distance_monotonically_non_increasing() {
        let mut prev = f64::INFINITY;
        for d in 0..=80 {
            let value = normalize(Some(d as f64), SignalKind::Distance).value;
            assert!(value <= prev, "d={d}");
            prev = value;
        }
    }

    /// 段階しきい値は下限包含
    #[test]
    fn tier_boundaries_are_inclusive_lower() {
        assert_eq!(
            normalize(Some(0.90), SignalKind::Proportion).tier,
            ConfidenceTier::Excellent
        );
        assert_eq!(
            normalize(Some(0.8999), SignalKind::Proportion).tier,
            ConfidenceTier::Strong
        );
        assert_eq!(
            normalize(Some(0.75), SignalKind::Proportion).tier,
            ConfidenceTier::Strong
        );
        assert_eq!(
            normalize(Some(0.60), SignalKind::Proportion).tier,
            ConfidenceTier::Moderate
        );
        assert_eq!(
            normalize(Some(0.40), SignalKind::Proportion).tier,
            ConfidenceTier::Weak
        );
        assert_eq!(
            normalize(Some(0.3999), SignalKind::Proportion).tier,
            ConfidenceTier::VeryWeak
        );
    }

    /// 深刻度のはしごは段階より粗い
    #[test]
    fn severity_ladder() {
        assert_eq!(
            normalize(Some(0.75), SignalKind::Proportion).severity,
            Severity::Success
        );
        assert_eq!(
            normalize(Some(0.74), SignalKind::Proportion).severity,
            Severity::Warning
        );
        assert_eq!(
            normalize(Some(0.50), SignalKind::Proportion).severity,
            Severity::Warning
        );
        assert_eq!(
            normalize(Some(0.49), SignalKind::Proportion).severity,
            Severity::Error
        );
    }

    /// テキスト類似度の有意性フロア: 計算済み低値のみ「情報量なし」
    #[test]
    fn text_similarity_significance_floor() {
        let low = normalize(Some(0.05), SignalKind::TextSimilarity);
        assert!(!low.meaningful);
        assert_eq!(low.value, 0.05);

        let at_floor = normalize(Some(0.10), SignalKind::TextSimilarity);
        assert!(at_floor.meaningful);

        // 欠落シグナルは「情報量なし」ではなく「不在」
        let absent = normalize(None, SignalKind::TextSimilarity);
        assert!(absent.meaningful);
        assert!(absent.raw.is_none());

        // 他の種別にフロアは適用されない
        assert!(normalize(Some(0.05), SignalKind::Proportion).meaningful);
    }

    /// 表示ラベルの文言
    #[test]
    fn tier_labels() {
        assert_eq!(ConfidenceTier::VeryWeak.label(), "Very weak");
        assert_eq!(ConfidenceTier::Excellent.label(), "Excellent");
    }
}
