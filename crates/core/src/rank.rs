//! # 知覚マッチ候補のランキング
//!
//! 候補はマッチャー側のタイブレークを反映した順序で到着する。ここでは
//! 再ソートせず、表示サイズを上限5件に制限し、数値フィールドを正規化して
//! 添付するのみ。曖昧性の判定は上流の`method`タグを信頼し、スコア差から
//! 再計算しない。

use serde::Serialize;
use snappy_types::{Candidate, Owner};

use crate::score::{normalize, ConfidenceScore, SignalKind};

/// 表示する候補数の上限。
pub const MAX_SURFACED_CANDIDATES: usize = 5;

/// 正規化済みスコアを添付した候補。
///
/// `score`と`dist_score`の両方を欠く候補も除外しない。スコアは「不明」と
/// して表示される（0にすると非マッチの確証があるように見えてしまう）。
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    /// 透かしID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_id: Option<String>,
    /// 人間可読の透かしコード
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_code: Option<String>,
    /// 所有者情報
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    /// 正規化済みマッチスコア（存在する場合のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ConfidenceScore>,
    /// 正規化済み距離由来スコア（存在する場合のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist_score: Option<ConfidenceScore>,
}

/// ランキング結果。
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidates {
    /// 上流の順序を維持した候補一覧（最大5件）
    pub ordered: Vec<RankedCandidate>,
    /// 上流が曖昧と判定したか（`method`タグ由来、ここでは再計算しない）
    pub ambiguous: bool,
}

/// 候補一覧を表示用に整形する。
///
/// - 上流の順序を維持する（マッチャー自身のタイブレークが正）
/// - 上位5件に制限する
/// - 存在する数値フィールドのみ正規化する
pub fn rank(candidates: &[Candidate], ambiguous: bool) -> RankedCandidates {
    let ordered = candidates
        .iter()
        .take(MAX_SURFACED_CANDIDATES)
        .map(|c| RankedCandidate {
            watermark_id: c.watermark_id.clone(),
            watermark_code: c.watermark_code.clone(),
            owner: c.owner.clone(),
            score: c.score.map(|v| normalize(Some(v), SignalKind::Proportion)),
            dist_score: c
                .dist_score
                .map(|v| normalize(Some(v), SignalKind::Proportion)),
        })
        .collect();

    RankedCandidates { ordered, ambiguous }
}
