//! # SnappyTrace Verdict Engine
//!
//! 検証サービスの生レスポンスを単一の判定結果に分類する純粋ロジック。
//!
//! ## 処理フロー
//! 1. 生レスポンスの検出経路タグを分類する
//! 2. 優先順位付きルールカスケードで結果バリアントを1つ選択する
//! 3. 経路ごとの信頼度シグナルを共通の[0,1]スケールに正規化する
//! 4. 曖昧な知覚マッチの候補を順序維持のまま上位5件に絞る
//!
//! エンジンは同期・純粋・ステートレスであり、I/Oもロックも持たない。
//! リクエストの送信とトランスポート障害の報告は呼び出し側の責務。

mod classify;
mod rank;
mod score;

pub use classify::{
    classify, AmbiguousReport, AuthoritativeReport, FailureReport, FallbackReport, Organization,
    PerceptualMatchReport, ReportMetadata, VerificationResult, DEFAULT_FAILURE_REASON,
    OWNERSHIP_CONFIDENCE_LABEL, PERCEPTUAL_STRENGTH_LABEL, SIGNATURE_CONFIDENCE_LABEL,
    WATERMARK_CONFIDENCE_LABEL,
};
pub use rank::{rank, RankedCandidate, RankedCandidates, MAX_SURFACED_CANDIDATES};
pub use score::{normalize, ConfidenceScore, ConfidenceTier, Severity, SignalKind};
