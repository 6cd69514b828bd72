//! # 判定結果の分類
//!
//! 検証サービスの生レスポンスを相互排他的な5つの結果バリアントのうち
//! ちょうど1つに分類する。ルールは固定の優先順位で評価され、最初に
//! 一致したものが勝つ（順序はフィルタではなく優先度を符号化している）。
//!
//! ## ルールカスケード
//! 1. 権威ある肯定（`valid == true`）
//! 2. 非権威の知覚マッチ（所有者識別あり）
//! 3. 曖昧な候補（複数の統計的に区別できないマッチ）
//! 4. フォールバック付き失敗（二次的な類似ヒントあり）
//! 5. 失敗
//!
//! 不正な形のフィールドは欠落として扱われ、次に該当するルールへ
//! 退行する。分類自体は決してエラーにならない。

use serde::Serialize;
use snappy_types::{FileMetadata, Owner, RawVerificationResponse};

use crate::rank::{rank, RankedCandidate};
use crate::score::{normalize, ConfidenceScore, SignalKind};

/// 暗号学的署名経路の信頼度ラベル。
/// 統計的抽出とは信頼の根拠が異なるため、ラベルで区別を保持する。
pub const SIGNATURE_CONFIDENCE_LABEL: &str = "Authoritative Signature Confidence";
/// 透かしデコード経路の信頼度ラベル。
pub const WATERMARK_CONFIDENCE_LABEL: &str = "Watermark Confidence";
/// 知覚マッチ強度のラベル（曖昧な候補バリアント用）。
pub const PERCEPTUAL_STRENGTH_LABEL: &str = "Perceptual Match Strength";
/// 非権威の知覚マッチにおける所有者一致信頼度のラベル。
pub const OWNERSHIP_CONFIDENCE_LABEL: &str = "Ownership Confidence";

/// `reason`欠落時の既定メッセージ。空欄のまま表示してはならない。
pub const DEFAULT_FAILURE_REASON: &str = "No watermark found or file is tampered.";

// ---------------------------------------------------------------------------
// 検出経路タグの分類
// ---------------------------------------------------------------------------

/// 検出経路の種別。`method`タグ（自由形式文字列）から導出する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodKind {
    /// 暗号学的署名検証（PAdES等）
    Signature,
    /// 知覚/視覚マッチ
    Perceptual,
    /// 曖昧な知覚マッチ（上流が曖昧と判定）
    PerceptualAmbiguous,
    /// 透かしデコードまたは不明
    Watermark,
}

/// `method`タグを部分文字列で分類する。
/// `signature_valid`の存在も署名経路の根拠になる
/// （このフィールドは署名経路のレスポンスにのみ現れる）。
fn method_kind(raw: &RawVerificationResponse) -> MethodKind {
    let tag = raw
        .method
        .as_deref()
        .unwrap_or("")
        .to_ascii_lowercase();

    if tag.contains("pades") || tag.contains("signature") || raw.signature_valid.is_some() {
        MethodKind::Signature
    } else if tag.contains("perceptual") || tag.contains("visual") {
        if tag.contains("ambiguous") {
            MethodKind::PerceptualAmbiguous
        } else {
            MethodKind::Perceptual
        }
    } else {
        MethodKind::Watermark
    }
}

// ---------------------------------------------------------------------------
// 判定結果の型
// ---------------------------------------------------------------------------

/// 所属組織の三値表現。
///
/// キー欠落（`Absent`）と意図的な空欄（`Blank`）を区別する。
/// 表示側がこの2つを混同すると「未入力」と「入力されたが空」の
/// 意味の違いが失われる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "name", rename_all = "snake_case")]
pub enum Organization {
    /// キー自体が存在しない
    Absent,
    /// 明示的に空文字列が与えられた
    Blank,
    /// 組織名あり
    Named(String),
}

impl From<Option<&str>> for Organization {
    fn from(value: Option<&str>) -> Self {
        match value {
            None => Organization::Absent,
            Some("") => Organization::Blank,
            Some(name) => Organization::Named(name.to_string()),
        }
    }
}

/// 判定結果に載せるメタデータ。`organization`を三値に展開した形。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMetadata {
    /// タイトル
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// 作者名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// 所属組織（三値）
    pub organization: Organization,
    /// 作成日
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

impl From<&FileMetadata> for ReportMetadata {
    fn from(meta: &FileMetadata) -> Self {
        ReportMetadata {
            title: meta.title.clone(),
            author: meta.author.clone(),
            organization: Organization::from(meta.organization.as_deref()),
            created_date: meta.created_date.clone(),
        }
    }
}

/// 権威ある肯定の判定結果。
#[derive(Debug, Clone, Serialize)]
pub struct AuthoritativeReport {
    /// 検出経路タグ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// 正規化済み信頼度。
    /// 数値スコアなしの権威ある肯定は最大信頼度1.0として扱う
    pub confidence: ConfidenceScore,
    /// 信頼度のラベル（署名経路と透かし経路で異なる）
    pub confidence_label: &'static str,
    /// 改ざんの疑い（`valid`とは独立）
    pub tamper_suspected: bool,
    /// 所有者情報
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    /// 登録時メタデータ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ReportMetadata>,
    /// 透かしID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_id: Option<String>,
    /// 人間可読の透かしコード
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_code: Option<String>,
    /// 発行日時
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    /// 元ファイルの作成日時
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_created_at: Option<String>,
    /// 補足説明
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 非権威の知覚マッチ。権威ある肯定より明示的に弱く、
/// 決して「valid」として報告してはならない。
#[derive(Debug, Clone, Serialize)]
pub struct PerceptualMatchReport {
    /// 検出経路タグ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// 正規化済み所有者一致信頼度
    pub ownership_confidence: ConfidenceScore,
    /// 信頼度のラベル
    pub confidence_label: &'static str,
    /// 改ざんの疑い
    pub tamper_suspected: bool,
    /// 所有者情報（このバリアントの成立条件）
    pub owner: Owner,
    /// 登録時メタデータ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ReportMetadata>,
    /// 補足説明
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 曖昧な知覚マッチ。複数の保存済みレコードが統計的に区別できない
/// 類似度で一致した状態。単一の勝者に潰さず、そのまま表示する。
#[derive(Debug, Clone, Serialize)]
pub struct AmbiguousReport {
    /// 検出経路タグ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// ランキング済み候補一覧（最大5件、上流順）
    pub candidates: Vec<RankedCandidate>,
    /// 正規化済みマッチ強度（存在する場合）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_strength: Option<ConfidenceScore>,
    /// マッチ強度のラベル
    pub strength_label: &'static str,
    /// 補足説明
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// フォールバック付き失敗。一次判定は失敗したが、二次的な類似マッチが
/// 見つかった状態。権威ある結果ではなくヒントとして扱う。
#[derive(Debug, Clone, Serialize)]
pub struct FallbackReport {
    /// 失敗理由（欠落時は既定メッセージ）
    pub reason: String,
    /// ハミング距離から正規化した類似度スコア
    pub similarity: ConfidenceScore,
    /// フォールバックマッチの所有者情報
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    /// フォールバックマッチの登録時メタデータ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ReportMetadata>,
    /// フォールバックマッチの発行日時
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    /// フォールバックマッチの元ファイル作成日時
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_created_at: Option<String>,
    /// フォールバック側の補足説明
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 失敗。`reason`は欠落時に既定メッセージへフォールバックする。
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    /// 失敗理由
    pub reason: String,
    /// 補足説明
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 判定結果。閉じたバリアント集合であり、レスポンスごとにちょうど
/// 1つのバリアントが選択される。「validかつinvalid」のような曖昧な
/// 状態は構造上表現できない。
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationResult {
    /// 権威ある肯定（署名検証成功または透かしデコード成功）
    Authoritative(AuthoritativeReport),
    /// 非権威の知覚マッチ
    PerceptualMatch(PerceptualMatchReport),
    /// 曖昧な候補
    AmbiguousCandidates(AmbiguousReport),
    /// フォールバック付き失敗
    FailedWithFallback(FallbackReport),
    /// 失敗
    Failed(FailureReport),
}

// ---------------------------------------------------------------------------
// 分類
// ---------------------------------------------------------------------------

/// 生レスポンスを判定結果に分類する。
///
/// 決定的・全域的（整形式の入力すべてに定義される）・副作用なし。
/// トランスポート障害はこの層に到達しない。レスポンスが得られなかった
/// 場合のエラー報告は呼び出し側の責務。
pub fn classify(raw: &RawVerificationResponse) -> VerificationResult {
    // ルール1: 権威ある肯定
    if raw.valid == Some(true) {
        return VerificationResult::Authoritative(authoritative(raw));
    }

    let kind = method_kind(raw);

    // ルール2: 非権威の知覚マッチ（所有者識別あり）
    if kind == MethodKind::Perceptual {
        if let Some(owner) = raw.owner.as_ref().filter(|o| o.has_identity()) {
            return VerificationResult::PerceptualMatch(PerceptualMatchReport {
                method: raw.method.clone(),
                ownership_confidence: normalize(
                    raw.ownership_confidence,
                    SignalKind::Proportion,
                ),
                confidence_label: OWNERSHIP_CONFIDENCE_LABEL,
                tamper_suspected: raw.tamper_suspected.unwrap_or(false),
                owner: owner.clone(),
                metadata: raw.metadata.as_ref().map(ReportMetadata::from),
                note: raw.note.clone(),
            });
        }
    }

    // ルール3: 曖昧な候補。
    // 曖昧性は上流の`method`タグを正とし、スコア差から再計算しない。
    if kind == MethodKind::PerceptualAmbiguous {
        if let Some(candidates) = raw.candidates.as_deref().filter(|c| !c.is_empty()) {
            let ranked = rank(candidates, true);
            return VerificationResult::AmbiguousCandidates(AmbiguousReport {
                method: raw.method.clone(),
                candidates: ranked.ordered,
                match_strength: raw
                    .ownership_confidence
                    .map(|v| normalize(Some(v), SignalKind::Proportion)),
                strength_label: PERCEPTUAL_STRENGTH_LABEL,
                note: raw.note.clone(),
            });
        }
    }

    // ルール4: フォールバック付き失敗
    if let Some(fallback) = raw.fallback.as_ref().filter(|f| f.matched == Some(true)) {
        return VerificationResult::FailedWithFallback(FallbackReport {
            reason: failure_reason(raw),
            similarity: normalize(fallback.hamming_distance, SignalKind::Distance),
            owner: fallback.owner.clone(),
            metadata: fallback.metadata.as_ref().map(ReportMetadata::from),
            issued_at: fallback.issued_at.clone(),
            source_created_at: fallback.source_created_at.clone(),
            note: fallback.note.clone(),
        });
    }

    // ルール5: 失敗
    VerificationResult::Failed(FailureReport {
        reason: failure_reason(raw),
        note: raw.note.clone(),
    })
}

/// 権威ある肯定の結果を組み立てる。
fn authoritative(raw: &RawVerificationResponse) -> AuthoritativeReport {
    // 数値スコアなしの権威ある肯定は「スコア不明の推測」ではなく
    // 肯定そのものなので、最大信頼度として扱う
    let confidence = match raw.confidence.filter(|v| v.is_finite()) {
        Some(v) => normalize(Some(v), SignalKind::Proportion),
        None => normalize(Some(1.0), SignalKind::Proportion),
    };

    let confidence_label = if method_kind(raw) == MethodKind::Signature {
        SIGNATURE_CONFIDENCE_LABEL
    } else {
        WATERMARK_CONFIDENCE_LABEL
    };

    AuthoritativeReport {
        method: raw.method.clone(),
        confidence,
        confidence_label,
        tamper_suspected: raw.tamper_suspected.unwrap_or(false),
        owner: raw.owner.clone(),
        metadata: raw.metadata.as_ref().map(ReportMetadata::from),
        watermark_id: raw.watermark_id.clone(),
        watermark_code: raw.watermark_code.clone(),
        issued_at: raw.issued_at.clone(),
        source_created_at: raw.source_created_at.clone(),
        note: raw.note.clone(),
    }
}

/// 失敗理由を取り出す。欠落・空文字列は既定メッセージに置き換える。
fn failure_reason(raw: &RawVerificationResponse) -> String {
    raw.reason
        .as_deref()
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_FAILURE_REASON)
        .to_string()
}
