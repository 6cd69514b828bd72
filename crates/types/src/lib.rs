//! # SnappyTrace 共有型定義
//!
//! 検証サービスとの間でやり取りされるデータ構造をRust構造体として提供する。
//!
//! ## デシリアライズ規則
//! 検証サービスのレスポンスは信頼できない入力として扱う。型が想定と異なる
//! フィールドはエラーにせず「欠落」として読み込み、判定は判定エンジン側の
//! ルールカスケードに委ねる（`lenient`ヘルパー参照）。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// 検証リクエスト
// ---------------------------------------------------------------------------

/// 検証リクエスト。透かしIDかファイル本体のどちらか一方のみを持つ。
/// 「両方」「どちらもなし」は構造上表現できない。
#[derive(Debug, Clone)]
pub enum VerificationRequest {
    /// 既知の透かしID（またはWMK-コード）による照会
    WatermarkId(String),
    /// ファイル本体のアップロードによる照会
    FileContent {
        /// 元のファイル名（multipartのfilenameとして送信される）
        file_name: String,
        /// ファイルのバイト列
        bytes: Vec<u8>,
    },
}

// ---------------------------------------------------------------------------
// 検証サービスの生レスポンス
// ---------------------------------------------------------------------------

/// 検証サービスから受信する生レスポンス。
///
/// すべてのフィールドはOptionalであり、型不一致は欠落として吸収する。
/// `valid`が`true`になるのは権威ある肯定（署名検証成功または透かしデコード
/// 成功）のときのみ。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawVerificationResponse {
    /// 使用された検出経路のタグ（例: "pades", "perceptual_pdf",
    /// "perceptual_pdf_ambiguous"）
    #[serde(default, deserialize_with = "lenient")]
    pub method: Option<String>,
    /// 権威ある肯定かどうか
    #[serde(default, deserialize_with = "lenient")]
    pub valid: Option<bool>,
    /// 検出経路固有の信頼度シグナル（範囲は経路依存）
    #[serde(default, deserialize_with = "lenient")]
    pub confidence: Option<f64>,
    /// 所有者一致の信頼度シグナル（知覚マッチ経路）
    #[serde(default, deserialize_with = "lenient")]
    pub ownership_confidence: Option<f64>,
    /// 改ざんの疑い。`valid`とは独立
    #[serde(default, deserialize_with = "lenient")]
    pub tamper_suspected: Option<bool>,
    /// 署名検証結果。署名経路のレスポンスにのみ現れる
    #[serde(default, deserialize_with = "lenient")]
    pub signature_valid: Option<bool>,
    /// 所有者情報
    #[serde(default, deserialize_with = "lenient")]
    pub owner: Option<Owner>,
    /// 登録時に添付されたメタデータ
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<FileMetadata>,
    /// 透かしID
    #[serde(default, deserialize_with = "lenient")]
    pub watermark_id: Option<String>,
    /// 人間可読の透かしコード（WMK-XXXX形式）
    #[serde(default, deserialize_with = "lenient")]
    pub watermark_code: Option<String>,
    /// 発行日時（ISO 8601文字列）
    #[serde(default, deserialize_with = "lenient")]
    pub issued_at: Option<String>,
    /// 元ファイルの作成日時（ISO 8601文字列）
    #[serde(default, deserialize_with = "lenient")]
    pub source_created_at: Option<String>,
    /// 曖昧な知覚マッチの候補一覧（マッチャーのタイブレーク順）
    #[serde(default, deserialize_with = "lenient")]
    pub candidates: Option<Vec<Candidate>>,
    /// 一次判定失敗後に見つかった二次的な知覚マッチ
    #[serde(default, deserialize_with = "lenient")]
    pub fallback: Option<FallbackMatch>,
    /// 失敗理由（自由テキスト）
    #[serde(default, deserialize_with = "lenient")]
    pub reason: Option<String>,
    /// 補足説明（自由テキスト）
    #[serde(default, deserialize_with = "lenient")]
    pub note: Option<String>,
}

/// 所有者情報。
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Owner {
    /// 表示名
    #[serde(default, deserialize_with = "lenient")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// メールアドレス
    #[serde(default, deserialize_with = "lenient")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Owner {
    /// 名前またはメールアドレスのどちらかが存在するか。
    pub fn has_identity(&self) -> bool {
        self.name.as_deref().is_some_and(|s| !s.is_empty())
            || self.email.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// 登録時に添付されたファイルメタデータ。
///
/// `organization`はキー欠落と明示的な空文字列を区別する必要がある
/// （アップロードフォームは空欄のまま送信できるため、空文字列は
/// 「意図的に未記入」を意味する）。ワイヤ上は`Option<String>`で表現し、
/// 判定結果側で三値に展開する。
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileMetadata {
    /// タイトル
    #[serde(default, deserialize_with = "lenient")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// 作者名
    #[serde(default, deserialize_with = "lenient")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// 所属組織。`Some("")`はキー欠落とは異なる意味を持つ
    #[serde(default, deserialize_with = "lenient")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// 作成日
    #[serde(
        default,
        deserialize_with = "lenient",
        rename = "createdDate",
        alias = "created_date"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

/// 知覚マッチ候補。統計的に区別できない複数のマッチ仮説のうちの1つ。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Candidate {
    /// 透かしID
    #[serde(default, deserialize_with = "lenient")]
    pub watermark_id: Option<String>,
    /// 人間可読の透かしコード
    #[serde(default, deserialize_with = "lenient")]
    pub watermark_code: Option<String>,
    /// 所有者情報
    #[serde(default, deserialize_with = "lenient")]
    pub owner: Option<Owner>,
    /// マッチスコア（0-1スケール）
    #[serde(default, deserialize_with = "lenient")]
    pub score: Option<f64>,
    /// 距離由来スコア（バックエンド側で0-1に変換済み）
    #[serde(default, deserialize_with = "lenient")]
    pub dist_score: Option<f64>,
}

/// 一次判定失敗後の二次的な知覚マッチ。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FallbackMatch {
    /// マッチが成立したか
    #[serde(default, deserialize_with = "lenient", rename = "match")]
    pub matched: Option<bool>,
    /// 検出経路のタグ（例: "perceptual_hash"）
    #[serde(default, deserialize_with = "lenient")]
    pub method: Option<String>,
    /// 知覚ハッシュ間のハミング距離（観測レンジ 0-64）
    #[serde(default, deserialize_with = "lenient")]
    pub hamming_distance: Option<f64>,
    /// マッチ種別（例: "possible"）
    #[serde(default, deserialize_with = "lenient")]
    pub match_type: Option<String>,
    /// 所有者情報
    #[serde(default, deserialize_with = "lenient")]
    pub owner: Option<Owner>,
    /// 登録時メタデータ
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<FileMetadata>,
    /// 発行日時（ISO 8601文字列）
    #[serde(default, deserialize_with = "lenient")]
    pub issued_at: Option<String>,
    /// 元ファイルの作成日時（ISO 8601文字列）
    #[serde(default, deserialize_with = "lenient")]
    pub source_created_at: Option<String>,
    /// 補足説明
    #[serde(default, deserialize_with = "lenient")]
    pub note: Option<String>,
}

// ---------------------------------------------------------------------------
// 寛容デシリアライズ
// ---------------------------------------------------------------------------

/// 型不一致を欠落として吸収するデシリアライザ。
///
/// 例えば`candidates`がリストでない場合や`confidence`が数値でない場合、
/// エラーにせず`None`を返す。不正な形のレスポンスで判定が失敗しないための
/// 防波堤であり、どのルールに落ちるかの決定は判定エンジンに残す。
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
