//! # 検証サービスクライアント
//!
//! リモート検証サービスへの2つの操作を提供する:
//! - 既知の透かしIDによる照会（`GET /verify/{watermark}`）
//! - ファイル本体のアップロードによる照会（`POST /verify` multipart）
//!
//! どちらも[`snappy_types::RawVerificationResponse`]を返す。トランスポート
//! 障害（接続失敗・タイムアウト・非2xx）は判定エンジンに渡る前にこの層の
//! エラーとして表面化する。権威ある否定結果とは別の経路であり、呼び出し
//! 側は「検証が完了しなかった」として報告しなければならない。
//!
//! リトライはこの層には属さない（ID照会は冪等なので呼び出し側が
//! リトライしてよい）。

use snappy_types::{RawVerificationResponse, VerificationRequest};

/// クライアントエラー型。
///
/// トランスポート障害と判定結果を混同しないため、この層のエラーは
/// すべて「レスポンスが得られなかった」ことを意味する。
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP送信に失敗（接続エラー・タイムアウト等）
    #[error("検証サービスへのHTTP送信に失敗: {0}")]
    Transport(#[from] reqwest::Error),
    /// サーバーがエラーを返した
    #[error("検証サービスがエラーを返しました: HTTP {status} - {detail}")]
    Server {
        /// HTTPステータスコード
        status: u16,
        /// サーバー側のエラーメッセージ
        detail: String,
    },
    /// レスポンス本文のパースに失敗
    #[error("レスポンスのパースに失敗: {0}")]
    Parse(String),
}

/// 検証サービスクライアント。
pub struct VerifyClient {
    /// サービスのベースURL（末尾スラッシュなし）
    base_url: String,
    /// HTTPクライアント
    http_client: reqwest::Client,
}

impl VerifyClient {
    /// ベースURLを指定してクライアントを作成する。
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        VerifyClient {
            base_url,
            http_client: reqwest::Client::new(),
        }
    }

    /// 検証リクエストを送信し、生レスポンスを返す。
    pub async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<RawVerificationResponse, ClientError> {
        match request {
            VerificationRequest::WatermarkId(id) => self.verify_by_id(id).await,
            VerificationRequest::FileContent { file_name, bytes } => {
                self.verify_file(file_name, bytes.clone()).await
            }
        }
    }

    /// 既知の透かしIDで照会する。
    ///
    /// UIからはファイル名（WMK-XXXX.png）やURLが貼り付けられることが
    /// あるため、トークンはbasenameに切り詰め、拡張子を1つ取り除いて
    /// から送信する。
    pub async fn verify_by_id(
        &self,
        watermark: &str,
    ) -> Result<RawVerificationResponse, ClientError> {
        let token = normalize_token(watermark);
        tracing::debug!(token = %token, "透かしIDで照会します");

        let url = format!("{}/verify/{}", self.base_url, token);
        let response = self.http_client.get(&url).send().await?;
        read_response(response).await
    }

    /// ファイル本体をアップロードして照会する。
    pub async fn verify_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<RawVerificationResponse, ClientError> {
        tracing::debug!(
            file_name = %file_name,
            size = bytes.len(),
            "ファイルをアップロードして照会します"
        );

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = format!("{}/verify", self.base_url);
        let response = self.http_client.post(&url).multipart(form).send().await?;
        read_response(response).await
    }
}

/// レスポンスを読み取り、非2xxをエラーに変換する。
async fn read_response(
    response: reqwest::Response,
) -> Result<RawVerificationResponse, ClientError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        // FastAPI形式の {"detail": "..."} からメッセージを取り出す。
        // 取れなければ本文をそのまま使う
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str().map(String::from)))
            .unwrap_or(body);
        return Err(ClientError::Server {
            status: status.as_u16(),
            detail,
        });
    }

    serde_json::from_str(&body).map_err(|e| ClientError::Parse(e.to_string()))
}

/// 貼り付けられたトークンを照会用に正規化する。
/// パス区切りより後ろだけを残し、拡張子を1つ取り除く。
fn normalize_token(input: &str) -> String {
    let trimmed = input.trim();
    let basename = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed);
    match basename.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => basename.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::routing::{get, post};
    use axum::Json;

    /// トークン正規化: basename切り詰めと拡張子除去
    #[test]
    fn token_normalization() {
        assert_eq!(normalize_token("WMK-4106B40E"), "WMK-4106B40E");
        assert_eq!(normalize_token("WMK-4106B40E.png"), "WMK-4106B40E");
        assert_eq!(
            normalize_token("https://example.com/files/WMK-4106B40E.png"),
            "WMK-4106B40E"
        );
        assert_eq!(normalize_token("  WMK-4106B40E  "), "WMK-4106B40E");
        assert_eq!(normalize_token(".hidden"), ".hidden");
    }

    /// ベースURLの末尾スラッシュは除去される
    #[test]
    fn base_url_trailing_slash() {
        let client = VerifyClient::new("http://localhost:8000/");
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    /// テスト用モックサービスを起動する
    async fn start_mock_service() -> u16 {
        let app = axum::Router::new()
            .route(
                "/verify/{watermark}",
                get(|Path(watermark): Path<String>| async move {
                    Json(serde_json::json!({
                        "valid": true,
                        "method": "lookup",
                        "watermark_code": watermark,
                        "owner": {"name": "John Derik"}
                    }))
                }),
            )
            .route(
                "/verify",
                post(|| async {
                    Json(serde_json::json!({
                        "valid": false,
                        "reason": "watermark not found",
                        "fallback": {"match": true, "hamming_distance": 10}
                    }))
                }),
            )
            .route(
                "/broken",
                get(|| async {
                    (
                        axum::http::StatusCode::BAD_REQUEST,
                        Json(serde_json::json!({"detail": "Watermark not found"})),
                    )
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        // サーバー起動を待つ
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        port
    }

    /// ID照会: 貼り付けトークンが正規化されてレスポンスがパースされる
    #[tokio::test]
    async fn verify_by_id_roundtrip() {
        let port = start_mock_service().await;
        let client = VerifyClient::new(format!("http://127.0.0.1:{port}"));

        let raw = client.verify_by_id("WMK-4106B40E.png").await.unwrap();
        assert_eq!(raw.valid, Some(true));
        assert_eq!(raw.watermark_code.as_deref(), Some("WMK-4106B40E"));
        assert_eq!(
            raw.owner.as_ref().and_then(|o| o.name.as_deref()),
            Some("John Derik")
        );
    }

    /// ファイル照会: multipartアップロードとレスポンスのパース
    #[tokio::test]
    async fn verify_file_roundtrip() {
        let port = start_mock_service().await;
        let client = VerifyClient::new(format!("http://127.0.0.1:{port}"));

        let raw = client
            .verify_file("photo.png", vec![0x89, 0x50, 0x4E, 0x47])
            .await
            .unwrap();
        assert_eq!(raw.valid, Some(false));
        assert_eq!(
            raw.fallback.as_ref().and_then(|f| f.hamming_distance),
            Some(10.0)
        );
    }

    /// 非2xxレスポンスはServerエラーになり、detailが取り出される
    #[tokio::test]
    async fn non_2xx_becomes_server_error() {
        let port = start_mock_service().await;
        let client = VerifyClient::new(format!("http://127.0.0.1:{port}"));

        let url = format!("http://127.0.0.1:{port}/broken");
        let response = client.http_client.get(&url).send().await.unwrap();
        let err = read_response(response).await.unwrap_err();
        match err {
            ClientError::Server { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "Watermark not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
