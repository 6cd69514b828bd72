//! # SnappyTrace 検証CLI
//!
//! 透かしIDまたはファイルをリモート検証サービスに照会し、判定エンジンで
//! 分類した結果を表示する。
//!
//! ```text
//! snappy-cli verify --id WMK-4106B40E
//! snappy-cli verify --file photo.png --json
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use snappy_client::VerifyClient;
use snappy_core::{classify, ConfidenceScore, Organization, VerificationResult};
use snappy_types::VerificationRequest;

/// デフォルトの検証サービスURL。
const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

#[derive(Parser)]
#[command(name = "snappy-cli", about = "SnappyTrace verification CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 透かしIDまたはファイルの検証
    Verify(VerifyArgs),
}

/// `verify`サブコマンドの引数。
/// IDかファイルのどちらか一方のみを受け付ける（両方・どちらもなしは拒否）。
#[derive(Args)]
#[command(group = clap::ArgGroup::new("target").required(true))]
struct VerifyArgs {
    /// 透かしID（WMK-コードやファイル名の貼り付けも可）
    #[arg(long, group = "target")]
    id: Option<String>,
    /// 検証するファイルのパス
    #[arg(long, group = "target")]
    file: Option<PathBuf>,
    /// 検証サービスのURL（未指定時はSNAPPY_API_URL、次いでデフォルト値）
    #[arg(long)]
    endpoint: Option<String>,
    /// 判定結果をJSONで出力する
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Verify(args) => run_verify(args).await,
    }
}

/// 検証を実行して結果を表示する。
async fn run_verify(args: VerifyArgs) -> anyhow::Result<()> {
    let endpoint = args
        .endpoint
        .or_else(|| std::env::var("SNAPPY_API_URL").ok())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    // clapのArgGroupでどちらか一方のみが保証されている
    let request = if let Some(id) = args.id {
        VerificationRequest::WatermarkId(id)
    } else {
        let path = args.file.expect("clap group guarantees one target");
        let bytes = std::fs::read(&path)
            .with_context(|| format!("ファイルを読み込めません: {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        VerificationRequest::FileContent { file_name, bytes }
    };

    tracing::info!(endpoint = %endpoint, "検証サービスに照会します");

    let client = VerifyClient::new(endpoint);
    // トランスポート障害は判定結果とは別のエラー経路。
    // ここで失敗した場合は「検証が完了しなかった」のであり、否定結果ではない
    let raw = client
        .verify(&request)
        .await
        .context("検証を完了できませんでした（サービスに到達できないか、サーバーエラー）")?;

    let result = classify(&raw);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        render(&result);
    }
    Ok(())
}

/// 判定結果を人間可読の形式で表示する。
fn render(result: &VerificationResult) {
    match result {
        VerificationResult::Authoritative(report) => {
            println!("Ownership verified.");
            if let Some(method) = &report.method {
                println!("  Method:     {method}");
            }
            render_score(report.confidence_label, &report.confidence);
            if report.tamper_suspected {
                println!("  Warning:    tampering suspected after watermarking");
            }
            if let Some(owner) = &report.owner {
                render_owner_line(owner.name.as_deref(), owner.email.as_deref());
            }
            if let Some(meta) = &report.metadata {
                render_metadata(&meta.title, &meta.author, &meta.organization, &meta.created_date);
            }
            if let Some(code) = &report.watermark_code {
                println!("  Watermark:  {code}");
            }
            if let Some(issued) = &report.issued_at {
                println!("  Issued:     {issued}");
            }
            if let Some(note) = &report.note {
                println!("  Note:       {note}");
            }
        }
        VerificationResult::PerceptualMatch(report) => {
            println!("Possible match (not authoritative).");
            render_score(report.confidence_label, &report.ownership_confidence);
            render_owner_line(report.owner.name.as_deref(), report.owner.email.as_deref());
            if let Some(meta) = &report.metadata {
                render_metadata(&meta.title, &meta.author, &meta.organization, &meta.created_date);
            }
            if let Some(note) = &report.note {
                println!("  Note:       {note}");
            }
        }
        VerificationResult::AmbiguousCandidates(report) => {
            println!(
                "Ambiguous match: {} indistinguishable candidates.",
                report.candidates.len()
            );
            if let Some(strength) = &report.match_strength {
                render_score(report.strength_label, strength);
            }
            for (i, candidate) in report.candidates.iter().enumerate() {
                let code = candidate
                    .watermark_code
                    .as_deref()
                    .or(candidate.watermark_id.as_deref())
                    .unwrap_or("(unknown)");
                let score = candidate
                    .score
                    .map(|s| format!("{:.2} ({})", s.value, s.tier.label()))
                    .unwrap_or_else(|| "unavailable".to_string());
                println!("  {}. {code} — score: {score}", i + 1);
            }
            if let Some(note) = &report.note {
                println!("  Note:       {note}");
            }
        }
        VerificationResult::FailedWithFallback(report) => {
            println!("Verification failed — {}", report.reason);
            println!("A secondary similarity match was found (non-authoritative hint):");
            render_score("Perceptual Similarity", &report.similarity);
            if let Some(owner) = &report.owner {
                render_owner_line(owner.name.as_deref(), owner.email.as_deref());
            }
            if let Some(meta) = &report.metadata {
                render_metadata(&meta.title, &meta.author, &meta.organization, &meta.created_date);
            }
            if let Some(issued) = &report.issued_at {
                println!("  Issued:     {issued}");
            }
            if let Some(note) = &report.note {
                println!("  Note:       {note}");
            }
        }
        VerificationResult::Failed(report) => {
            println!("Verification failed — {}", report.reason);
            if let Some(note) = &report.note {
                println!("  Note:       {note}");
            }
        }
    }
}

/// ラベル付きスコア行を表示する。
fn render_score(label: &str, score: &ConfidenceScore) {
    let qualifier = if score.meaningful {
        String::new()
    } else {
        " [not meaningful]".to_string()
    };
    println!(
        "  {label}: {:.2} — {}{qualifier}",
        score.value,
        score.tier.label()
    );
}

/// 所有者の行を表示する。
fn render_owner_line(name: Option<&str>, email: Option<&str>) {
    match (name, email) {
        (Some(name), Some(email)) => println!("  Owner:      {name} <{email}>"),
        (Some(name), None) => println!("  Owner:      {name}"),
        (None, Some(email)) => println!("  Owner:      <{email}>"),
        (None, None) => {}
    }
}

/// メタデータの行を表示する。
/// organizationは三値: 欠落は表示しない、明示的空欄は"(blank)"と表示する。
fn render_metadata(
    title: &Option<String>,
    author: &Option<String>,
    organization: &Organization,
    created_date: &Option<String>,
) {
    if let Some(title) = title {
        println!("  Title:      {title}");
    }
    if let Some(author) = author {
        println!("  Author:     {author}");
    }
    match organization {
        Organization::Absent => {}
        Organization::Blank => println!("  Org:        (blank)"),
        Organization::Named(name) => println!("  Org:        {name}"),
    }
    if let Some(date) = created_date {
        println!("  Created:    {date}");
    }
}
