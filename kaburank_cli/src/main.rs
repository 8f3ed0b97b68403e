mod interactive;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use kaburank_lib::{RankingClient, RankingType, WatchlistExporter};

/// 株式ランキング取得 → TradingViewウォッチリスト生成ツール
#[derive(Parser)]
#[command(name = "kaburank")]
#[command(about = "株式ランキングを取得して TradingView ウォッチリストを生成する")]
struct Cli {
    /// ランキング種類（複数指定可能）
    #[arg(short, long = "ranking", value_name = "TYPE")]
    ranking: Vec<RankingType>,

    /// 取得する銘柄数
    #[arg(short, long, default_value_t = 50)]
    count: usize,

    /// 全ランキングを取得
    #[arg(short, long)]
    all: bool,

    /// 出力ディレクトリ
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// インタラクティブモードで起動
    #[arg(short, long)]
    interactive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kaburank_lib=info".parse().unwrap())
                .add_directive("kaburank_cli=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // No selection flags at all also drops into the menu.
    if cli.interactive || (cli.ranking.is_empty() && !cli.all) {
        let Some((rankings, count)) = interactive::select()? else {
            println!("終了します");
            return Ok(());
        };
        return run_rankings(&rankings, count, &cli.output).await;
    }

    let rankings: Vec<RankingType> = if cli.all {
        RankingType::ALL.to_vec()
    } else {
        cli.ranking.clone()
    };
    run_rankings(&rankings, cli.count, &cli.output).await
}

/// Processes the requested rankings serially. A failure on one ranking is
/// logged and the run continues with the next; nothing aborts the batch.
async fn run_rankings(rankings: &[RankingType], count: usize, output: &Path) -> Result<()> {
    let client = RankingClient::new()?;
    let exporter = WatchlistExporter::new(output);

    for ranking in rankings {
        println!("\n[{}] ランキングを取得中...", ranking.display_name());
        match client.fetch_ranking(*ranking, count).await {
            Ok(snapshot) if snapshot.codes.is_empty() => {
                println!("  → 銘柄が取得できませんでした");
            }
            Ok(snapshot) => {
                println!("  → {}件の銘柄を取得しました", snapshot.codes.len());
                match exporter.export(&snapshot.codes, *ranking, snapshot.updated_on) {
                    Ok(path) => println!("  → 出力: {}", path.display()),
                    Err(e) => {
                        tracing::error!(ranking = %ranking, error = %e, "export failed");
                        eprintln!("  → エラー: {e}");
                    }
                }
            }
            Err(e) => {
                tracing::error!(ranking = %ranking, error = %e, "fetch failed");
                eprintln!("  → エラー: {e}");
            }
        }
    }

    println!("\n完了しました");
    Ok(())
}
