//! Interactive menu mode: pick rankings and a count from a numbered menu.

use std::io::{self, Write};

use anyhow::Result;
use kaburank_lib::RankingType;

const DEFAULT_COUNT: usize = 50;

/// Runs the menu. Returns the rankings to fetch and the count, or `None`
/// when the user quits or selects nothing valid.
pub fn select() -> Result<Option<(Vec<RankingType>, usize)>> {
    show_menu();
    let input = prompt(
        "取得するランキングを選択してください（複数選択可: 123 または 1,2,3 または 0 で全て） [0]: ",
    )?;
    let rankings = match parse_selection(&input) {
        Selection::Quit => return Ok(None),
        Selection::All => RankingType::ALL.to_vec(),
        Selection::Chosen(list) if list.is_empty() => return Ok(None),
        Selection::Chosen(list) => list,
    };

    println!("\n【選択されたランキング】");
    for ranking in &rankings {
        println!("  - {}", ranking.display_name());
    }

    // Re-prompt until the input parses; Enter alone takes the default.
    let count = loop {
        let raw = prompt(&format!(
            "\n取得する銘柄数を入力してください [{DEFAULT_COUNT}]: "
        ))?;
        match parse_count(&raw) {
            Some(count) => break count,
            None => println!("警告: '{}' は無効な入力です", raw.trim()),
        }
    };

    Ok(Some((rankings, count)))
}

fn show_menu() {
    println!("\n{}", "=".repeat(60));
    println!("  株式ランキング取得 → TradingViewウォッチリスト生成");
    println!("{}", "=".repeat(60));
    println!("\n【ランキング種類】");
    for (i, ranking) in RankingType::ALL.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, ranking.display_name(), ranking.key());
    }
    println!("  0. すべて取得");
    println!("  q. 終了");
    println!();
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

/// Parses the count prompt: empty input takes the default, a number is
/// accepted as-is, and anything else means ask again.
fn parse_count(input: &str) -> Option<usize> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(DEFAULT_COUNT);
    }
    trimmed.parse().ok()
}

#[derive(Debug, PartialEq)]
enum Selection {
    Quit,
    All,
    Chosen(Vec<RankingType>),
}

/// Parses a menu selection. `0` (or just Enter) selects everything and `q`
/// quits. Numbers are accepted comma-separated or as a bare digit run
/// (`123` means 1, 2, 3). Invalid entries are warned about and skipped;
/// duplicates collapse to the first mention.
fn parse_selection(input: &str) -> Selection {
    let cleaned = input.trim().replace(' ', "");
    if cleaned.eq_ignore_ascii_case("q") {
        return Selection::Quit;
    }
    if cleaned.is_empty() || cleaned == "0" {
        return Selection::All;
    }

    let parts: Vec<String> = if cleaned.contains(',') {
        cleaned.split(',').map(str::to_string).collect()
    } else {
        cleaned.chars().map(|c| c.to_string()).collect()
    };

    let mut chosen = Vec::new();
    for part in parts {
        let index = match part.parse::<usize>() {
            Ok(n) if (1..=RankingType::ALL.len()).contains(&n) => n - 1,
            _ => {
                println!("警告: '{part}' は無効な入力です（スキップ）");
                continue;
            }
        };
        let ranking = RankingType::ALL[index];
        if !chosen.contains(&ranking) {
            chosen.push(ranking);
        }
    }
    Selection::Chosen(chosen)
}
