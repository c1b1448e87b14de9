// Colored terminal output for run plans and summaries.
//
// main.rs delegates all printing of run results here.

use colored::Colorize;

use super::truncate_chars;
use crate::pipeline::RunSummary;

/// Print the posts a run selected, in processing order.
pub fn display_selection(summary: &RunSummary) {
    if summary.selected.is_empty() {
        println!("Nothing to do.");
        return;
    }

    let title = if summary.dry_run {
        format!("=== Plan ({} posts, dry run) ===", summary.selected.len())
    } else {
        format!("=== Selected ({} posts) ===", summary.selected.len())
    };
    println!("\n{}", title.bold());

    println!(
        "  {:>4}  {:<30} {:<20}  {}",
        "#".dimmed(),
        "Author".dimmed(),
        "Created (UTC)".dimmed(),
        "Post".dimmed(),
    );
    println!("  {}", "-".repeat(78).dimmed());

    for (i, post) in summary.selected.iter().enumerate() {
        println!(
            "  {:>4}. @{:<29} {:<20}  {}",
            i + 1,
            truncate_chars(&post.author_handle, 28),
            post.created_at.format("%Y-%m-%d %H:%M:%S"),
            post.id.uri,
        );
    }
    println!();
}

/// Print the end-of-run counters.
pub fn display_summary(summary: &RunSummary) {
    println!(
        "  Fetched {} entries, {} passed the filter, {} not yet reposted",
        summary.fetched, summary.accepted, summary.fresh
    );

    if !summary.rejections.is_empty() {
        let parts: Vec<String> = summary
            .rejections
            .iter()
            .map(|(reason, count)| format!("{reason}: {count}"))
            .collect();
        println!("  {}", format!("Rejected — {}", parts.join(", ")).dimmed());
    }

    if summary.dry_run {
        println!("  {}", "Dry run: no reposts or likes were made.".yellow());
        return;
    }

    println!(
        "  {} {} reposts ({} liked)",
        "Done —".bold(),
        summary.reposted,
        summary.liked
    );
    if summary.reversed > 0 {
        println!("  Removed {} earlier reposts/likes", summary.reversed);
    }
    if summary.failed > 0 {
        println!("  {} {} reposts failed", "!".bright_red(), summary.failed);
    }
    if summary.reversal_failures > 0 {
        println!(
            "  {} {} earlier reposts/likes could not be removed",
            "~".yellow(),
            summary.reversal_failures
        );
    }
    if summary.skipped > 0 {
        println!("  {} skipped (author quota reached)", summary.skipped);
    }
}
