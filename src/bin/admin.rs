//! CLI administration tool for safelink.
//!
//! Inspects short URLs and clicks and performs database maintenance without
//! going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Show a short URL with its safety state and click count
//! cargo run --bin admin -- url info f684a3c4
//!
//! # List targets still waiting for classification
//! cargo run --bin admin -- url pending --limit 50
//!
//! # Clear a verdict so the target is classified again
//! cargo run --bin admin -- url revalidate f684a3c4
//!
//! # Browser / platform totals of a short URL
//! cargo run --bin admin -- clicks stats f684a3c4
//!
//! # Delete the recorded clicks of a short URL
//! cargo run --bin admin -- clicks purge f684a3c4
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string

use safelink::domain::entities::{ClickCount, SafetyStatus, ShortUrl};
use safelink::domain::repositories::{ClickRepository, ShortUrlRepository};
use safelink::infrastructure::persistence::{PgClickRepository, PgShortUrlRepository};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing safelink.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Inspect and manage short URLs
    Url {
        #[command(subcommand)]
        action: UrlAction,
    },

    /// Inspect and manage recorded clicks
    Clicks {
        #[command(subcommand)]
        action: ClicksAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum UrlAction {
    /// Show a short URL
    Info {
        /// Short URL hash
        hash: String,
    },

    /// List short URLs waiting for a safe-browsing verdict
    Pending {
        /// Maximum number of rows
        #[arg(short, long, default_value_t = 25)]
        limit: i64,
    },

    /// Clear the verdict of a target so the server classifies it again
    Revalidate {
        /// Short URL hash
        hash: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ClicksAction {
    /// Show click totals by browser and platform
    Stats {
        /// Short URL hash
        hash: String,
    },

    /// Delete every click recorded for a short URL
    Purge {
        /// Short URL hash
        hash: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info and row counts
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Url { action } => handle_url_action(action, &pool).await?,
        Commands::Clicks { action } => handle_clicks_action(action, &pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Dispatches short URL commands.
async fn handle_url_action(action: UrlAction, pool: &PgPool) -> Result<()> {
    let pool = Arc::new(pool.clone());
    let short_urls = PgShortUrlRepository::new(pool.clone());

    match action {
        UrlAction::Info { hash } => {
            let clicks = PgClickRepository::new(pool.clone());
            show_url(&short_urls, &clicks, &hash).await?;
        }
        UrlAction::Pending { limit } => list_pending(&short_urls, limit).await?,
        UrlAction::Revalidate { hash, yes } => {
            revalidate(&short_urls, pool.as_ref(), &hash, yes).await?
        }
    }

    Ok(())
}

async fn find_short_url(repo: &PgShortUrlRepository, hash: &str) -> Result<ShortUrl> {
    repo.find_by_hash(hash)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
        .context("Short URL not found")
}

fn safety_label(status: SafetyStatus) -> ColoredString {
    match status {
        SafetyStatus::Pending => "PENDING".yellow(),
        SafetyStatus::Safe => "SAFE".green(),
        SafetyStatus::Unsafe => "UNSAFE".red(),
    }
}

async fn show_url(
    short_urls: &PgShortUrlRepository,
    clicks: &PgClickRepository,
    hash: &str,
) -> Result<()> {
    let short_url = find_short_url(short_urls, hash).await?;
    let total_clicks = clicks
        .count_by_hash(hash)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;

    println!("{}", "🔗 Short URL".bright_blue().bold());
    println!();
    println!("  Hash:     {}", short_url.hash.cyan());
    println!("  Target:   {}", short_url.redirection.target.bright_white());
    println!("  Mode:     {}", short_url.redirection.mode);
    println!(
        "  Created:  {}",
        short_url
            .created
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .bright_black()
    );
    println!("  Safety:   {}", safety_label(short_url.safety()));
    println!(
        "  QR code:  {}",
        if short_url.has_qr() {
            "rendered".green()
        } else {
            "none".bright_black()
        }
    );
    if let Some(sponsor) = &short_url.properties.sponsor {
        println!("  Sponsor:  {}", sponsor);
    }
    if let Some(ip) = &short_url.properties.ip {
        println!("  From IP:  {}", ip.bright_black());
    }
    println!(
        "  Clicks:   {}",
        total_clicks.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Lists unclassified rows, oldest first.
///
/// # Output Format
///
/// ```text
/// ⏳ Pending short URLs
///
///   Hash      Created           Target
///   ────────────────────────────────────────────────────────────
///   f684a3c4  2024-01-15 10:30  https://example.com
/// ```
async fn list_pending(short_urls: &PgShortUrlRepository, limit: i64) -> Result<()> {
    println!("{}", "⏳ Pending short URLs".bright_blue().bold());
    println!();

    let pending = short_urls
        .find_pending(limit)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list pending URLs: {}", e))?;

    if pending.is_empty() {
        println!("{}", "  Nothing is waiting for classification".green());
        println!();
        return Ok(());
    }

    println!(
        "  {:<9} {:<17} {}",
        "Hash".bright_white().bold(),
        "Created".bright_white().bold(),
        "Target".bright_white().bold()
    );
    println!("  {}", "─".repeat(75).bright_black());

    for short_url in &pending {
        println!(
            "  {:<9} {:<17} {}",
            short_url.hash.cyan(),
            short_url
                .created
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bright_black(),
            short_url.redirection.target
        );
    }

    println!();
    println!(
        "  Shown: {}",
        pending.len().to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Resets `safe` to NULL for every row sharing the target of `hash`.
///
/// The rows are dispatched again when the server starts with
/// `REQUEUE_PENDING_ON_STARTUP` enabled.
async fn revalidate(
    short_urls: &PgShortUrlRepository,
    pool: &PgPool,
    hash: &str,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "🔄 Revalidate target".bright_blue().bold());
    println!();

    let short_url = find_short_url(short_urls, hash).await?;

    println!("  Target: {}", short_url.redirection.target.cyan());
    println!("  Safety: {}", safety_label(short_url.safety()));
    println!();

    if short_url.safety() == SafetyStatus::Pending {
        println!("{}", "⚠️  This target is already pending".yellow());
        return Ok(());
    }

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Clear the verdict of this target?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let result = sqlx::query("UPDATE short_urls SET safe = NULL WHERE target = $1")
        .bind(&short_url.redirection.target)
        .execute(pool)
        .await?;

    println!();
    println!(
        "{} {} row(s) are pending again",
        "✅".green(),
        result.rows_affected().to_string().bright_white().bold()
    );
    println!(
        "  They will be classified on the next server start ({}).",
        "REQUEUE_PENDING_ON_STARTUP".bright_cyan()
    );
    println!();

    Ok(())
}

/// Dispatches click commands.
async fn handle_clicks_action(action: ClicksAction, pool: &PgPool) -> Result<()> {
    match action {
        ClicksAction::Stats { hash } => {
            let clicks = PgClickRepository::new(Arc::new(pool.clone()));
            click_stats(&clicks, &hash).await?;
        }
        ClicksAction::Purge { hash, yes } => purge_clicks(pool, &hash, yes).await?,
    }

    Ok(())
}

fn print_counts(title: &str, counts: &[ClickCount]) {
    println!("  {}", title.bright_white().bold());
    if counts.is_empty() {
        println!("    {}", "none".bright_black());
    }
    for count in counts {
        println!(
            "    {:<30} {}",
            count.name.as_deref().unwrap_or("unknown").cyan(),
            count.clicks.to_string().bright_green()
        );
    }
}

async fn click_stats(clicks: &PgClickRepository, hash: &str) -> Result<()> {
    println!("{}", "📊 Click statistics".bright_blue().bold());
    println!();

    let total = clicks
        .count_by_hash(hash)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;
    let browsers = clicks
        .count_by_browser(hash)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;
    let platforms = clicks
        .count_by_platform(hash)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;

    println!("  Hash:   {}", hash.cyan());
    println!("  Total:  {}", total.to_string().bright_green().bold());
    println!();
    print_counts("Browsers", &browsers);
    println!();
    print_counts("Platforms", &platforms);
    println!();

    Ok(())
}

async fn purge_clicks(pool: &PgPool, hash: &str, skip_confirm: bool) -> Result<()> {
    println!("{}", "🗑️  Purge clicks".bright_blue().bold());
    println!();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks WHERE hash = $1")
        .bind(hash)
        .fetch_one(pool)
        .await?;

    if count == 0 {
        println!("{}", "  No clicks recorded for this hash".yellow());
        return Ok(());
    }

    println!("  Hash:   {}", hash.cyan());
    println!("  Clicks: {}", count.to_string().bright_white().bold());
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete these clicks?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let result = sqlx::query("DELETE FROM clicks WHERE hash = $1")
        .bind(hash)
        .execute(pool)
        .await?;

    println!();
    println!(
        "{} Deleted {} click(s)",
        "✅".green(),
        result.rows_affected().to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            let short_urls: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM short_urls")
                .fetch_one(pool)
                .await?;

            let pending: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM short_urls WHERE safe IS NULL")
                    .fetch_one(pool)
                    .await?;

            let unsafe_count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM short_urls WHERE safe = FALSE")
                    .fetch_one(pool)
                    .await?;

            let clicks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
            println!(
                "  Short URLs: {}",
                short_urls.to_string().bright_green().bold()
            );
            println!("  Pending:    {}", pending.to_string().yellow().bold());
            println!("  Unsafe:     {}", unsafe_count.to_string().red().bold());
            println!("  Clicks:     {}", clicks.to_string().bright_green().bold());
            println!();
        }
    }

    Ok(())
}
