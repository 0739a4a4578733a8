//! prdash dashboard entry point.
//!
//! Loads the TOML configuration (`--config <path>` or `PRDASH_CONFIG`),
//! fetches every section from every provider and prints a summary.

use prdash_client::{ClientResult, Dashboard, DashConfig, SectionItems};
use prdash_core::WorkItem;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ClientResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("prdash=info,prdash_client=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = DashConfig::load()?;
    let dashboard = Dashboard::from_config(&config)?;

    for section in &config.sections {
        println!("== {} ==", section.title);
        for outcome in dashboard.fetch_section(section).await {
            match outcome.result {
                Ok(items) => {
                    println!(
                        "[{}] {} of {}",
                        outcome.display_name,
                        items.len(),
                        items.total_count()
                    );
                    print_items(&items);
                }
                Err(err) => println!("[{}] error: {}", outcome.display_name, err),
            }
        }
        println!();
    }
    Ok(())
}

fn print_items(items: &SectionItems) {
    match items {
        SectionItems::PullRequests(page) => page.items.iter().for_each(|pr| print_item(pr)),
        SectionItems::Issues(page) => page.items.iter().for_each(|issue| print_item(issue)),
    }
}

fn print_item(item: &impl WorkItem) {
    println!(
        "  {:<40} {}  {}",
        format!("{}#{}", item.repo_name_with_owner(), item.number()),
        item.updated_at().format("%Y-%m-%d"),
        item.title()
    );
}
