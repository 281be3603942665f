use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use routine_check::api_connection::connection::ScoringApi;
use routine_check::cli::parse_args;
use routine_check::interaction_checker::{can_run, CheckState, InteractionChecker};
use routine_check::report_presenter::render_report;
use routine_check::routine_aggregator::additive_set_of;
use routine_check::routine_loader::load_routine;
use routine_check::what_if::restrict;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli_args = parse_args();
    println!("Loading routine from {}...", cli_args.routine_file);

    let aggregator = load_routine(Path::new(&cli_args.routine_file))?;

    println!("\nRoutine: {} item(s)", aggregator.len());
    for item in aggregator.list() {
        let marker = if item.enabled { "on " } else { "off" };
        println!(
            "  [{}] {} ({}): {}, {} additive(s), {} allergen(s), risk {}",
            marker,
            item.name.as_deref().unwrap_or("unnamed"),
            item.identity(),
            item.frequency,
            item.badge.additives_count,
            item.badge.allergens_count,
            item.badge.additive_risk.label(),
        );
    }

    let excluded: HashSet<String> = cli_args.excluded.iter().cloned().collect();
    let active_items = if excluded.is_empty() {
        aggregator.list().to_vec()
    } else {
        let kept = restrict(aggregator.list(), &excluded);
        println!(
            "\nWhat-if: leaving out {} of {} item(s).",
            aggregator.len() - kept.len(),
            aggregator.len()
        );
        kept
    };

    let additive_set = additive_set_of(&active_items);
    if additive_set.is_empty() {
        println!("\nNo recognizable additives in the routine.");
        return Ok(());
    }
    let listed: Vec<&str> = additive_set.iter().map(|code| code.as_str()).collect();
    println!("\nUnique additives ({}): {}", listed.len(), listed.join(", "));

    if cli_args.offline {
        return Ok(());
    }

    if !can_run(&additive_set) {
        println!("\nNeed at least two distinct additives before a check can run.");
        return Ok(());
    }

    let api = match cli_args.api_base {
        Some(base) => ScoringApi::new(base),
        None => ScoringApi::from_env(),
    };
    println!("\nChecking interactions against {}...", api.base_url());

    let checker = InteractionChecker::new(api);
    checker.run_check(&additive_set).await;

    match checker.state() {
        CheckState::Success(report) => {
            println!("\n{}", render_report(&report));
        }
        CheckState::Error(message) => {
            eprintln!("\nInteraction check failed: {}", message);
            return Err(anyhow::anyhow!("Interaction check failed: {}", message));
        }
        CheckState::Idle | CheckState::Loading => {
            println!("\nInteraction check did not produce a result.");
        }
    }

    Ok(())
}
