//! Judge profile lookups through the multi-tier cache.

use anyhow::Result;

#[cfg(feature = "mock")]
#[tokio::main]
async fn main() -> Result<()> {
    use docket::keys::namespace;
    use docket::{CacheContext, MemoryStore, SetOptions, judge_tag};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct JudgeProfile {
        id: u32,
        name: String,
        court: String,
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let context = CacheContext::with_store(MemoryStore::new());
    let judges = context.tiered::<JudgeProfile>(namespace::JUDGES);

    let load = |id: u32| async move {
        tracing::info!(id, "Loading profile from the database");
        Ok::<_, anyhow::Error>(JudgeProfile {
            id,
            name: format!("Judge #{id}"),
            court: "ca9".to_string(),
        })
    };

    for round in 0..3 {
        let outcome = judges
            .get_or_compute_swr(
                "42",
                move || load(42),
                SetOptions::profile().tag(judge_tag(42)),
            )
            .await?;
        println!(
            "round {round}: {} from {} (stale: {})",
            outcome.data.name, outcome.tier, outcome.was_stale
        );
    }

    let removed = judges.invalidate_by_tag(&judge_tag(42)).await;
    println!("invalidated {removed} entr(ies) tagged judge:42");

    judges.log_stats();
    let rates = judges.hit_rate();
    println!(
        "hit rates: tier1 {:.2}, tier2 {:.2}, overall {:.2}",
        rates.tier1, rates.tier2, rates.overall
    );

    Ok(())
}

#[cfg(not(feature = "mock"))]
fn main() {
    eprintln!("Run with: cargo run --example profile_lookup --features mock");
}
