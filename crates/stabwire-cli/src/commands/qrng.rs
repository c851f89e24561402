//! Quantum random number command.

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use stabwire_client::{Outcomes, protocols};

use super::common::{connect, finish, styled_bits};
use crate::Target;

/// Execute the qrng command.
pub async fn execute(target: &Target, qubits: usize, runs: u32) -> Result<()> {
    println!(
        "{} Drawing {} random bits ({} run{})",
        style("→").cyan().bold(),
        style(qubits).green(),
        runs,
        if runs == 1 { "" } else { "s" }
    );

    let (mut session, config) = connect(target).await?;

    let progress = if runs > 1 {
        let bar = ProgressBar::new(u64::from(runs));
        bar.set_style(ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos}/{len} {msg}")?);
        Some(bar)
    } else {
        None
    };

    let outcome: Result<Vec<Outcomes>> = async {
        let mut draws = Vec::with_capacity(runs as usize);
        for _ in 0..runs {
            let bits = protocols::qrng(&mut session, &config.kind, qubits).await?;
            if let Some(bar) = &progress {
                bar.inc(1);
            }
            draws.push(bits);
        }
        Ok(draws)
    }
    .await;
    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }
    let draws = finish(session, outcome).await?;

    let (mut ones, mut total) = (0usize, 0usize);
    for bits in &draws {
        println!("  {}", styled_bits(&bits.to_string()));
        ones += bits.count_ones();
        total += bits.len();
    }
    if total > 0 {
        println!();
        println!(
            "  Ones: {}/{} ({:.3})",
            ones,
            total,
            ones as f64 / total as f64
        );
    }
    Ok(())
}
