//! Teleportation command.

use anyhow::Result;
use console::style;

use stabwire_client::{TeleportReport, protocols};

use super::common::{connect, finish};
use crate::Target;

/// Execute the teleport command.
pub async fn execute(target: &Target, bit: Option<u8>) -> Result<()> {
    let payloads: Vec<bool> = match bit {
        Some(b) => vec![b == 1],
        None => vec![false, true],
    };

    let (mut session, config) = connect(target).await?;
    let outcome: Result<Vec<TeleportReport>> = async {
        let mut reports = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            reports.push(protocols::teleport(&mut session, &config.kind, *payload).await?);
        }
        Ok(reports)
    }
    .await;
    let reports = finish(session, outcome).await?;

    for report in &reports {
        println!(
            "{} Teleporting {}",
            style("→").cyan().bold(),
            style(u8::from(report.payload)).green()
        );
        println!("  Bell outcomes: {}", report.bell);
        println!("  Corrections:   {}", report.corrections);
        println!("  Received:      {}", u8::from(report.received));
        if !report.succeeded() {
            anyhow::bail!(
                "teleported {} but received {}",
                u8::from(report.payload),
                u8::from(report.received)
            );
        }
    }
    println!("  {}", style("✓ teleportation succeeded").green());
    Ok(())
}
