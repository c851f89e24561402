//! Run command implementation.

use anyhow::{Context, Result};
use console::style;

use stabwire_client::Outcomes;

use super::common::{connect, finish, load_circuit, styled_bits};
use crate::Target;

/// Execute the run command.
pub async fn execute(target: &Target, input: &str, state_init: Option<&str>) -> Result<()> {
    println!(
        "{} Running {}",
        style("→").cyan().bold(),
        style(input).green()
    );

    let circuit = load_circuit(input)?;
    let init = state_init.map(load_circuit).transpose()?;
    println!(
        "  Loaded: {} instructions, {} measurements",
        circuit.len(),
        circuit.measurement_count()
    );

    let (mut session, config) = connect(target).await?;
    let outcome: Result<Outcomes> = async {
        let system = session.create_system(&config.kind).await?;
        let bits = match &init {
            Some(init) => {
                let state = session
                    .create_state(&system, init)
                    .await
                    .context("Failed to prepare state")?;
                session.measure_state(&system, &state, &circuit).await?
            }
            None => session.compute_result(&system, &circuit).await?,
        };
        Ok(bits)
    }
    .await;
    let bits = finish(session, outcome).await?;

    println!("  Result: {}", styled_bits(&bits.to_string()));
    Ok(())
}
