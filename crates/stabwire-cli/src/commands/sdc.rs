//! Superdense coding command.

use anyhow::Result;
use console::style;

use stabwire_client::{TwoBits, protocols};

use super::common::{connect, finish, styled_bits};
use crate::Target;

/// Execute the sdc command.
pub async fn execute(target: &Target, message: u8) -> Result<()> {
    let message = TwoBits::try_from(message)?;
    println!(
        "{} Superdense coding of {}",
        style("→").cyan().bold(),
        style(message).green()
    );

    let (mut session, config) = connect(target).await?;
    let outcome = protocols::superdense(&mut session, &config.kind, message)
        .await
        .map_err(anyhow::Error::from);
    let decoded = finish(session, outcome).await?;

    println!("  Encoded with: {}", message.encoding_gate().mnemonic());
    println!("  Received:     {}", styled_bits(&decoded.to_string()));
    if decoded == message.to_outcomes() {
        println!("  {}", style("✓ message decoded").green());
        Ok(())
    } else {
        anyhow::bail!("decoded {decoded}, expected {message}")
    }
}
