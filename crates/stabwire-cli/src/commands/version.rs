//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - remote stabilizer simulation",
        style("stabwire").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  stabwire-circuit  chpext circuit language");
    println!("  stabwire-proto    NUL-framed JSON wire protocol");
    println!("  stabwire-client   Sessions and protocols");
    println!("  stabwire-server   CHP tableau server");
    println!("  stabwire-cli      Command-line interface");
    println!();
    println!("License: {}", style("Apache-2.0").dim());
}
