/*!
`cbor` - a CLI for working with CBOR data

# Commands

- `inspect`: Display CBOR data as diagnostic notation, JSON or hex
- `compose`: Convert JSON or hex text to CBOR

# Examples

```bash
# Inspect a CBOR file as diagnostic notation
cbor inspect data.cbor

# Show byte strings that hold CBOR as embedded items
cbor inspect -e data.cbor

# Inspect a CBOR sequence (RFC 8742) as JSON
cbor inspect --sequence --format json records.cbor

# Convert JSON to CBOR
echo '{"name": "Alice", "age": 30}' | cbor compose -o data.cbor -

# Check and convert a hex dump
echo 'd9 03e8 a2 61 78 01 61 79 02' | cbor compose --format hex - | cbor inspect -
```
*/

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

mod args;
mod compose;
mod inspect;
mod io;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "A CLI tool for inspecting and composing CBOR data",
    long_about = "Decode CBOR (RFC 8949) into human-readable forms, and encode text formats as CBOR.\n\n\
                  Unknown tags are kept and shown, so inspecting never loses information."
)]
struct Cli {
    /// Log level: off, error, warn, info, debug or trace; RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect and display CBOR data in various formats
    Inspect(inspect::Command),

    /// Convert JSON or hex text to CBOR binary
    Compose(compose::Command),
}

fn init_logger(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(level > LevelFilter::INFO)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.log_level);

    match cli.command {
        Commands::Inspect(args) => args.exec(),
        Commands::Compose(args) => args.exec(),
    }
}
