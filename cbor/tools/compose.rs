/*!
Compose command - convert text formats to CBOR
*/

use super::args::DecodeArgs;
use super::io::{Input, Output};
use cbor_tags::{Item, Options};
use clap::Parser;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum InputFormat {
    /// JSON (no tags, byte strings or undefined)
    Json,
    /// Hexadecimal CBOR
    Hex,
}

#[derive(Parser, Debug)]
#[command(
    about = "Convert text formats to CBOR binary",
    long_about = "Parse JSON or hex text and write CBOR binary.\n\n\
                  JSON integers become CBOR integers, other numbers become the shortest exact float.\n\
                  Hex input is written unchanged.\n\n\
                  Either way the CBOR is decoded before it is written, so --max-depth,\n\
                  --max-items and --strict apply to both formats."
)]
pub struct Command {
    /// Input format
    #[arg(
        long,
        default_value = "json",
        value_name = "FORMAT",
        help = "Input format: json, hex"
    )]
    format: InputFormat,

    #[command(flatten)]
    decode: DecodeArgs,

    /// Output file (default: stdout)
    #[arg(short = 'o', long)]
    output: Option<Output>,

    /// Input file (use '-' for stdin)
    input: Input,
}

impl Command {
    pub fn exec(self) -> anyhow::Result<()> {
        let text = self.input.read_text()?;
        let data = compose(&text, self.format, &self.decode.options())?;
        self.output.unwrap_or_default().write(&data)
    }
}

/// Convert `text` to CBOR, then check the result against the decode limits.
fn compose(text: &str, format: InputFormat, options: &Options) -> anyhow::Result<Vec<u8>> {
    let data = match format {
        InputFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(text)?;
            cbor_tags::to_vec(&from_json(value)?)
        }
        InputFormat::Hex => {
            let digits = text
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>();
            hex::decode(digits)?
        }
    };
    let item = cbor_tags::decode_any_with(&data, options)?;
    debug!("Composed {}", item.type_name());
    Ok(data)
}

fn from_json(value: serde_json::Value) -> anyhow::Result<Item> {
    use serde_json::Value as J;

    Ok(match value {
        J::Null => Item::Null,
        J::Bool(b) => Item::Bool(b),
        J::Number(n) => {
            if let Some(u) = n.as_u64() {
                Item::from(u)
            } else if let Some(i) = n.as_i64() {
                Item::from(i)
            } else if let Some(f) = n.as_f64() {
                Item::Float(f)
            } else {
                anyhow::bail!("Invalid JSON number: {n}")
            }
        }
        J::String(s) => Item::Text(s),
        J::Array(items) => Item::Array(
            items
                .into_iter()
                .map(from_json)
                .collect::<anyhow::Result<_>>()?,
        ),
        J::Object(obj) => Item::Map(
            obj.into_iter()
                .map(|(k, v)| Ok((Item::Text(k), from_json(v)?)))
                .collect::<anyhow::Result<_>>()?,
        ),
    })
}
