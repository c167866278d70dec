/*!
Inspect command - display CBOR data in various formats
*/

use super::args::DecodeArgs;
use super::io::{Input, Output};
use base64::prelude::*;
use cbor_tags::{Item, Options};
use clap::Parser;
use std::fmt::Write;
use tracing::{debug, trace};

#[derive(Parser, Debug)]
#[command(about = "Inspect and display CBOR information", long_about = None)]
pub struct Command {
    /// Output format
    #[arg(
        long,
        default_value = "diag",
        value_name = "FORMAT",
        help = "Output format: diag/diagnostic (human-readable, lossless), json (lossy), hex"
    )]
    format: OutputFormat,

    /// Show byte strings that hold a complete CBOR item as `<<item>>`
    #[arg(short = 'e', long = "decode-embedded")]
    decode_embedded: bool,

    /// Treat the input as a CBOR sequence (RFC 8742) of zero or more items
    #[arg(short = 's', long)]
    sequence: bool,

    #[command(flatten)]
    decode: DecodeArgs,

    /// Output file (default: stdout)
    #[arg(short = 'o', long)]
    output: Option<Output>,

    /// Input CBOR file (use '-' for stdin)
    input: Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    /// CBOR Diagnostic Notation
    #[value(alias = "diagnostic")]
    Diag,
    /// JSON, dropping tags and CBOR-only types
    Json,
    /// Hexadecimal dump
    Hex,
}

impl Command {
    pub fn exec(self) -> anyhow::Result<()> {
        let data = self.input.read()?;

        let text = if self.format == OutputFormat::Hex {
            hex::encode(&data)
        } else {
            let items = decode_items(&data, &self.decode.options(), self.sequence)?;
            match self.format {
                OutputFormat::Json => {
                    let mut values = items.iter().map(to_json).collect::<Vec<_>>();
                    let value = match (self.sequence, values.pop()) {
                        (false, Some(value)) => value,
                        (_, last) => {
                            values.extend(last);
                            serde_json::Value::Array(values)
                        }
                    };
                    serde_json::to_string_pretty(&value)?
                }
                _ => {
                    let mut text = String::new();
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            text.push_str(", ");
                        }
                        write_diag(&mut text, item, self.decode_embedded)?;
                    }
                    text
                }
            }
        };

        self.output.unwrap_or_default().write_text(&text)
    }
}

fn decode_items(data: &[u8], options: &Options, sequence: bool) -> anyhow::Result<Vec<Item>> {
    if !sequence {
        return Ok(vec![cbor_tags::decode_any_with(data, options)?]);
    }

    let mut items = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let (item, len) = cbor_tags::decode_prefix::<Item>(&data[offset..], options)
            .map_err(|e| anyhow::anyhow!("Item {} at offset {offset}: {e}", items.len()))?;
        trace!(offset, len, "Decoded sequence item");
        items.push(item);
        offset += len;
    }
    debug!(count = items.len(), "Decoded CBOR sequence");
    Ok(items)
}

/// Diagnostic notation, optionally showing embedded CBOR as `<<...>>`
fn write_diag(out: &mut String, item: &Item, embedded: bool) -> std::fmt::Result {
    if !embedded {
        return write!(out, "{item}");
    }
    match item {
        Item::Bytes(b) => match cbor_tags::decode_any(b) {
            Ok(inner) => {
                out.push_str("<<");
                write_diag(out, &inner, embedded)?;
                out.push_str(">>");
                Ok(())
            }
            Err(_) => write!(out, "{item}"),
        },
        Item::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_diag(out, item, embedded)?;
            }
            out.push(']');
            Ok(())
        }
        Item::Map(pairs) => {
            out.push('{');
            for (i, (k, v)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_diag(out, k, embedded)?;
                out.push_str(": ");
                write_diag(out, v, embedded)?;
            }
            out.push('}');
            Ok(())
        }
        Item::Tagged(tag, inner) => {
            write!(out, "{tag}(")?;
            write_diag(out, inner, embedded)?;
            out.push(')');
            Ok(())
        }
        item => write!(out, "{item}"),
    }
}

/// JSON for an item; tags are dropped and byte strings become base64url
fn to_json(item: &Item) -> serde_json::Value {
    use serde_json::Value as J;

    match item {
        Item::Unsigned(n) => J::from(*n),
        Item::Negative(_) => match item.as_integer().map(i64::try_from) {
            Some(Ok(n)) => J::from(n),
            _ => J::String(item.to_string()),
        },
        Item::Bytes(b) => J::String(BASE64_URL_SAFE_NO_PAD.encode(b)),
        Item::Text(s) => J::String(s.clone()),
        Item::Array(items) => J::Array(items.iter().map(to_json).collect()),
        Item::Map(pairs) => J::Object(
            pairs
                .iter()
                .map(|(k, v)| {
                    let key = match k {
                        Item::Text(s) => s.clone(),
                        k => k.to_string(),
                    };
                    (key, to_json(v))
                })
                .collect(),
        ),
        Item::Tagged(_, inner) => to_json(inner),
        Item::Bool(b) => J::Bool(*b),
        Item::Float(f) => serde_json::Number::from_f64(*f).map_or(J::Null, J::Number),
        Item::Null | Item::Undefined | Item::Simple(_) => J::Null,
    }
}
