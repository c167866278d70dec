/*!
Codec flags shared by the subcommands
*/

use cbor_tags::{Options, config};

#[derive(clap::Args, Debug)]
pub struct DecodeArgs {
    /// Maximum nesting of arrays, maps and tags
    #[arg(long, value_name = "DEPTH", default_value_t = config::DEFAULT_MAX_NESTING_DEPTH)]
    max_depth: usize,

    /// Maximum number of data items in one decoded item
    #[arg(long, value_name = "COUNT", default_value_t = config::DEFAULT_MAX_ITEM_COUNT)]
    max_items: usize,

    /// Reject input that is not in canonical form
    #[arg(long)]
    strict: bool,
}

impl DecodeArgs {
    pub fn options(&self) -> Options {
        Options::default()
            .with_max_nesting_depth(self.max_depth)
            .with_max_item_count(self.max_items)
            .with_strict_canonical_decode(self.strict)
    }
}
