//! Text side of the pipeline: subtitle extraction and token normalization.

pub mod normalize;
pub mod subtitles;

pub use normalize::{bigrams, flatten_tokens, normalize_line, normalize_lines, token_counts, TokenCounts};
pub use subtitles::{decode_subtitle_bytes, read_subtitle_lines, subtitle_lines};
