/// Data layer: directory pairing, decoding, and per-sample assembly.
///
/// Architecture:
/// ```text
///  dir/*color* + dir/*depth*
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  list + pair, decode, channel split → [c, h, w] arrays
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ RgbdDataset │  transforms, output mode, depth → plane masks
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Sample   │  (color, depth) | field | (color ⊙ masks, masks, id)
///   └──────────┘
/// ```

pub mod dataset;
pub mod loader;
pub mod model;
