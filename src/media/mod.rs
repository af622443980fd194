pub mod decode;
pub mod export;

pub use decode::{decode, decode_data_url, encode_data_url, DecodedImage};
pub use export::{ExportArtifact, ExportScene, Exporter, Rasterizer};
