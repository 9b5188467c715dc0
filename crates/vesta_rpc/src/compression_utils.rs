use std::io::{Read, Write};

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Gzips a JSON value and encodes it in base64, the form the gateway expects
/// class programs in.
pub fn compress_program(program: &serde_json::Value) -> Result<String, std::io::Error> {
    let serialized = serde_json::to_vec(program)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&serialized)?;
    Ok(base64::encode(encoder.finish()?))
}

/// Inverse of [`compress_program`].
pub fn decompress_program(base64_compressed_program: &str) -> Result<serde_json::Value, std::io::Error> {
    let compressed_data = base64::decode(base64_compressed_program)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    let mut decoder = GzDecoder::new(compressed_data.as_slice());
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(serde_json::from_slice(decompressed.as_slice())?)
}
