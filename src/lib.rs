//! A deterministic, static binary-to-binary gas-metering transform for
//! WebAssembly MVP modules.
//!
//! Three independent pieces compose into the top-level [`meter_wasm`]
//! driver: [`decoder::decode`] parses a binary module into [`module::Module`],
//! [`metering::transform`] injects gas accounting, and [`encoder::encode`]
//! re-emits the result. Each stage is also exposed individually so callers
//! can inspect or rebuild a module without metering it.
//!
//! Grounded on `wrt-decoder/src/lib.rs`'s crate-doc and feature-gated
//! module layout, and `examples/original_source/metering.go`'s
//! `MeterWASM` for the driver's composition.

pub mod codes;
pub mod cost;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod leb128;
pub mod metering;
pub mod module;
pub mod tables;
pub mod text;

pub use error::{Error, ErrorCategory, Result};
pub use metering::{MeterType, Options};
pub use module::Module;

/// Decode, meter, and re-encode a WebAssembly MVP binary in one call
/// (spec.md §4.8). `options` defaults to [`Options::default`] when `None`.
pub fn meter_wasm(bytes: &[u8], options: Option<&Options>) -> Result<Vec<u8>> {
    let default_options;
    let options = match options {
        Some(o) => o,
        None => {
            default_options = Options::default();
            &default_options
        }
    };

    #[cfg(feature = "logging")]
    log::debug!("decoding {} bytes of wasm input", bytes.len());

    let mut module = decoder::decode(bytes)?;

    #[cfg(feature = "logging")]
    log::debug!("decoded {} sections, applying metering transform", module.sections.len());

    metering::transform(&mut module, options)?;
    let out = encoder::encode(&module)?;

    #[cfg(feature = "logging")]
    log::debug!("re-encoded {} bytes of metered wasm output", out.len());

    Ok(out)
}
