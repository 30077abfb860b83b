//! Library and application errors

use miette::Diagnostic;
use thiserror::Error;

/// All possible errors returned by hifirip
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum Error {
    #[error("Firmware image is truncated: need {needed:#x} bytes, found {actual:#x}")]
    #[diagnostic(
        code(hifirip::short_firmware),
        help("HiFiEC images carry partition descriptors at 0x80 and 0x14C; anything shorter than 0x15C bytes cannot be a valid image")
    )]
    ShortFirmware { needed: usize, actual: usize },

    #[error("No resource table found in the resource partition")]
    #[diagnostic(
        code(hifirip::table_not_found),
        help("The ROCK26IMAGERES header is missing, or no metadata entry matches its first offset. The image may be encrypted or from an unsupported product line.")
    )]
    TableNotFound,

    #[error("Font table detection confidence too low: SMALL {small}/3, LARGE {large}/3 sample cells valid")]
    #[diagnostic(
        code(hifirip::locator_low_confidence),
        help("At least 2 of 3 sample cells must decode for each table. Refusing to extract from addresses that are probably wrong.")
    )]
    LocatorLowConfidence { small: u8, large: u8 },

    #[error("Invalid bitmap dimensions: {width}x{height}")]
    #[diagnostic(code(hifirip::invalid_dimensions))]
    InvalidDimensions { width: i32, height: i32 },

    #[error(transparent)]
    #[diagnostic(code(hifirip::io_error))]
    IoError(#[from] std::io::Error),
}
