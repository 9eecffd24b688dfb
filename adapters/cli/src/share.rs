#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use fieldmarch_core::Coordinate;
use fieldmarch_world::{Field, Surface};
use serde::{Deserialize, Serialize};

const SHARE_DOMAIN: &str = "field";
const SHARE_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded field payload.
pub(crate) const SHARE_HEADER: &str = "field:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableLayout {
    surfaces: Vec<String>,
}

/// Encodes a field's surfaces into a single-line string suitable for
/// clipboard transfer.
pub(crate) fn encode(field: &Field) -> String {
    let mut surfaces = Vec::with_capacity((field.width() * field.height()) as usize);
    for y in 0..field.height() {
        for x in 0..field.width() {
            let tile = field
                .at(Coordinate::new(x, y))
                .expect("encode iterates within bounds");
            surfaces.push(tile.surface().token().to_owned());
        }
    }
    let payload = SerializableLayout { surfaces };
    let json = serde_json::to_vec(&payload).expect("field layout serialization never fails");
    let encoded = STANDARD_NO_PAD.encode(json);
    format!(
        "{SHARE_HEADER}:{}x{}:{encoded}",
        field.width(),
        field.height()
    )
}

/// Decodes a field from the provided share string.
pub(crate) fn decode(value: &str) -> Result<Field, ShareError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ShareError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(ShareError::MissingPrefix)?;
    let version = parts.next().ok_or(ShareError::MissingVersion)?;
    let dimensions = parts.next().ok_or(ShareError::MissingDimensions)?;
    let payload = parts.next().ok_or(ShareError::MissingPayload)?;

    if domain != SHARE_DOMAIN {
        return Err(ShareError::InvalidPrefix(domain.to_owned()));
    }
    if version != SHARE_VERSION {
        return Err(ShareError::UnsupportedVersion(version.to_owned()));
    }

    let (width, height) = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(ShareError::InvalidEncoding)?;
    let decoded: SerializableLayout =
        serde_json::from_slice(&bytes).map_err(ShareError::InvalidPayload)?;

    let expected = (width as usize) * (height as usize);
    if decoded.surfaces.len() != expected {
        return Err(ShareError::WrongTileCount {
            expected,
            found: decoded.surfaces.len(),
        });
    }

    let mut field = Field::new(width, height);
    for (index, token) in decoded.surfaces.iter().enumerate() {
        let surface = Surface::from_token(token)
            .ok_or_else(|| ShareError::UnknownSurface(token.clone()))?;
        let x = (index % width as usize) as i32;
        let y = (index / width as usize) as i32;
        field.set_surface(Coordinate::new(x, y), surface);
    }
    Ok(field)
}

/// Errors that can occur while decoding field share strings.
#[derive(Debug)]
pub(crate) enum ShareError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded field.
    MissingPrefix,
    /// The encoded field did not contain a version segment.
    MissingVersion,
    /// The encoded field did not include grid dimensions.
    MissingDimensions,
    /// The encoded field did not include the payload segment.
    MissingPayload,
    /// The encoded field used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded field used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded field.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
    /// The payload named a surface this build does not know.
    UnknownSurface(String),
    /// The payload's tile count does not match the declared dimensions.
    WrongTileCount {
        /// Tile count implied by the declared dimensions.
        expected: usize,
        /// Tile count actually present in the payload.
        found: usize,
    },
}

impl fmt::Display for ShareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "share payload was empty"),
            Self::MissingPrefix => write!(f, "share string is missing the prefix"),
            Self::MissingVersion => write!(f, "share string is missing the version"),
            Self::MissingDimensions => write!(f, "share string is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "share string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "share prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "share version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode share payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse share payload: {error}")
            }
            Self::UnknownSurface(token) => {
                write!(f, "share payload names unknown surface '{token}'")
            }
            Self::WrongTileCount { expected, found } => {
                write!(f, "share payload holds {found} tiles, expected {expected}")
            }
        }
    }
}

impl Error for ShareError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(i32, i32), ShareError> {
    let (width, height) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| ShareError::InvalidDimensions(dimensions.to_owned()))?;

    let width = width
        .trim()
        .parse::<i32>()
        .map_err(|_| ShareError::InvalidDimensions(dimensions.to_owned()))?;
    let height = height
        .trim()
        .parse::<i32>()
        .map_err(|_| ShareError::InvalidDimensions(dimensions.to_owned()))?;

    if width <= 0 || height <= 0 {
        return Err(ShareError::InvalidDimensions(dimensions.to_owned()));
    }

    Ok((width, height))
}
