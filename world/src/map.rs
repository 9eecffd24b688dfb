//! Plain-text field layout format.
//!
//! A layout is one line per row of tab-separated surface tokens, e.g.
//!
//! ```text
//! empty\tempty\trock
//! sand\tdune\tempty
//! ```
//!
//! Occupancy is never part of a layout; units are placed after parsing.

use fieldmarch_core::Coordinate;
use thiserror::Error;

use crate::{Field, Surface};

const TOKEN_SEPARATOR: char = '\t';

/// Reasons a textual field layout cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapError {
    /// The layout contained no rows at all.
    #[error("map layout is empty")]
    EmptyLayout,
    /// A row held a different number of tiles than the first row.
    #[error("row {row} holds {found} tiles, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// Tile count established by the first row.
        expected: usize,
        /// Tile count actually found.
        found: usize,
    },
    /// A tile token did not name a known surface.
    #[error("unknown surface token '{token}' at row {row}, column {column}")]
    UnknownSurface {
        /// Token that failed to resolve.
        token: String,
        /// Zero-based index of the offending row.
        row: usize,
        /// Zero-based index of the offending column.
        column: usize,
    },
}

/// Parses a tab-separated layout into a field.
pub fn parse(layout: &str) -> Result<Field, MapError> {
    let rows: Vec<&str> = layout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    if rows.is_empty() {
        return Err(MapError::EmptyLayout);
    }

    let expected = rows[0].split(TOKEN_SEPARATOR).count();
    let mut field = Field::new(expected as i32, rows.len() as i32);

    for (y, row) in rows.iter().enumerate() {
        let tokens: Vec<&str> = row.split(TOKEN_SEPARATOR).collect();
        if tokens.len() != expected {
            return Err(MapError::RaggedRow {
                row: y,
                expected,
                found: tokens.len(),
            });
        }
        for (x, token) in tokens.iter().enumerate() {
            let token = token.trim();
            let surface = Surface::from_token(token).ok_or_else(|| MapError::UnknownSurface {
                token: token.to_owned(),
                row: y,
                column: x,
            })?;
            field.set_surface(Coordinate::new(x as i32, y as i32), surface);
        }
    }

    Ok(field)
}

/// Serializes a field's surfaces back into the tab-separated layout form.
#[must_use]
pub fn dump(field: &Field) -> String {
    let mut layout = String::new();
    for y in 0..field.height() {
        for x in 0..field.width() {
            if x > 0 {
                layout.push(TOKEN_SEPARATOR);
            }
            let tile = field
                .at(Coordinate::new(x, y))
                .expect("dump iterates within bounds");
            layout.push_str(tile.surface().token());
        }
        layout.push('\n');
    }
    layout
}
