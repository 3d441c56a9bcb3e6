//! A [cooklang](https://cooklang.org/) parser with quantity arithmetic.
//!
//! Also includes:
//! - Unit conversion, with units that change between regions.
//! - Adding quantities and choosing the best unit to show them.
//! - Recipe scaling.
//!
//! # Basic usage
//! If you just want **to parse a single** `cooklang` file, see [`parse`].
//!
//! If you are going to parse more than one, or want to change the
//! configuration of the parser, construct a parser instance yourself.
//!
//! To construct a parser use [`CooklangParser::new`] or
//! [`CooklangParser::default`]. You can configure the [`Converter`] used to
//! convert and add units.
//!
//! ```rust
//! # use cooklang_parser::{CooklangParser, Converter};
//! // Create a parser
//! // (this is the default configuration)
//! let parser = CooklangParser::new(Converter::default());
//! ```
//!
//! Then use the parser:
//!
//! ```rust
//! # use cooklang_parser::CooklangParser;
//! # let parser = CooklangParser::default();
//! let recipe = parser.parse("This is an @example")?;
//! assert_eq!(recipe.ingredients.len(), 1);
//! assert_eq!(recipe.ingredients[0].name, "example");
//! # Ok::<(), cooklang_parser::parser::ParserError>(())
//! ```
//!
//! Recipes are plain values. [`Recipe::scale_by`], [`Recipe::scale_to`] and
//! [`Recipe::convert_to`] return new recipes.

#![warn(rustdoc::broken_intra_doc_links, clippy::doc_markdown)]

#[cfg(doc)]
pub mod _features {
    //! This lib has 1 feature, enabled by default:
    //! - `bundled_units`. Includes a units file with the most common units for
    //!   recipes in English. The default
    //!   [`Converter`](crate::convert::Converter) uses them if this feature is
    //!   enabled.
}

pub mod analysis;
pub mod convert;
pub mod error;
pub mod located;
pub mod metadata;
pub mod model;
pub mod parser;
pub mod quantity;
pub mod scale;

pub use convert::Converter;
pub use error::CooklangError;
pub use located::Located;
pub use metadata::Metadata;
pub use model::*;
pub use parser::{Modifiers, ParserError};
pub use quantity::{Number, Quantity, TotalQuantity, Value};

/// A cooklang parser
///
/// Instantiating this may take time if the units are loaded. So you may want
/// to create only one and reuse it.
///
/// The 2 main methods are [`CooklangParser::parse`] and
/// [`CooklangParser::parse_metadata`].
///
/// You can also skip using this struct and use [`parser::PullParser`] and
/// [`analysis::parse_events`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CooklangParser {
    converter: Converter,
}

impl CooklangParser {
    /// Creates a new parser.
    ///
    /// It is encouraged to reuse the parser and not rebuild it every time.
    pub fn new(converter: Converter) -> Self {
        Self { converter }
    }

    /// Get the parser inner converter
    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Parse a recipe
    #[tracing::instrument(level = "debug", name = "parse", skip_all, fields(len = input.len()))]
    pub fn parse(&self, input: &str) -> Result<Recipe, ParserError> {
        let parser = parser::PullParser::new(input);
        analysis::parse_events(parser, &self.converter)
    }

    /// Parse only the metadata of a recipe
    ///
    /// This is a bit faster than [`Self::parse`] if you only want the metadata
    #[tracing::instrument(level = "debug", name = "metadata", skip_all, fields(len = input.len()))]
    pub fn parse_metadata(&self, input: &str) -> Result<Metadata, ParserError> {
        let parser = parser::PullParser::new(input);
        analysis::parse_events(parser.into_meta_iter(), &self.converter).map(|r| r.metadata)
    }
}

/// Parse a recipe with a default [`CooklangParser`]. Avoid calling this in a loop.
///
/// **IMPORTANT:** If you are going to parse more than one recipe you may want
/// to only create one [`CooklangParser`] and reuse it.
pub fn parse(input: &str) -> Result<Recipe, ParserError> {
    CooklangParser::default().parse(input)
}
