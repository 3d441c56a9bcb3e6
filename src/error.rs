//! Error type that joins the errors of every part of the crate

use thiserror::Error;

use crate::{
    convert::{ConvertError, ConverterBuilderError},
    parser::ParserError,
    quantity::QuantityAddError,
    scale::ScaleError,
};

/// Any error of the crate
///
/// Each operation returns its own error type, this is for callers that mix
/// them and want to use `?`.
#[derive(Debug, Error)]
pub enum CooklangError {
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Quantity(#[from] QuantityAddError),
    #[error(transparent)]
    Scale(#[from] ScaleError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Units(#[from] ConverterBuilderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale_twice(input: &str) -> Result<usize, CooklangError> {
        let recipe = crate::parse(input)?;
        let recipe = recipe.scale_to(2.0, &crate::Converter::empty())?;
        Ok(recipe.ingredients.len())
    }

    #[test]
    fn question_mark_mixes_errors() {
        assert!(matches!(
            scale_twice("@&egg"),
            Err(CooklangError::Parser(ParserError::ReferenceNotFound { .. }))
        ));
        assert!(matches!(
            scale_twice("@egg{1}"),
            Err(CooklangError::Scale(ScaleError::MissingServings))
        ));
        assert_eq!(scale_twice(">> servings: 1\n@egg{1}").unwrap(), 1);
    }
}
