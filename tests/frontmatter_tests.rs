use cooklang_parser::{metadata::StdKey, CooklangParser, ParserError};
use indoc::indoc;

#[test]
fn invalid_yaml_frontmatter_is_an_error() {
    let input = indoc! {r#"
        ---
        title: Test Recipe
        tags: [test
        invalid yaml here
        ---

        @eggs{2} and @butter{1%tbsp}
    "#};

    let err = cooklang_parser::parse(input).unwrap_err();
    assert!(
        matches!(err, ParserError::InvalidFrontmatter { line: 2, .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn valid_yaml_frontmatter() {
    let input = indoc! {r#"
        ---
        title: Test Recipe
        tags: [test, recipe]
        prep_time: 10 min
        servings: 4, about
        ---

        This is a test recipe with valid YAML frontmatter.

        @eggs{2} and @butter{1%tbsp}
    "#};

    let recipe = cooklang_parser::parse(input).unwrap();
    assert_eq!(recipe.metadata.title(), Some("Test Recipe"));
    assert_eq!(recipe.metadata.tags().unwrap(), vec!["test", "recipe"]);
    assert_eq!(
        recipe.metadata.get("prep_time").and_then(|v| v.as_str()),
        Some("10 min")
    );
    assert_eq!(recipe.servings, Some(4.0));
    assert_eq!(recipe.ingredients.len(), 2);
}

#[test]
fn multiline_values() {
    let input = indoc! {r#"
        ---
        description: |
          A long description
          in two lines
        author:
          - Jane
        ---
        @eggs{2}
    "#};
    let recipe = cooklang_parser::parse(input).unwrap();
    assert_eq!(
        recipe.metadata.description(),
        Some("A long description\nin two lines\n")
    );
}

#[test]
fn frontmatter_and_old_style_entries() {
    let input = indoc! {r#"
        ---
        title: Bread
        ---
        >> source: grandma
        Bake @flour{500%g}.
    "#};
    let recipe = cooklang_parser::parse(input).unwrap();
    assert_eq!(recipe.metadata.title(), Some("Bread"));
    assert_eq!(
        recipe.metadata.get(StdKey::Source).and_then(|v| v.as_str()),
        Some("grandma")
    );
}

#[test]
fn errors_keep_source_lines() {
    let input = indoc! {r#"
        ---
        title: Lines
        ---

        @eggs{2}
        wait ~{10}
    "#};
    let err = cooklang_parser::parse(input).unwrap_err();
    assert_eq!(err, ParserError::TimerMissingUnit { line: 6 });
    assert_eq!(err.line(), 6);
}

#[test]
fn parse_metadata_only() {
    let parser = CooklangParser::default();
    let metadata = parser
        .parse_metadata(indoc! {r#"
            ---
            title: Only metadata
            ---
            >> servings: 3
            Steps with errors ~{10} are skipped.
        "#})
        .unwrap();
    assert_eq!(metadata.title(), Some("Only metadata"));
    assert_eq!(metadata.servings(), Some(3.0));
}
