//! Leading YAML block between `---` lines

#[derive(Debug, PartialEq)]
pub struct FrontMatterSplit<'i> {
    pub yaml_text: &'i str,
    /// 1-based line where the YAML starts
    pub yaml_line: usize,
    pub cooklang_text: &'i str,
    /// Number of lines before the recipe body
    pub cooklang_line_offset: usize,
}

const YAML_FENCE: &str = "---";

/// Splits the frontmatter from the recipe body
///
/// Only blank lines can be before the opening fence. Returns [`None`] when
/// there is no complete block.
pub fn parse_frontmatter(input: &str) -> Option<FrontMatterSplit> {
    let mut lines = lines_with_offset(input).enumerate();
    let (open_idx, yaml_start) = loop {
        let (idx, (line, offset)) = lines.next()?;
        if line.trim_end() == YAML_FENCE {
            break (idx, offset + line.len());
        }
        if !line.trim().is_empty() {
            return None;
        }
    };
    let (close_idx, yaml_end, cooklang_start) = lines.find_map(|(idx, (line, offset))| {
        (line.trim_end() == YAML_FENCE).then_some((idx, offset, offset + line.len()))
    })?;

    Some(FrontMatterSplit {
        yaml_text: &input[yaml_start..yaml_end],
        yaml_line: open_idx + 2,
        cooklang_text: &input[cooklang_start..],
        cooklang_line_offset: close_idx + 1,
    })
}

fn lines_with_offset(s: &str) -> impl Iterator<Item = (&str, usize)> {
    let mut offset = 0;
    s.split_inclusive('\n').map(move |l| {
        let l_offset = offset;
        offset += l.len();
        (l, l_offset)
    })
}
