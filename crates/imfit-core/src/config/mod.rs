//! C7: textual configuration parsers (§6.1, §6.2, §6.3). Each parser
//! consumes a file's text and produces a validated, in-memory structure;
//! nothing downstream touches raw text again (§3.1).

pub mod build;
pub mod image_info;
pub mod model_config;
pub mod section;

pub use build::{build_function_set, build_function_sets};
pub use image_info::{ImageBlockSpec, ImageInfoFile};
pub use model_config::{FunctionSetSpec, FunctionSpec, ModelConfigFile, ParamLimit, ParamSpec};
pub use section::FilenameSection;

/// Strip a trailing `# comment` (the `#` and everything after it).
pub(crate) fn chop_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => line[..idx].trim_end(),
        None => line,
    }
}

/// Non-empty, non-comment, trimmed source lines paired with their original
/// (1-based) line number — the unit every parser in this module works over,
/// so reported error line numbers always refer to the real file.
pub(crate) fn numbered_lines(text: &str) -> Vec<(usize, String)> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let trimmed = chop_comment(raw).trim();
            if trimmed.is_empty() {
                None
            } else {
                Some((idx + 1, trimmed.to_string()))
            }
        })
        .collect()
}
