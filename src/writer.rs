//! Indent-aware accumulator for emitted Ruby source.

/// Builds the output text line by line, tracking the current indentation
/// depth. Ruby convention is two spaces per level.
#[derive(Debug, Default)]
pub struct SourceWriter {
    out: String,
    depth: usize,
}

const INDENT: &str = "  ";

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at the current depth. Text containing embedded
    /// newlines is split and each line is indented individually.
    pub fn push(&mut self, line: impl AsRef<str>) {
        for part in line.as_ref().split('\n') {
            if part.is_empty() {
                self.out.push('\n');
                continue;
            }
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(part);
            self.out.push('\n');
        }
    }

    /// Append an empty line.
    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        debug_assert!(self.depth > 0, "unbalanced dedent");
        self.depth = self.depth.saturating_sub(1);
    }

    /// Finish the accumulated source, normalized to a single trailing
    /// newline.
    pub fn finish(mut self) -> String {
        self.out.truncate(self.out.trim_end().len());
        self.out.push('\n');
        self.out
    }
}
