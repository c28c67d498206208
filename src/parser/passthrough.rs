use super::ParseOutput;

/// Stores scripts and binary resources unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughParser;

impl PassthroughParser {
    /// Returns the input bytes and discovers nothing
    pub fn process(&self, content: &[u8]) -> ParseOutput {
        ParseOutput::unchanged(content)
    }
}
