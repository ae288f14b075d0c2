/// Limits applied to one interpreter session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Interpreted calls deeper than this fail with a stack overflow error.
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
        }
    }
}

impl Config {
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }
}
