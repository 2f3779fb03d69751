//! Read and write settings.

/// Settings for loading a document.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Turn the first collected read-value error into a load failure.
    pub strict: bool,
}

impl ReadOptions {
    /// Lenient reading: damaged leaves are reported, not fatal.
    pub fn lenient() -> Self {
        Self { strict: false }
    }

    /// Strict reading: any damaged leaf fails the load.
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// Settings for serialising a document.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Spaces per nesting level. Zero writes everything on one line.
    pub indent: usize,
    /// Emit an `<?xml ...?>` declaration before the root.
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: 1,
            declaration: true,
        }
    }
}
