/// Identifier of a runnable conformance suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteId {
    Echo,
    Library,
}

impl SuiteId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::Library => "library",
        }
    }
}

/// Which suites a command asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSelection {
    pub echo: bool,
    pub library: bool,
}

impl TestSelection {
    pub fn echo_only() -> Self {
        Self {
            echo: true,
            library: false,
        }
    }

    pub fn library_only() -> Self {
        Self {
            echo: false,
            library: true,
        }
    }

    pub fn all() -> Self {
        Self {
            echo: true,
            library: true,
        }
    }

    /// Resolves to the ordered, de-duplicated list of suites to execute.
    /// The echo suite always runs before the library suite.
    pub fn resolve(self) -> Vec<SuiteId> {
        let mut suites = Vec::new();
        if self.echo {
            suites.push(SuiteId::Echo);
        }
        if self.library {
            suites.push(SuiteId::Library);
        }
        suites
    }
}

/// Aggregate result of a test run. Terminal; the caller maps it to the
/// process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestOutcome {
    pub failures: u32,
}
