pub mod cache {
    use std::time::Duration;

    pub const COMPILE_CACHE_NAME: &str = "regex-compile";

    pub const COMPILE_CACHE_SIZE: usize = 256;

    pub const COMPILE_TTL: Duration = Duration::from_secs(60);

    pub const TEST_CACHE_NAME: &str = "regex-test";

    pub const TEST_CACHE_SIZE: usize = 10_000;

    pub const TEST_TTL: Duration = Duration::from_secs(3_600);
}

pub mod regexes {

    pub const DEFAULT_TIMEOUT_MS: u64 = 1_000;

    /// Compiled-program size cap handed to `RegexBuilder::size_limit`.
    pub const SIZE_LIMIT: usize = 2 * (1 << 20);

    pub const DFA_SIZE_LIMIT: usize = 2 * (1 << 20);
}

pub mod extractor {

    /// How many leading description lines are scanned for a release name.
    pub const FILENAME_SCAN_LINES: usize = 5;
}

pub mod sentinel {

    pub const UNKNOWN: &str = "Unknown";
}
