//! Parallel batch parsing
//!
//! Parses many independent documents at once. Every document gets its own
//! lexer and decoder, so nothing is shared between workers.
//!
//! # Feature Flag
//!
//! Work is spread over rayon's pool when the `parallel` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! delimit = { version = "0.1", features = ["parallel"] }
//! ```
//!
//! Without it the same functions run sequentially.
//!
//! # Example
//!
//! ```rust
//! use delimit::engine::{parse_batch_parallel, ParseOptions};
//!
//! let inputs = ["a\n1\n", "a\n2\n3\n"];
//! let results = parse_batch_parallel(&inputs, &ParseOptions::default());
//!
//! // Results are in the same order as inputs
//! assert_eq!(results[0].as_ref().unwrap().rows.len(), 1);
//! assert_eq!(results[1].as_ref().unwrap().rows.len(), 2);
//! ```

use super::error::Error;
use super::meta::ParseOutput;
use super::options::ParseOptions;
use super::parse::parse;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Parse multiple inputs in parallel
///
/// # Returns
/// One result per input, in input order
#[cfg(feature = "rayon")]
pub fn parse_batch_parallel(
    inputs: &[&str],
    options: &ParseOptions,
) -> Vec<Result<ParseOutput, Error>> {
    inputs.par_iter().map(|input| parse(input, options)).collect()
}

/// Parse multiple inputs sequentially (fallback when rayon is not available)
#[cfg(not(feature = "rayon"))]
pub fn parse_batch_parallel(
    inputs: &[&str],
    options: &ParseOptions,
) -> Vec<Result<ParseOutput, Error>> {
    inputs.iter().map(|input| parse(input, options)).collect()
}

/// Parse multiple owned inputs in parallel
#[cfg(feature = "rayon")]
pub fn parse_batch_parallel_owned(
    inputs: Vec<String>,
    options: &ParseOptions,
) -> Vec<Result<ParseOutput, Error>> {
    inputs
        .into_par_iter()
        .map(|input| parse(&input, options))
        .collect()
}

/// Parse multiple owned inputs sequentially (fallback)
#[cfg(not(feature = "rayon"))]
pub fn parse_batch_parallel_owned(
    inputs: Vec<String>,
    options: &ParseOptions,
) -> Vec<Result<ParseOutput, Error>> {
    inputs
        .into_iter()
        .map(|input| parse(&input, options))
        .collect()
}

/// Configuration for parallel parsing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    /// Number of threads to use (None = rayon's global pool)
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of threads to use
    pub fn with_num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Parse `inputs` on a pool sized by this configuration
    ///
    /// Falls back to the global pool when a dedicated one cannot be built.
    #[cfg(feature = "rayon")]
    pub fn parse_batch(
        &self,
        inputs: &[&str],
        options: &ParseOptions,
    ) -> Vec<Result<ParseOutput, Error>> {
        let pool = self.num_threads.and_then(|n| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .ok()
        });
        match pool {
            Some(pool) => pool.install(|| parse_batch_parallel(inputs, options)),
            None => parse_batch_parallel(inputs, options),
        }
    }

    /// Parse `inputs` sequentially (fallback when rayon is not available)
    #[cfg(not(feature = "rayon"))]
    pub fn parse_batch(
        &self,
        inputs: &[&str],
        options: &ParseOptions,
    ) -> Vec<Result<ParseOutput, Error>> {
        parse_batch_parallel(inputs, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::options::OnError;

    #[test]
    fn test_parse_batch() {
        let inputs = vec!["a\n1\n", "a\n1\n2\n", "a\n"];
        let results = parse_batch_parallel(&inputs, &ParseOptions::default());

        assert_eq!(results.len(), 3);
        let counts: Vec<usize> = results
            .iter()
            .map(|r| r.as_ref().unwrap().rows.len())
            .collect();
        assert_eq!(counts, [1, 2, 0]);
    }

    #[test]
    fn test_parse_batch_with_failures() {
        let options = ParseOptions::default().with_on_error(OnError::Throw);
        let inputs = vec!["a\n1\n", "a,b\n1\n", "a\n1\n"];
        let results = parse_batch_parallel(&inputs, &options);

        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_parse_batch_owned() {
        let inputs = vec!["x\n1\n".to_string(), "x\n2\n".to_string()];
        let results = parse_batch_parallel_owned(inputs, &ParseOptions::default());
        let second = results[1].as_ref().unwrap();
        assert_eq!(second.rows[0].get("x").unwrap().as_str(), Some("2"));
    }

    #[test]
    fn test_parallel_config_builder() {
        let config = ParallelConfig::new().with_num_threads(2);
        assert_eq!(config.num_threads, Some(2));
        let results = config.parse_batch(&["a\n1\n"], &ParseOptions::default());
        assert_eq!(results.len(), 1);
    }
}
