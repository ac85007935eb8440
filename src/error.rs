//! Domain errors for locator decoding, module construction and analysis.
//!
//! A lockfile miss is not represented here: resolvers return an empty
//! revision and the dependency is carried forward unresolved.

use std::path::PathBuf;

use thiserror::Error;

use crate::pkg::PackageType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A string lacks the `fetcher+project$revision` shape.
    #[error("malformed locator: {input:?}")]
    MalformedLocator { input: String },

    #[error("unknown package type: {name:?}")]
    UnknownPackageType { name: String },

    /// Module options failed validation against the kind's schema.
    #[error("invalid options for {kind} module: {details}")]
    InvalidOptions { kind: PackageType, details: String },

    #[error("no analyzer available for {kind} modules")]
    AnalyzerUnavailable { kind: PackageType },

    /// The artifacts needed for full resolution are missing. Only ever
    /// reported as a warning.
    #[error("module {module} does not appear to be built (looked in {})", dir.display())]
    UnbuiltModule { module: String, dir: PathBuf },

    #[error("could not parse manifest {}: {details}", path.display())]
    ManifestParse { path: PathBuf, details: String },

    #[error("could not parse lockfile {}: {details}", path.display())]
    LockfileParse { path: PathBuf, details: String },

    #[error("could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not analyze {kind} module {module}")]
    AnalysisFailed {
        module: String,
        kind: PackageType,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Read a file to a string, attaching the path to any I/O failure.
pub fn read_to_string(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_failed_keeps_context() {
        let err = Error::AnalysisFailed {
            module: "App".to_string(),
            kind: PackageType::NuGet,
            source: Box::new(Error::ManifestParse {
                path: PathBuf::from("App.csproj"),
                details: "unexpected end of input".to_string(),
            }),
        };
        assert_eq!(err.to_string(), "could not analyze nuget module App");
        let cause = std::error::Error::source(&err).unwrap();
        assert!(cause.to_string().contains("App.csproj"));
    }

    #[test]
    fn test_malformed_locator_message() {
        let err = Error::MalformedLocator {
            input: "npm-lodash".to_string(),
        };
        assert_eq!(err.to_string(), "malformed locator: \"npm-lodash\"");
    }
}
