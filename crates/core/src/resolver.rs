use crate::config::ResolverTables;
use crate::index::{IndexError, PackageIndex};
use crate::models::{Classification, ModuleRef, ResolvedModule};
use tracing::{debug, warn};

/// Classifies module references as stdlib, local, installed or missing.
///
/// Versions come from the index this resolver was built with, which reflects
/// the environment the tool runs against, not necessarily the one the
/// scanned file was written for.
pub struct VersionResolver {
    tables: ResolverTables,
    index: Box<dyn PackageIndex>,
}

impl VersionResolver {
    pub fn new(tables: ResolverTables, index: Box<dyn PackageIndex>) -> Self {
        Self { tables, index }
    }

    /// Resolve every reference, in order. Never fails.
    pub fn resolve(&self, refs: &[ModuleRef]) -> Vec<ResolvedModule> {
        refs.iter().map(|r| self.resolve_one(r)).collect()
    }

    pub fn resolve_one(&self, reference: &ModuleRef) -> ResolvedModule {
        let package = self.tables.package_for(&reference.name).to_string();
        let classification = self.classify(reference, &package);

        debug!(
            module = %reference,
            package = %package,
            classification = ?classification,
            "Resolved module"
        );

        ResolvedModule {
            reference: reference.clone(),
            package,
            classification,
        }
    }

    fn classify(&self, reference: &ModuleRef, package: &str) -> Classification {
        // 1. Sibling .py file
        if reference.is_local_file() {
            return Classification::LocalFile;
        }

        // 2. Standard library, by import name or by mapped package name
        if self.tables.is_stdlib(&reference.name) || self.tables.is_stdlib(package) {
            return Classification::StandardLibrary;
        }

        // 3. Installed version
        match self.index.version(package) {
            Ok(version) => Classification::Resolved { version },
            Err(IndexError::PackageNotFound(_)) => Classification::Unresolved,
            Err(e) => {
                warn!(package = %package, error = %e, "Package lookup failed");
                Classification::Unresolved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InMemoryIndex;

    struct FailingIndex;

    impl PackageIndex for FailingIndex {
        fn version(&self, _package: &str) -> Result<String, IndexError> {
            Err(IndexError::IoError(std::io::Error::other("disk on fire")))
        }
    }

    fn resolver() -> VersionResolver {
        let index = InMemoryIndex::new()
            .with_package("numpy", "1.26.4")
            .with_package("Pillow", "10.3.0")
            .with_package("mypkg", "9.9.9");
        VersionResolver::new(ResolverTables::default(), Box::new(index))
    }

    #[test]
    fn test_stdlib() {
        let resolved = resolver().resolve_one(&ModuleRef::ordinary("os"));
        assert_eq!(resolved.classification, Classification::StandardLibrary);
        assert_eq!(resolved.package, "os");
    }

    #[test]
    fn test_stdlib_via_alias_target() {
        let tables = ResolverTables::default().with_aliases([("tk", "tkinter")]);
        let resolver = VersionResolver::new(tables, Box::new(InMemoryIndex::new()));

        let resolved = resolver.resolve_one(&ModuleRef::ordinary("tk"));
        assert_eq!(resolved.classification, Classification::StandardLibrary);
    }

    #[test]
    fn test_local_file_wins_over_index() {
        let resolved = resolver().resolve_one(&ModuleRef::local_file("mypkg"));
        assert_eq!(resolved.classification, Classification::LocalFile);
    }

    #[test]
    fn test_alias_mapping() {
        let resolved = resolver().resolve_one(&ModuleRef::ordinary("PIL"));
        assert_eq!(resolved.package, "Pillow");
        assert_eq!(
            resolved.classification,
            Classification::Resolved {
                version: "10.3.0".to_string()
            }
        );
    }

    #[test]
    fn test_unresolved() {
        let resolved = resolver().resolve_one(&ModuleRef::ordinary("cv2"));
        assert_eq!(resolved.package, "opencv-python");
        assert_eq!(resolved.classification, Classification::Unresolved);
    }

    #[test]
    fn test_index_failure_degrades_to_unresolved() {
        let resolver = VersionResolver::new(ResolverTables::default(), Box::new(FailingIndex));
        let resolved = resolver.resolve(&[ModuleRef::ordinary("numpy"), ModuleRef::ordinary("sys")]);

        assert_eq!(resolved[0].classification, Classification::Unresolved);
        assert_eq!(resolved[1].classification, Classification::StandardLibrary);
    }

    #[test]
    fn test_resolve_preserves_order() {
        let refs = vec![
            ModuleRef::ordinary("json"),
            ModuleRef::local_file("mypkg"),
            ModuleRef::ordinary("numpy"),
            ModuleRef::ordinary("requests"),
        ];
        let resolved = resolver().resolve(&refs);

        let got: Vec<_> = resolved.iter().map(|r| r.reference.clone()).collect();
        assert_eq!(got, refs);
        assert!(matches!(
            resolved[2].classification,
            Classification::Resolved { .. }
        ));
        assert_eq!(resolved[3].classification, Classification::Unresolved);
    }
}
