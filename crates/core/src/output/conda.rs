use super::{push_entries, EntryStyle, FormatOptions};
use crate::models::{Manifest, ManifestFormat, ResolvedModule};

// Single `=` between name and version, unlike pip's `==`.
const CONDA_STYLE: EntryStyle = EntryStyle {
    prefix: "  - ",
    pin: "=",
};

/// Header lines naming the environment and its channel
pub fn conda_header(env_name: &str) -> Vec<String> {
    vec![
        format!("name: {env_name}"),
        "channels:".to_string(),
        "  - conda-forge".to_string(),
        "dependencies:".to_string(),
    ]
}

/// `environment.yml` style list under a named environment
pub(super) fn render(modules: &[ResolvedModule], options: &FormatOptions) -> Manifest {
    let header = conda_header(&options.env_name);

    let mut manifest = Manifest {
        format: ManifestFormat::Conda,
        lines: header.clone(),
        installable: String::new(),
    };
    for line in &header {
        manifest.installable.push_str(line);
        manifest.installable.push('\n');
    }

    push_entries(&mut manifest, modules, options.include_comments, &CONDA_STYLE);
    manifest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_support::sample_modules;

    fn options(include_comments: bool) -> FormatOptions {
        FormatOptions::new(ManifestFormat::Conda).with_comments(include_comments)
    }

    #[test]
    fn test_display_with_comments() {
        let manifest = render(&sample_modules(), &options(true));

        assert_eq!(
            manifest.lines,
            vec![
                "name: env",
                "channels:",
                "  - conda-forge",
                "dependencies:",
                "  - PIL=10.3.0",
                "  - mypkg (local file)  # local file",
                "  - numpy=1.26.4",
                "  - os  # standard library",
                "  - requests  # not installed",
            ]
        );
    }

    #[test]
    fn test_display_without_comments() {
        let manifest = render(&sample_modules(), &options(false));

        assert_eq!(
            manifest.lines[4..].to_vec(),
            vec![
                "  - PIL=10.3.0",
                "  - mypkg (local file)",
                "  - numpy=1.26.4",
                "  - os",
                "  - requests",
            ]
        );
    }

    #[test]
    fn test_installable() {
        let manifest = render(&sample_modules(), &options(true).with_env_name("science"));

        assert_eq!(
            manifest.installable,
            "name: science\nchannels:\n  - conda-forge\ndependencies:\n  - Pillow=10.3.0\n  - numpy=1.26.4\n  - requests  # not installed\n"
        );
    }

    #[test]
    fn test_installable_is_valid_yaml() {
        let manifest = render(&sample_modules(), &options(true));
        let doc: serde_yaml::Value = serde_yaml::from_str(&manifest.installable).unwrap();

        assert_eq!(doc["name"], serde_yaml::Value::from("env"));
        let deps = doc["dependencies"].as_sequence().unwrap();
        assert_eq!(deps.len(), 3);
        assert_eq!(deps[0], serde_yaml::Value::from("Pillow=10.3.0"));
        assert_eq!(deps[2], serde_yaml::Value::from("requests"));
    }

    #[test]
    fn test_header_only_when_empty() {
        let manifest = render(&[], &options(true));
        assert_eq!(manifest.lines.len(), 4);
        assert!(manifest.has_content());
    }
}
