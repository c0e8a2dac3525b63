use crate::models::ManifestFormat;
use crate::output::FormatOptions;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file picked up from the working directory
pub const CONFIG_FILE_NAME: &str = "envbuilder.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    TomlError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Lookup tables the resolver is constructed with.
///
/// Built once, then moved into the resolver and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverTables {
    /// Import name -> distribution name
    aliases: BTreeMap<String, String>,
    /// Modules shipped with the Python runtime
    stdlib: BTreeSet<String>,
}

impl Default for ResolverTables {
    fn default() -> Self {
        Self {
            aliases: Self::default_aliases(),
            stdlib: Self::python_stdlib_modules(),
        }
    }
}

impl ResolverTables {
    /// Tables with nothing in them
    pub fn empty() -> Self {
        Self {
            aliases: BTreeMap::new(),
            stdlib: BTreeSet::new(),
        }
    }

    pub fn with_aliases<I, K, V>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.aliases
            .extend(aliases.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_stdlib<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stdlib.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Distribution name for an import, defaulting to the import name itself
    pub fn package_for<'a>(&'a self, module: &'a str) -> &'a str {
        self.aliases.get(module).map(String::as_str).unwrap_or(module)
    }

    pub fn is_stdlib(&self, name: &str) -> bool {
        self.stdlib.contains(name)
    }

    /// Imports whose conventional name differs from the published package
    fn default_aliases() -> BTreeMap<String, String> {
        [
            ("PIL", "Pillow"),
            ("cv2", "opencv-python"),
            ("skimage", "scikit-image"),
            ("sklearn", "scikit-learn"),
            ("plt", "matplotlib"),
            ("np", "numpy"),
            ("pd", "pandas"),
            ("yaml", "PyYAML"),
            ("bs4", "beautifulsoup4"),
            ("dateutil", "python-dateutil"),
            ("dotenv", "python-dotenv"),
            ("attr", "attrs"),
            ("Crypto", "pycryptodome"),
            ("serial", "pyserial"),
            ("fitz", "PyMuPDF"),
            ("docx", "python-docx"),
            ("jwt", "PyJWT"),
            ("OpenSSL", "pyOpenSSL"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// Python standard library modules
    fn python_stdlib_modules() -> BTreeSet<String> {
        [
            // Core
            "abc", "aifc", "argparse", "array", "ast", "asynchat", "asyncio",
            "asyncore", "atexit", "audioop", "base64", "bdb", "binascii",
            "binhex", "bisect", "builtins", "bz2",
            // C
            "calendar", "cgi", "cgitb", "chunk", "cmath", "cmd", "code",
            "codecs", "codeop", "collections", "colorsys", "compileall",
            "concurrent", "configparser", "contextlib", "contextvars", "copy",
            "copyreg", "cProfile", "crypt", "csv", "ctypes", "curses",
            // D-E
            "dataclasses", "datetime", "dbm", "decimal", "difflib", "dis",
            "distutils", "doctest", "email", "encodings", "enum", "errno",
            // F-G
            "faulthandler", "fcntl", "filecmp", "fileinput", "fnmatch",
            "fractions", "ftplib", "functools", "gc", "getopt", "getpass",
            "gettext", "glob", "graphlib", "grp", "gzip",
            // H-I
            "hashlib", "heapq", "hmac", "html", "http", "idlelib", "imaplib",
            "imghdr", "imp", "importlib", "inspect", "io", "ipaddress",
            "itertools",
            // J-L
            "json", "keyword", "lib2to3", "linecache", "locale", "logging",
            "lzma",
            // M-N
            "mailbox", "mailcap", "marshal", "math", "mimetypes", "mmap",
            "modulefinder", "multiprocessing", "netrc", "nis", "nntplib",
            "ntpath", "numbers",
            // O-P
            "operator", "optparse", "os", "ossaudiodev", "pathlib", "pdb",
            "pickle", "pickletools", "pipes", "pkgutil", "platform", "plistlib",
            "poplib", "posix", "posixpath", "pprint", "profile", "pstats",
            "pty", "pwd", "py_compile", "pyclbr", "pydoc",
            // Q-R
            "queue", "quopri", "random", "re", "readline", "reprlib",
            "resource", "rlcompleter", "runpy",
            // S
            "sched", "secrets", "select", "selectors", "shelve", "shlex",
            "shutil", "signal", "site", "smtpd", "smtplib", "sndhdr",
            "socket", "socketserver", "spwd", "sqlite3", "ssl", "stat",
            "statistics", "string", "stringprep", "struct", "subprocess",
            "sunau", "symtable", "sys", "sysconfig", "syslog",
            // T
            "tabnanny", "tarfile", "telnetlib", "tempfile", "termios", "test",
            "textwrap", "threading", "time", "timeit", "tkinter", "token",
            "tokenize", "tomllib", "trace", "traceback", "tracemalloc", "tty",
            "turtle", "turtledemo", "types", "typing",
            // U-Z
            "unicodedata", "unittest", "urllib", "uu", "uuid", "venv",
            "warnings", "wave", "weakref", "webbrowser", "winreg", "winsound",
            "wsgiref", "xdrlib", "xml", "xmlrpc", "zipapp", "zipfile",
            "zipimport", "zlib", "zoneinfo",
            // Underscore prefixed (internal but commonly used)
            "_thread", "__future__",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

/// Settings read from `envbuilder.toml`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvBuilderConfig {
    /// Interpreter used for version lookup and venv creation
    pub python: Option<PathBuf>,
    /// Directory that relative save paths are resolved against
    pub save_dir: Option<PathBuf>,
    pub include_comments: bool,
    pub format: ManifestFormat,
    /// Name written into the conda header
    pub env_name: String,
    /// Name of the environment created by provisioning
    pub venv_name: String,
    pub log_filter: Option<String>,
    /// Extra import -> package mappings
    pub aliases: BTreeMap<String, String>,
    pub extra_stdlib: Vec<String>,
}

impl Default for EnvBuilderConfig {
    fn default() -> Self {
        Self {
            python: None,
            save_dir: None,
            include_comments: true,
            format: ManifestFormat::Pip,
            env_name: "env".to_string(),
            venv_name: "venv".to_string(),
            log_filter: None,
            aliases: BTreeMap::new(),
            extra_stdlib: Vec::new(),
        }
    }
}

impl EnvBuilderConfig {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `envbuilder.toml` from `dir` if present, else defaults
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Interpreter to run, falling back to the platform's usual name
    pub fn python_or_default(&self) -> PathBuf {
        self.python.clone().unwrap_or_else(default_python)
    }

    /// Built-in tables extended with the configured extras
    pub fn resolver_tables(&self) -> ResolverTables {
        ResolverTables::default()
            .with_aliases(self.aliases.clone())
            .with_stdlib(self.extra_stdlib.iter().cloned())
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions::new(self.format)
            .with_comments(self.include_comments)
            .with_env_name(self.env_name.clone())
    }

    /// Resolve a save path against `save_dir` when it is relative
    pub fn save_path(&self, path: &Path) -> PathBuf {
        match &self.save_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// `python` on Windows, `python3` elsewhere
pub fn default_python() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("python")
    } else {
        PathBuf::from("python3")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables() {
        let tables = ResolverTables::default();
        assert_eq!(tables.package_for("PIL"), "Pillow");
        assert_eq!(tables.package_for("cv2"), "opencv-python");
        assert_eq!(tables.package_for("requests"), "requests");
        assert!(tables.is_stdlib("os"));
        assert!(tables.is_stdlib("__future__"));
        assert!(!tables.is_stdlib("numpy"));
    }

    #[test]
    fn test_tables_builder() {
        let tables = ResolverTables::empty()
            .with_aliases([("foo", "foo-dist")])
            .with_stdlib(["mystd"]);

        assert_eq!(tables.package_for("foo"), "foo-dist");
        assert!(tables.is_stdlib("mystd"));
        assert!(!tables.is_stdlib("os"));
    }

    #[test]
    fn test_default_config() {
        let config = EnvBuilderConfig::default();
        assert!(config.include_comments);
        assert_eq!(config.format, ManifestFormat::Pip);
        assert_eq!(config.env_name, "env");
        assert_eq!(config.venv_name, "venv");
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
python = "/opt/py/bin/python"
include_comments = false
format = "conda"
env_name = "science"
extra_stdlib = ["_winapi"]

[aliases]
magic = "python-magic"
"#,
        )
        .unwrap();

        let config = EnvBuilderConfig::discover(dir.path()).unwrap();
        assert_eq!(config.python, Some(PathBuf::from("/opt/py/bin/python")));
        assert!(!config.include_comments);
        assert_eq!(config.format, ManifestFormat::Conda);
        assert_eq!(config.env_name, "science");
        assert_eq!(config.venv_name, "venv");

        let tables = config.resolver_tables();
        assert_eq!(tables.package_for("magic"), "python-magic");
        assert_eq!(tables.package_for("PIL"), "Pillow");
        assert!(tables.is_stdlib("_winapi"));
    }

    #[test]
    fn test_discover_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = EnvBuilderConfig::discover(dir.path()).unwrap();
        assert_eq!(config, EnvBuilderConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "format = \"poetry\"\n").unwrap();

        assert!(matches!(
            EnvBuilderConfig::load(&path),
            Err(ConfigError::TomlError { .. })
        ));
    }

    #[test]
    fn test_save_path() {
        let config = EnvBuilderConfig {
            save_dir: Some(PathBuf::from("/out")),
            ..Default::default()
        };
        assert_eq!(
            config.save_path(Path::new("requirements.txt")),
            PathBuf::from("/out/requirements.txt")
        );
        assert_eq!(
            config.save_path(Path::new("/abs/env.yml")),
            PathBuf::from("/abs/env.yml")
        );
    }
}
