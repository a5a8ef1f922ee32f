//! Language profiles
//!
//! A read-only table describing how to prepare, build and invoke source code
//! for each supported language. The table is built at compile time and never
//! mutated.

use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

mod profiles;

/// File stem used when a language does not derive one from the source
pub const DEFAULT_STEM: &str = "main";

/// Error returned when a language identifier is not registered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported language: {language}. Supported languages: {}", .supported.join(", "))]
pub struct UnknownLanguage {
    /// The identifier that was requested
    pub language: String,
    /// All registered identifiers, in registry order
    pub supported: Vec<&'static str>,
}

/// A program and its arguments, spawned directly without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Command {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Program name for diagnostics
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Build and run steps for one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Compile step, run without stdin. None for interpreted languages.
    pub build: Option<Command>,
    /// Step that runs the program and receives stdin
    pub run: Command,
}

/// Where the source file and its artifacts live inside a workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    /// Directory holding the source and any build output
    pub dir: PathBuf,
    /// File stem shared by the source and the compiled artifact
    pub stem: String,
    /// Full path of the source file
    pub source: PathBuf,
}

impl SourceLayout {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>, extension: &str) -> Self {
        let dir = dir.into();
        let stem = stem.into();
        let source = dir.join(format!("{stem}.{extension}"));
        Self { dir, stem, source }
    }

    /// Path of the compiled executable
    pub fn artifact(&self) -> PathBuf {
        self.dir.join(&self.stem)
    }
}

/// Description of the host tools a language needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toolchain {
    /// What the tool is (e.g. "C++ compiler")
    pub label: &'static str,
    /// Install hint shown when the tool is missing
    pub hint: &'static str,
}

/// Configuration for a programming language
#[derive(Debug, Clone, Copy)]
pub struct LanguageProfile {
    /// Identifier used in requests (e.g. "cpp")
    pub id: &'static str,

    /// Human-readable name (e.g. "C++")
    pub name: &'static str,

    /// File extension without dot
    pub extension: &'static str,

    /// Tools required on the host
    pub toolchain: Toolchain,

    wrap: fn(&str) -> Cow<'_, str>,
    invocation: fn(&SourceLayout) -> Invocation,
    naming: Option<fn(&str) -> String>,
}

impl LanguageProfile {
    pub const fn new(
        id: &'static str,
        name: &'static str,
        extension: &'static str,
        toolchain: Toolchain,
        wrap: fn(&str) -> Cow<'_, str>,
        invocation: fn(&SourceLayout) -> Invocation,
    ) -> Self {
        Self {
            id,
            name,
            extension,
            toolchain,
            wrap,
            invocation,
            naming: None,
        }
    }

    /// Derive the file stem from the source instead of using [`DEFAULT_STEM`]
    pub const fn with_naming(mut self, naming: fn(&str) -> String) -> Self {
        self.naming = Some(naming);
        self
    }

    /// Turn raw user code into a complete program.
    ///
    /// Code that already has an entry point is returned unchanged, so wrapping
    /// twice is the same as wrapping once.
    pub fn wrap<'a>(&self, code: &'a str) -> Cow<'a, str> {
        (self.wrap)(code)
    }

    /// Build the argv steps for a source laid out as `layout`
    pub fn invocation(&self, layout: &SourceLayout) -> Invocation {
        (self.invocation)(layout)
    }

    /// File stem the toolchain requires for `source`
    pub fn file_stem(&self, source: &str) -> String {
        match self.naming {
            Some(naming) => naming(source),
            None => DEFAULT_STEM.to_owned(),
        }
    }

    /// Whether the file name is derived from the source content
    pub fn has_content_derived_name(&self) -> bool {
        self.naming.is_some()
    }

    /// Lay out `source` inside `dir`
    pub fn layout(&self, dir: &Path, source: &str) -> SourceLayout {
        SourceLayout::new(dir, self.file_stem(source), self.extension)
    }

    /// Check if the language has a separate build step
    pub fn is_compiled(&self) -> bool {
        let layout = SourceLayout::new(".", DEFAULT_STEM, self.extension);
        self.invocation(&layout).build.is_some()
    }

    /// Short listing entry
    pub fn info(&self) -> LanguageInfo {
        LanguageInfo {
            id: self.id,
            label: self.name,
            extension: self.extension,
        }
    }
}

/// Entry returned when listing languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub extension: &'static str,
}

/// Table of language profiles keyed by identifier
#[derive(Debug)]
pub struct LanguageRegistry {
    profiles: &'static [LanguageProfile],
}

static BUILTIN: LanguageRegistry = LanguageRegistry {
    profiles: &profiles::PROFILES,
};

impl LanguageRegistry {
    /// The process-wide table of built-in languages
    pub fn builtin() -> &'static LanguageRegistry {
        &BUILTIN
    }

    /// Get a language by ID
    pub fn resolve(&self, id: &str) -> Result<&'static LanguageProfile, UnknownLanguage> {
        self.get(id).ok_or_else(|| UnknownLanguage {
            language: id.to_owned(),
            supported: self.ids(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&'static LanguageProfile> {
        self.profiles.iter().find(|profile| profile.id == id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.profiles.iter().map(|profile| profile.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static LanguageProfile> {
        self.profiles.iter()
    }

    /// Registry dump for listing endpoints
    pub fn languages(&self) -> Vec<LanguageInfo> {
        self.profiles.iter().map(LanguageProfile::info).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
