//! Built-in language table
//!
//! Each profile decides whether submitted code is already a complete program
//! by looking for an entry-point marker. Without one, a minimal harness is
//! injected around the code.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::language::{Command, Invocation, LanguageProfile, SourceLayout, Toolchain};

pub(crate) static PROFILES: [LanguageProfile; 9] = [
    LanguageProfile {
        id: "js",
        name: "JavaScript",
        extension: "js",
        toolchain: Toolchain {
            label: "JavaScript runtime",
            hint: "Please install Node.js.",
        },
        wrap: verbatim,
        invocation: node,
        naming: None,
    },
    LanguageProfile {
        id: "py",
        name: "Python",
        extension: "py",
        toolchain: Toolchain {
            label: "Python interpreter",
            hint: "Please install Python 3.",
        },
        wrap: verbatim,
        invocation: python,
        naming: None,
    },
    LanguageProfile {
        id: "java",
        name: "Java",
        extension: "java",
        toolchain: Toolchain {
            label: "Java toolchain",
            hint: "Please install a JDK.",
        },
        wrap: wrap_java,
        invocation: java_invocation,
        naming: Some(java_class_name),
    },
    LanguageProfile {
        id: "cpp",
        name: "C++",
        extension: "cpp",
        toolchain: Toolchain {
            label: "C++ compiler",
            hint: "Please install g++ (e.g. the build-essential package).",
        },
        wrap: wrap_cpp,
        invocation: gpp,
        naming: None,
    },
    LanguageProfile {
        id: "c",
        name: "C",
        extension: "c",
        toolchain: Toolchain {
            label: "C compiler",
            hint: "Please install gcc (e.g. the build-essential package).",
        },
        wrap: wrap_c,
        invocation: gcc,
        naming: None,
    },
    LanguageProfile {
        id: "go",
        name: "Go",
        extension: "go",
        toolchain: Toolchain {
            label: "Go toolchain",
            hint: "Please install Go.",
        },
        wrap: wrap_go,
        invocation: go_run,
        naming: None,
    },
    LanguageProfile {
        id: "rs",
        name: "Rust",
        extension: "rs",
        toolchain: Toolchain {
            label: "Rust compiler",
            hint: "Please install Rust.",
        },
        wrap: wrap_rust,
        invocation: rustc,
        naming: None,
    },
    LanguageProfile {
        id: "php",
        name: "PHP",
        extension: "php",
        toolchain: Toolchain {
            label: "PHP interpreter",
            hint: "Please install PHP.",
        },
        wrap: wrap_php,
        invocation: php,
        naming: None,
    },
    LanguageProfile {
        id: "rb",
        name: "Ruby",
        extension: "rb",
        toolchain: Toolchain {
            label: "Ruby interpreter",
            hint: "Please install Ruby.",
        },
        wrap: verbatim,
        invocation: ruby,
        naming: None,
    },
];

fn verbatim(code: &str) -> Cow<'_, str> {
    Cow::Borrowed(code)
}

/// Return `code` unchanged if it contains `marker`, otherwise build a harness
fn wrap_unless<'a>(
    code: &'a str,
    marker: &str,
    harness: impl FnOnce(&str) -> String,
) -> Cow<'a, str> {
    if code.contains(marker) {
        Cow::Borrowed(code)
    } else {
        Cow::Owned(harness(code))
    }
}

fn wrap_cpp(code: &str) -> Cow<'_, str> {
    wrap_unless(code, "#include", |body| {
        format!("#include <iostream>\nusing namespace std;\n\nint main() {{\n{body}\n    return 0;\n}}")
    })
}

fn wrap_c(code: &str) -> Cow<'_, str> {
    wrap_unless(code, "#include", |body| {
        format!("#include <stdio.h>\n\nint main() {{\n{body}\n    return 0;\n}}")
    })
}

fn wrap_go(code: &str) -> Cow<'_, str> {
    wrap_unless(code, "package main", |body| {
        format!("package main\n\nimport \"fmt\"\n\nfunc main() {{\n{body}\n}}")
    })
}

fn wrap_rust(code: &str) -> Cow<'_, str> {
    wrap_unless(code, "fn main", |body| format!("fn main() {{\n{body}\n}}"))
}

fn wrap_php(code: &str) -> Cow<'_, str> {
    wrap_unless(code, "<?php", |body| format!("<?php\n{body}\n?>"))
}

fn wrap_java(code: &str) -> Cow<'_, str> {
    wrap_unless(code, "public class", |body| {
        format!(
            "import java.util.Scanner;\n\npublic class Main {{\n    public static void main(String[] args) {{\n        Scanner sc = new Scanner(System.in);\n{body}\n    }}\n}}"
        )
    })
}

static JAVA_PUBLIC_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"public\s+class\s+(\w+)").expect("public class pattern is valid")
});

/// javac requires the file to be named after the public class
fn java_class_name(source: &str) -> String {
    JAVA_PUBLIC_CLASS
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| "Main".to_owned(), |m| m.as_str().to_owned())
}

fn java_invocation(layout: &SourceLayout) -> Invocation {
    Invocation {
        build: Some(Command::new("javac").arg(&layout.source)),
        run: Command::new("java")
            .arg("-cp")
            .arg(&layout.dir)
            .arg(&layout.stem),
    }
}

fn node(layout: &SourceLayout) -> Invocation {
    interpreted("node", layout)
}

fn python(layout: &SourceLayout) -> Invocation {
    interpreted("python3", layout)
}

fn php(layout: &SourceLayout) -> Invocation {
    interpreted("php", layout)
}

fn ruby(layout: &SourceLayout) -> Invocation {
    interpreted("ruby", layout)
}

fn go_run(layout: &SourceLayout) -> Invocation {
    Invocation {
        build: None,
        run: Command::new("go").arg("run").arg(&layout.source),
    }
}

fn gpp(layout: &SourceLayout) -> Invocation {
    native("g++", layout)
}

fn gcc(layout: &SourceLayout) -> Invocation {
    native("gcc", layout)
}

fn rustc(layout: &SourceLayout) -> Invocation {
    Invocation {
        build: Some(
            Command::new("rustc")
                .arg(&layout.source)
                .arg("-o")
                .arg(layout.artifact()),
        ),
        run: Command::new(layout.artifact()),
    }
}

fn interpreted(program: &str, layout: &SourceLayout) -> Invocation {
    Invocation {
        build: None,
        run: Command::new(program).arg(&layout.source),
    }
}

/// Compile with a gcc-style driver to `<dir>/<stem>` and run the result
fn native(compiler: &str, layout: &SourceLayout) -> Invocation {
    Invocation {
        build: Some(
            Command::new(compiler)
                .arg("-o")
                .arg(layout.artifact())
                .arg(&layout.source),
        ),
        run: Command::new(layout.artifact()),
    }
}
