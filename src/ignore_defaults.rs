//! Baseline exclude catalog applied to every ingestion.
//!
//! Build artifacts, dependency trees, VCS metadata, IDE state and binary media
//! rarely belong in an LLM prompt, so they are filtered out unless the caller
//! explicitly includes them back via include patterns.

/// Patterns excluded by default. Entries ending in `/` cover the directory and
/// everything under it once normalized by the pattern engine.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // Python
    "*.pyc",
    "*.pyo",
    "*.pyd",
    "__pycache__/",
    ".pytest_cache/",
    ".mypy_cache/",
    ".ruff_cache/",
    ".hypothesis/",
    ".coverage",
    ".tox/",
    ".nox/",
    "*.egg-info",
    "*.egg",
    "*.whl",
    "poetry.lock",
    "Pipfile.lock",
    "uv.lock",
    "venv/",
    ".venv/",
    "env/",
    "virtualenv/",
    // JavaScript / Node
    "node_modules/",
    "bower_components/",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lock",
    "bun.lockb",
    ".npm/",
    ".yarn/",
    ".pnpm-store/",
    "*.min.js",
    "*.min.css",
    "*.map",
    ".next/",
    ".nuxt/",
    ".docusaurus/",
    // Java / JVM
    "*.class",
    "*.jar",
    "*.war",
    "*.ear",
    "*.nar",
    ".gradle/",
    "build/",
    "*.gradle",
    // Rust
    "target/",
    "Cargo.lock",
    // Go
    "go.sum",
    // Ruby
    "Gemfile.lock",
    ".bundle/",
    "*.gem",
    // PHP
    "composer.lock",
    ".php_cs.cache",
    // .NET / native build output
    "bin/",
    "obj/",
    "*.o",
    "*.obj",
    "*.a",
    "*.lib",
    "*.so",
    "*.dylib",
    "*.dll",
    "*.exe",
    "*.out",
    "*.pdb",
    "*.nupkg",
    // Xcode
    "*.xcodeproj/",
    "*.xcworkspace/",
    "*.pbxproj",
    // Version control
    ".git/",
    ".svn/",
    ".hg/",
    ".gitignore",
    ".gitattributes",
    ".gitmodules",
    // IDEs and editors
    ".idea/",
    ".vscode/",
    "*.swp",
    "*.swo",
    "*.swx",
    // OS cruft
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    // Caches and temp files
    ".cache/",
    ".sass-cache/",
    ".eslintcache",
    ".history/",
    "*.log",
    "*.bak",
    "*.tmp",
    "*.temp",
    // Terraform
    ".terraform/",
    "*.tfstate",
    "*.tfstate.backup",
    // Binary media and documents
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.ico",
    "*.svg",
    "*.webp",
    "*.pdf",
    "*.zip",
    "*.tar",
    "*.gz",
    "*.7z",
    "*.rar",
    "*.mp3",
    "*.wav",
    "*.mp4",
    "*.mov",
    "*.avi",
    "*.ttf",
    "*.otf",
    "*.woff",
    "*.woff2",
];
