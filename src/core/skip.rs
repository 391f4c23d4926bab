use std::path::Path;

/// Excluded system regions, matched case-insensitively on a normalized path.
#[derive(Debug, Clone)]
pub struct SkipFilter {
    prefixes: Vec<String>,
    keywords: Vec<String>,
}

impl SkipFilter {
    pub fn new<P, K>(prefixes: P, keywords: K) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { prefixes, keywords }
    }

    pub fn should_skip(&self, path: &Path) -> bool {
        self.should_skip_str(&path.to_string_lossy())
    }

    pub fn should_skip_str(&self, path: &str) -> bool {
        let normalized = normalize(path);

        let under_prefix = self.prefixes.iter().any(|prefix| {
            normalized == *prefix
                || (normalized.starts_with(prefix.as_str())
                    && (prefix.ends_with('/') || normalized[prefix.len()..].starts_with('/')))
        });

        under_prefix || self.keywords.iter().any(|k| normalized.contains(k.as_str()))
    }
}

impl Default for SkipFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SKIP_PREFIXES, DEFAULT_SKIP_KEYWORDS)
    }
}

pub const DEFAULT_SKIP_PREFIXES: &[&str] = &[
    r"C:\Windows",
    r"C:\Program Files",
    r"C:\Program Files (x86)",
    r"C:\$Recycle.Bin",
    r"C:\System Volume Information",
    r"C:\ProgramData",
    r"C:\Boot",
    r"C:\Recovery",
    r"C:\Windows.old",
    r"C:\PerfLogs",
    r"C:\swapfile.sys",
    r"C:\hiberfil.sys",
    r"C:\pagefile.sys",
    "/proc",
    "/sys",
    "/dev",
];

pub const DEFAULT_SKIP_KEYWORDS: &[&str] = &[
    "windows",
    "program files",
    "$recycle.bin",
    "system volume information",
];

/// Lower-case, unify separators to `/`, collapse repeats and drop trailing ones.
fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.chars() {
        let ch = if ch == '\\' { '/' } else { ch };
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.extend(ch.to_lowercase());
    }
    // Keep a lone root ("/" or "c:/") intact.
    while out.len() > 1 && out.ends_with('/') && !out.ends_with(":/") {
        out.pop();
    }
    out
}
