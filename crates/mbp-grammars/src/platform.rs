//! Platform naming for grammar cache paths and library files.

/// Short OS name used in cache paths: `linux`, `mac` or `win`.
///
/// Unknown operating systems fall back to `linux` rather than failing; the
/// cache path only has to be stable, not meaningful, on such hosts.
pub fn os_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "mac",
        "windows" => "win",
        "linux" => "linux",
        _ => "linux",
    }
}

/// Canonical machine architecture, e.g. `x86_64` or `aarch64`.
pub fn arch_name() -> &'static str {
    match std::env::consts::ARCH {
        "" => "x86_64",
        arch => arch,
    }
}

/// `{os}-{arch}` platform string used as a cache path segment.
pub fn platform_string() -> String {
    format!("{}-{}", os_name(), arch_name())
}

/// Shared-library extension for the current platform, with the leading dot.
pub fn library_extension() -> &'static str {
    match std::env::consts::OS {
        "macos" => ".dylib",
        "windows" => ".dll",
        _ => ".so",
    }
}

/// File name of a grammar library on this platform,
/// e.g. `libtree-sitter-python-linux-x86_64.so`.
pub fn library_file_name(library_base: &str) -> String {
    format!(
        "{}-{}{}",
        library_base,
        platform_string(),
        library_extension()
    )
}
